/// sRGB color with straight alpha, parsed from a CSS-style token.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    #[error("empty color string")]
    Empty,
    #[error("invalid hex color: {0}")]
    InvalidHex(String),
    #[error("invalid functional color: {0}")]
    InvalidFunction(String),
    #[error("unknown color name: {0}")]
    UnknownName(String),
}

const NAMED: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
    ("skyblue", [135, 206, 235]),
];

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parses `#rrggbb`, `#rgb`, `rgb(r,g,b)`, `rgba(r,g,b,a)` and a small set
    /// of CSS color names.
    pub fn parse(s: &str) -> Result<Self, ColorParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ColorParseError::Empty);
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| ColorParseError::InvalidHex(s.to_string()));
        }

        let lower = s.to_ascii_lowercase();
        if lower.starts_with("rgb") {
            return parse_function(&lower)
                .ok_or_else(|| ColorParseError::InvalidFunction(s.to_string()));
        }

        NAMED
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, [r, g, b])| Color::rgb(*r, *g, *b))
            .ok_or_else(|| ColorParseError::UnknownName(s.to_string()))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            self.to_hex()
        } else {
            format!("rgba({},{},{},{})", self.r, self.g, self.b, self.a)
        }
    }

    /// Linear `[0, 1]` channels for shading.
    pub fn to_rgba_f32(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a,
        ]
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let mut ch = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                ch[i] = v * 16 + v;
            }
            Some(Color::rgb(ch[0], ch[1], ch[2]))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::rgb(r, g, b))
        }
        _ => None,
    }
}

fn parse_function(s: &str) -> Option<Color> {
    let (name, rest) = s.split_once('(')?;
    let body = rest.strip_suffix(')')?;
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();

    let expected = match name.trim() {
        "rgb" => 3,
        "rgba" => 4,
        _ => return None,
    };
    if parts.len() != expected {
        return None;
    }

    let channel = |p: &str| -> Option<u8> {
        let v: f64 = p.parse().ok()?;
        (v.is_finite() && (0.0..=255.0).contains(&v)).then(|| v.round() as u8)
    };
    let r = channel(parts[0])?;
    let g = channel(parts[1])?;
    let b = channel(parts[2])?;
    let a = if expected == 4 {
        let a: f32 = parts[3].parse().ok()?;
        if !a.is_finite() || !(0.0..=1.0).contains(&a) {
            return None;
        }
        a
    } else {
        1.0
    };

    Some(Color { r, g, b, a })
}
