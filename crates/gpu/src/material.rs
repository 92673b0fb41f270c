use foundation::color::Color;

pub const FALLBACK_GLOBE_TEXTURE: &str = "/images/fallback-globe-texture.jpg";

/// Phong material of the globe surface.
///
/// Disposal releases the GPU-side resources; a disposed material is skipped
/// by the renderer until the scene is rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeMaterial {
    pub color: Color,
    pub emissive: Color,
    pub emissive_intensity: f64,
    pub shininess: f64,
    pub texture: Option<&'static str>,
    disposed: bool,
}

impl GlobeMaterial {
    pub fn phong(color: Color, emissive: Color, emissive_intensity: f64, shininess: f64) -> Self {
        Self {
            color,
            emissive,
            emissive_intensity,
            shininess,
            texture: None,
            disposed: false,
        }
    }

    pub fn textured(texture: &'static str) -> Self {
        Self {
            texture: Some(texture),
            ..Self::phong(Color::WHITE, Color::BLACK, 0.0, 0.0)
        }
    }

    pub fn dispose(&mut self) {
        if !self.disposed {
            tracing::debug!("globe material disposed");
        }
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::{FALLBACK_GLOBE_TEXTURE, GlobeMaterial};

    #[test]
    fn dispose_is_idempotent() {
        let mut material = GlobeMaterial::textured(FALLBACK_GLOBE_TEXTURE);
        assert!(!material.is_disposed());
        material.dispose();
        material.dispose();
        assert!(material.is_disposed());
    }
}
