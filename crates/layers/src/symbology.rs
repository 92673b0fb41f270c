use std::fmt;
use std::sync::Arc;

use foundation::color::Color;

use crate::arcs::ArcRecord;

/// Where a layer's per-item color comes from.
///
/// Resolved once while the layer is configured; downstream code only ever
/// sees a validated color string.
#[derive(Clone)]
pub enum ColorSource {
    Literal(String),
    Computed(Arc<dyn Fn(&ArcRecord) -> String + Send + Sync>),
}

impl fmt::Debug for ColorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSource::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            ColorSource::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl ColorSource {
    pub fn literal(color: impl Into<String>) -> Self {
        ColorSource::Literal(color.into())
    }

    pub fn computed(f: impl Fn(&ArcRecord) -> String + Send + Sync + 'static) -> Self {
        ColorSource::Computed(Arc::new(f))
    }

    /// Color taken from the record itself.
    pub fn from_record() -> Self {
        Self::computed(|record| record.color.clone())
    }

    pub fn resolve(&self, record: &ArcRecord, fallback: &str) -> String {
        match self {
            ColorSource::Literal(s) => validated_color(s, fallback),
            ColorSource::Computed(f) => validated_color(&f(record), fallback),
        }
    }
}

/// `raw` when it parses as a color, otherwise `fallback`.
pub fn validated_color(raw: &str, fallback: &str) -> String {
    match Color::parse(raw) {
        Ok(_) => raw.trim().to_string(),
        Err(err) => {
            tracing::warn!(%raw, %fallback, %err, "invalid color, using fallback");
            fallback.to_string()
        }
    }
}

/// Parses an already validated color; white if it somehow does not parse.
pub fn parse_or_white(raw: &str) -> Color {
    Color::parse(raw).unwrap_or(Color::WHITE)
}

#[cfg(test)]
mod tests {
    use super::{ColorSource, validated_color};
    use crate::arcs::ArcRecord;

    fn record(color: &str) -> ArcRecord {
        ArcRecord {
            order: 1,
            start_lat: 0.0,
            start_lng: 0.0,
            end_lat: 10.0,
            end_lng: 10.0,
            arc_alt: 0.2,
            color: color.to_string(),
        }
    }

    #[test]
    fn literal_and_computed_resolve_to_valid_colors() {
        let r = record("#3b82f6");
        assert_eq!(ColorSource::literal("#FFFFFF").resolve(&r, "#000"), "#FFFFFF");
        assert_eq!(ColorSource::from_record().resolve(&r, "#000"), "#3b82f6");
        assert_eq!(
            ColorSource::computed(|_| "not a color".into()).resolve(&r, "rgba(255,255,255,0.5)"),
            "rgba(255,255,255,0.5)"
        );
    }

    #[test]
    fn validated_color_trims() {
        assert_eq!(validated_color("  #abc ", "#fff"), "#abc");
        assert_eq!(validated_color("", "#fff"), "#fff");
    }
}
