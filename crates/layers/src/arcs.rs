//! Arc records, their validation, and the arc layer.

use std::f64::consts::PI;
use std::fmt;

use foundation::color::Color;
use foundation::math::{ALT_RANGE, LAT_RANGE, LNG_RANGE, LatLng, Vec3, lat_lng_to_cartesian};
use gpu::renderer::{ArcBatch, RenderCommand, RenderFrame};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GlobeConfig;
use crate::layer::{Layer, LayerId};
use crate::symbology::ColorSource;

/// Color substituted for unparseable record colors.
pub const DEFAULT_ARC_COLOR: &str = "#FFFFFF";
pub const DEFAULT_MIN_ARC_DISTANCE: f64 = 0.75;
/// Smallest nudge that still moves any in-range coordinate.
pub const MIN_ARC_DISTANCE_FLOOR: f64 = 1e-6;
pub const ARC_STROKES: [f64; 3] = [0.32, 0.28, 0.3];
pub const ARC_DASH_GAP: f64 = 4.0;

/// One animated great-circle arc plus its endpoint marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcRecord {
    pub order: u32,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
    pub arc_alt: f64,
    pub color: String,
}

impl ArcRecord {
    pub fn start(&self) -> LatLng {
        LatLng::new(self.start_lat, self.start_lng)
    }

    pub fn end(&self) -> LatLng {
        LatLng::new(self.end_lat, self.end_lng)
    }

    pub fn is_degenerate(&self) -> bool {
        self.start_lat == self.end_lat && self.start_lng == self.end_lng
    }

    /// Ranges hold, endpoints differ and the color parses.
    pub fn satisfies_invariants(&self) -> bool {
        in_range(self.start_lat, LAT_RANGE)
            && in_range(self.end_lat, LAT_RANGE)
            && in_range(self.start_lng, LNG_RANGE)
            && in_range(self.end_lng, LNG_RANGE)
            && in_range(self.arc_alt, ALT_RANGE)
            && !self.is_degenerate()
            && Color::parse(&self.color).is_ok()
    }
}

fn in_range(v: f64, (min, max): (f64, f64)) -> bool {
    v.is_finite() && v >= min && v <= max
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArcField {
    StartLat,
    StartLng,
    EndLat,
    EndLng,
    ArcAlt,
    Color,
}

impl fmt::Display for ArcField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArcField::StartLat => "startLat",
            ArcField::StartLng => "startLng",
            ArcField::EndLat => "endLat",
            ArcField::EndLng => "endLng",
            ArcField::ArcAlt => "arcAlt",
            ArcField::Color => "color",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub index: usize,
    pub field: ArcField,
    pub original: String,
    pub fixed: String,
}

/// Clamps coordinates into range and repairs degenerate arcs.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RecordValidator {
    min_arc_distance: f64,
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self {
            min_arc_distance: DEFAULT_MIN_ARC_DISTANCE,
        }
    }
}

impl RecordValidator {
    pub fn new(min_arc_distance: f64) -> Self {
        if min_arc_distance.is_finite() && min_arc_distance > 0.0 {
            if min_arc_distance < MIN_ARC_DISTANCE_FLOOR {
                tracing::warn!(
                    min_arc_distance,
                    floor = MIN_ARC_DISTANCE_FLOOR,
                    "minimum arc distance too small to separate endpoints"
                );
            }
            Self {
                min_arc_distance: min_arc_distance.max(MIN_ARC_DISTANCE_FLOOR),
            }
        } else {
            tracing::warn!(
                min_arc_distance,
                fallback = DEFAULT_MIN_ARC_DISTANCE,
                "invalid minimum arc distance"
            );
            Self::default()
        }
    }

    pub fn min_arc_distance(&self) -> f64 {
        self.min_arc_distance
    }

    pub fn validate(&self, record: &ArcRecord, index: usize) -> (ArcRecord, Vec<Correction>) {
        let mut corrections = Vec::new();
        let mut fixed = record.clone();

        let mut fix = |value: f64, range: (f64, f64), field: ArcField| {
            let out = fix_coordinate(value, range);
            if out != value || !value.is_finite() {
                log_correction(&mut corrections, index, field, value, out);
            }
            out
        };
        fixed.start_lat = fix(record.start_lat, LAT_RANGE, ArcField::StartLat);
        fixed.start_lng = fix(record.start_lng, LNG_RANGE, ArcField::StartLng);
        fixed.end_lat = fix(record.end_lat, LAT_RANGE, ArcField::EndLat);
        fixed.end_lng = fix(record.end_lng, LNG_RANGE, ArcField::EndLng);
        fixed.arc_alt = fix(record.arc_alt, ALT_RANGE, ArcField::ArcAlt);

        if fixed.is_degenerate() {
            tracing::warn!(index, "arc has identical start and end points, nudging end");
            let end_lat = nudge(fixed.end_lat, LAT_RANGE, self.min_arc_distance);
            let end_lng = nudge(fixed.end_lng, LNG_RANGE, self.min_arc_distance);
            log_correction(&mut corrections, index, ArcField::EndLat, fixed.end_lat, end_lat);
            log_correction(&mut corrections, index, ArcField::EndLng, fixed.end_lng, end_lng);
            fixed.end_lat = end_lat;
            fixed.end_lng = end_lng;
        }

        if Color::parse(&record.color).is_err() {
            tracing::warn!(
                index,
                original = %record.color,
                fixed = DEFAULT_ARC_COLOR,
                "invalid arc color"
            );
            corrections.push(Correction {
                index,
                field: ArcField::Color,
                original: record.color.clone(),
                fixed: DEFAULT_ARC_COLOR.to_string(),
            });
            fixed.color = DEFAULT_ARC_COLOR.to_string();
        }

        (fixed, corrections)
    }

    pub fn validate_all(&self, records: &[ArcRecord]) -> (Vec<ArcRecord>, Vec<Correction>) {
        let mut out = Vec::with_capacity(records.len());
        let mut corrections = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let (fixed, mut c) = self.validate(record, index);
            out.push(fixed);
            corrections.append(&mut c);
        }
        (out, corrections)
    }
}

fn log_correction(
    corrections: &mut Vec<Correction>,
    index: usize,
    field: ArcField,
    original: f64,
    fixed: f64,
) {
    tracing::warn!(index, %field, original, fixed, "arc field corrected");
    corrections.push(Correction {
        index,
        field,
        original: original.to_string(),
        fixed: fixed.to_string(),
    });
}

/// Clamps into `range`; non-finite values become the range midpoint.
pub fn fix_coordinate(value: f64, (min, max): (f64, f64)) -> f64 {
    if !value.is_finite() {
        return (min + max) / 2.0;
    }
    value.clamp(min, max)
}

/// Moves `value` by `distance`, forward unless clamping would swallow the
/// move, in which case backward.
fn nudge(value: f64, range: (f64, f64), distance: f64) -> f64 {
    let distance = distance.max(MIN_ARC_DISTANCE_FLOOR);
    let forward = fix_coordinate(value + distance, range);
    if forward != value {
        forward
    } else {
        fix_coordinate(value - distance, range)
    }
}

/// An arc as configured on the layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcInstance {
    pub record: ArcRecord,
    pub stroke: f64,
    pub altitude: f64,
    pub color: String,
}

impl ArcInstance {
    /// Great-circle path lifted by `altitude × radius` at its midpoint.
    pub fn path(&self, radius: f64, segments: usize) -> Vec<Vec3> {
        let segments = segments.max(1);
        let a = lat_lng_to_cartesian(self.record.start(), 1.0);
        let b = lat_lng_to_cartesian(self.record.end(), 1.0);
        let omega = a.dot(b).clamp(-1.0, 1.0).acos();

        (0..=segments)
            .map(|i| {
                let t = i as f64 / segments as f64;
                let dir = if omega.abs() < 1e-9 {
                    a
                } else {
                    let s = omega.sin();
                    a.scale(((1.0 - t) * omega).sin() / s) + b.scale((t * omega).sin() / s)
                };
                let lift = 1.0 + self.altitude * (PI * t).sin();
                dir.normalize().scale(radius * lift)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ArcLayer {
    id: LayerId,
    arcs: Vec<ArcInstance>,
    color: ColorSource,
    dash_length: f64,
    dash_gap: f64,
    dash_animate_time_ms: f64,
}

impl ArcLayer {
    pub fn new(id: u64) -> Self {
        Self {
            id: LayerId(id),
            arcs: Vec::new(),
            color: ColorSource::literal(DEFAULT_ARC_COLOR),
            dash_length: GlobeConfig::default().arc_length,
            dash_gap: ARC_DASH_GAP,
            dash_animate_time_ms: GlobeConfig::default().arc_time,
        }
    }

    /// Replaces the arcs. Strokes are drawn from [`ARC_STROKES`] with `rng`.
    pub fn configure(&mut self, records: &[ArcRecord], config: &GlobeConfig, rng: &mut impl Rng) {
        self.dash_length = config.arc_length;
        self.dash_gap = ARC_DASH_GAP;
        self.dash_animate_time_ms = config.arc_time;
        self.arcs = records
            .iter()
            .map(|record| ArcInstance {
                record: record.clone(),
                stroke: ARC_STROKES[rng.random_range(0..ARC_STROKES.len())],
                altitude: if record.arc_alt.is_finite() {
                    record.arc_alt
                } else {
                    0.0
                },
                color: self.color.resolve(record, DEFAULT_ARC_COLOR),
            })
            .collect();
    }

    pub fn arcs(&self) -> &[ArcInstance] {
        &self.arcs
    }

    pub fn dash_length(&self) -> f64 {
        self.dash_length
    }

    pub fn dash_gap(&self) -> f64 {
        self.dash_gap
    }

    pub fn dash_animate_time_ms(&self) -> f64 {
        self.dash_animate_time_ms
    }
}

impl Layer for ArcLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn len(&self) -> usize {
        self.arcs.len()
    }

    fn clear(&mut self) {
        self.arcs.clear();
    }

    fn encode(&self, frame: &mut RenderFrame) {
        if self.arcs.is_empty() {
            return;
        }
        frame.push(RenderCommand::Arcs(ArcBatch {
            count: self.arcs.len(),
            dash_length: self.dash_length,
            dash_gap: self.dash_gap,
            dash_animate_time_ms: self.dash_animate_time_ms,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ARC_STROKES, ArcField, ArcLayer, ArcRecord, MIN_ARC_DISTANCE_FLOOR, RecordValidator,
        fix_coordinate,
    };
    use crate::config::GlobeConfig;
    use crate::layer::Layer;
    use foundation::math::LAT_RANGE;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn record(start: (f64, f64), end: (f64, f64), alt: f64, color: &str) -> ArcRecord {
        ArcRecord {
            order: 1,
            start_lat: start.0,
            start_lng: start.1,
            end_lat: end.0,
            end_lng: end.1,
            arc_alt: alt,
            color: color.to_string(),
        }
    }

    #[test]
    fn wire_format_is_camel_case() {
        let r = record((1.0, 2.0), (3.0, 4.0), 0.3, "#06b6d4");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["startLat"], 1.0);
        assert_eq!(json["arcAlt"], 0.3);
        let back: ArcRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn valid_record_is_untouched() {
        let r = record((10.0, 20.0), (-30.0, 40.0), 0.2, "#3b82f6");
        let (fixed, corrections) = RecordValidator::default().validate(&r, 0);
        assert_eq!(fixed, r);
        assert!(corrections.is_empty());
    }

    #[test]
    fn invalid_fields_are_clamped_or_centred() {
        let inputs = [
            f64::NAN,
            f64::INFINITY,
            f64::NEG_INFINITY,
            -1000.0,
            1000.0,
            -90.0,
            180.0,
            0.5,
        ];
        let validator = RecordValidator::default();
        for (i, a) in inputs.iter().enumerate() {
            for b in inputs.iter() {
                let r = record((*a, *b), (*b, *a), *a, "bogus");
                let (fixed, _) = validator.validate(&r, i);
                assert!(fixed.satisfies_invariants(), "{r:?} -> {fixed:?}");
            }
        }
    }

    #[test]
    fn non_finite_becomes_midpoint() {
        assert_eq!(fix_coordinate(f64::NAN, LAT_RANGE), 0.0);
        assert_eq!(fix_coordinate(f64::NAN, (0.0, 1.0)), 0.5);
        assert_eq!(fix_coordinate(95.0, LAT_RANGE), 90.0);
    }

    #[test]
    fn degenerate_arc_is_nudged_forward() {
        let r = record((10.0, 10.0), (10.0, 10.0), 0.1, "#fff");
        let (fixed, corrections) = RecordValidator::new(0.75).validate(&r, 3);
        assert_eq!((fixed.end_lat, fixed.end_lng), (10.75, 10.75));
        assert!(!fixed.is_degenerate());
        assert_eq!(corrections.len(), 2);
        assert_eq!(corrections[0].field, ArcField::EndLat);
        assert_eq!(corrections[0].index, 3);
    }

    #[test]
    fn degenerate_arc_at_pole_is_nudged_backward() {
        let r = record((90.0, 180.0), (90.0, 180.0), 0.1, "#fff");
        let (fixed, _) = RecordValidator::new(0.75).validate(&r, 0);
        assert_eq!((fixed.end_lat, fixed.end_lng), (89.25, 179.25));
    }

    #[test]
    fn tiny_min_distance_still_separates_endpoints() {
        let validator = RecordValidator::new(1e-20);
        assert_eq!(validator.min_arc_distance(), MIN_ARC_DISTANCE_FLOOR);

        for end in [(10.0, 10.0), (90.0, 180.0), (-90.0, -180.0), (0.0, 0.0)] {
            let r = record(end, end, 0.1, "#fff");
            let (fixed, _) = validator.validate(&r, 0);
            assert!(!fixed.is_degenerate(), "{end:?} -> {fixed:?}");
            assert!(fixed.satisfies_invariants());
        }
    }

    #[test]
    fn invalid_color_becomes_white() {
        let r = record((0.0, 0.0), (1.0, 1.0), 0.1, "#zzzzzz");
        let (fixed, corrections) = RecordValidator::default().validate(&r, 7);
        assert_eq!(fixed.color, "#FFFFFF");
        assert_eq!(corrections[0].field, ArcField::Color);
        assert_eq!(corrections[0].original, "#zzzzzz");
    }

    #[test]
    fn invalid_min_distance_falls_back() {
        assert_eq!(RecordValidator::new(-1.0).min_arc_distance(), 0.75);
        assert_eq!(RecordValidator::new(f64::NAN).min_arc_distance(), 0.75);
    }

    #[test]
    fn layer_configures_style_from_config() {
        let mut layer = ArcLayer::new(1);
        let records = vec![
            record((0.0, 0.0), (10.0, 10.0), 0.3, "#06b6d4"),
            record((5.0, 5.0), (-10.0, 20.0), 0.1, "#6366f1"),
        ];
        let config = GlobeConfig::showcase();
        layer.configure(&records, &config, &mut StdRng::seed_from_u64(7));

        assert_eq!(layer.len(), 2);
        assert_eq!(layer.dash_animate_time_ms(), 1000.0);
        assert_eq!(layer.dash_gap(), 4.0);
        for arc in layer.arcs() {
            assert!(ARC_STROKES.contains(&arc.stroke));
            assert_eq!(arc.color, "#FFFFFF");
        }

        layer.clear();
        assert!(layer.is_empty());
    }

    #[test]
    fn path_peaks_at_midpoint() {
        let mut layer = ArcLayer::new(1);
        layer.configure(
            &[record((0.0, 0.0), (0.0, 90.0), 0.5, "#fff")],
            &GlobeConfig::default(),
            &mut StdRng::seed_from_u64(1),
        );
        let path = layer.arcs()[0].path(100.0, 10);
        assert_eq!(path.len(), 11);
        assert!((path[0].length() - 100.0).abs() < 1e-9);
        assert!((path[5].length() - 150.0).abs() < 1e-9);
        assert!((path[10].length() - 100.0).abs() < 1e-9);
    }
}
