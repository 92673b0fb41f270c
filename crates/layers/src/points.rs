use foundation::math::{GLOBE_RADIUS, LatLng, lat_lng_to_cartesian};
use gpu::renderer::{PointBatch, RenderCommand, RenderFrame};

use crate::arcs::{ArcRecord, DEFAULT_ARC_COLOR};
use crate::config::GlobeConfig;
use crate::layer::{Layer, LayerId};
use crate::symbology::ColorSource;

/// Endpoint marker of one arc.
#[derive(Debug, Clone, PartialEq)]
pub struct PointMarker {
    pub position: LatLng,
    pub altitude: f64,
    pub radius: f64,
    pub color: String,
}

/// Merged point markers, one per record, at the arc endpoint.
#[derive(Debug, Clone)]
pub struct PointLayer {
    id: LayerId,
    points: Vec<PointMarker>,
    color: ColorSource,
}

impl PointLayer {
    pub fn new(id: u64) -> Self {
        Self {
            id: LayerId(id),
            points: Vec::new(),
            color: ColorSource::from_record(),
        }
    }

    pub fn configure(&mut self, records: &[ArcRecord], config: &GlobeConfig) {
        self.points = records
            .iter()
            .map(|record| PointMarker {
                position: record.end(),
                altitude: 0.0,
                radius: config.point_size,
                color: self.color.resolve(record, DEFAULT_ARC_COLOR),
            })
            .collect();
    }

    pub fn points(&self) -> &[PointMarker] {
        &self.points
    }

    /// Marker positions on the globe surface as flat `xyz` triples, ready to
    /// append to the globe's mesh buffer.
    pub fn vertices(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.points.len() * 3);
        for p in &self.points {
            let v = lat_lng_to_cartesian(p.position, GLOBE_RADIUS * (1.0 + p.altitude));
            out.extend_from_slice(&[v.x as f32, v.y as f32, v.z as f32]);
        }
        out
    }
}

impl Layer for PointLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn clear(&mut self) {
        self.points.clear();
    }

    fn encode(&self, frame: &mut RenderFrame) {
        let Some(first) = self.points.first() else {
            return;
        };
        frame.push(RenderCommand::Points(PointBatch {
            count: self.points.len(),
            radius: first.radius,
            merged: true,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::PointLayer;
    use crate::arcs::ArcRecord;
    use crate::config::GlobeConfig;
    use crate::layer::Layer;

    fn record(color: &str) -> ArcRecord {
        ArcRecord {
            order: 1,
            start_lat: 0.0,
            start_lng: 0.0,
            end_lat: 0.0,
            end_lng: 90.0,
            arc_alt: 0.2,
            color: color.to_string(),
        }
    }

    #[test]
    fn one_marker_per_record_at_endpoint() {
        let mut layer = PointLayer::new(2);
        layer.configure(&[record("#06b6d4"), record("")], &GlobeConfig::showcase());
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.points()[0].color, "#06b6d4");
        assert_eq!(layer.points()[1].color, "#FFFFFF");
        assert_eq!(layer.points()[0].radius, 4.0);
        assert_eq!(layer.points()[0].altitude, 0.0);

        let v = layer.vertices();
        assert_eq!(v.len(), 6);
        assert!((v[0] - 100.0).abs() < 1e-4);
    }
}
