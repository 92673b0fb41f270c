use std::path::Path;
use std::sync::Arc;

use gpu::renderer::{HexPolygonBatch, RenderCommand, RenderFrame};
use serde::Deserialize;

use crate::config::{ConfigError, GlobeConfig};
use crate::layer::{Layer, LayerId};
use crate::symbology::parse_or_white;

pub const HEX_RESOLUTION: u8 = 3;
pub const HEX_MARGIN: f64 = 0.7;

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: serde_json::Value,
    pub geometry: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

/// Country boundaries used for the hex landmass overlay.
///
/// Supplied by the surrounding application and treated as read-only; only
/// the envelope is checked, feature geometry is passed through untouched.
#[derive(Debug, Clone, Default)]
pub struct BoundaryDataset {
    features: Vec<Feature>,
}

impl BoundaryDataset {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_geojson_str(s: &str) -> Result<Self, ConfigError> {
        let collection: FeatureCollection = serde_json::from_str(s)?;
        if collection.kind != "FeatureCollection" {
            tracing::warn!(kind = %collection.kind, "boundary dataset is not a FeatureCollection");
        }
        Ok(Self {
            features: collection.features,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_geojson_str(&text)
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct HexPolygonLayer {
    id: LayerId,
    dataset: Option<Arc<BoundaryDataset>>,
    color: String,
}

impl HexPolygonLayer {
    pub fn new(id: u64) -> Self {
        Self {
            id: LayerId(id),
            dataset: None,
            color: GlobeConfig::default().polygon_color,
        }
    }

    pub fn configure(&mut self, dataset: Arc<BoundaryDataset>, config: &GlobeConfig) {
        self.dataset = Some(dataset);
        self.color = config.polygon_color.clone();
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

impl Layer for HexPolygonLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn len(&self) -> usize {
        self.dataset.as_ref().map_or(0, |d| d.len())
    }

    fn clear(&mut self) {
        self.dataset = None;
    }

    fn encode(&self, frame: &mut RenderFrame) {
        if self.is_empty() {
            return;
        }
        frame.push(RenderCommand::HexPolygons(HexPolygonBatch {
            features: self.len(),
            resolution: HEX_RESOLUTION,
            margin: HEX_MARGIN,
            color: parse_or_white(&self.color),
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{BoundaryDataset, HexPolygonLayer};
    use crate::config::{ConfigError, GlobeConfig};
    use crate::layer::Layer;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "A"}, "geometry": {"type": "Polygon", "coordinates": []}},
            {"type": "Feature", "geometry": {"type": "Polygon", "coordinates": []}}
        ]
    }"#;

    #[test]
    fn parses_feature_collection() {
        let dataset = BoundaryDataset::from_geojson_str(SAMPLE).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.features()[0].properties["name"], "A");
        assert!(dataset.features()[1].properties.is_null());
    }

    #[test]
    fn rejects_non_collections() {
        assert!(matches!(
            BoundaryDataset::from_geojson_str("[1, 2]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn layer_counts_features_until_cleared() {
        let dataset = Arc::new(BoundaryDataset::from_geojson_str(SAMPLE).unwrap());
        let mut layer = HexPolygonLayer::new(4);
        layer.configure(dataset, &GlobeConfig::default());
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.color(), "rgba(255,255,255,0.7)");
        layer.clear();
        assert!(layer.is_empty());
    }
}
