pub mod arcs;
pub mod config;
pub mod hex_polygons;
pub mod layer;
pub mod points;
pub mod rings;
pub mod symbology;

pub use arcs::{ArcLayer, ArcRecord, Correction, RecordValidator};
pub use config::{ConfigError, GlobeConfig, WidgetSettings};
pub use hex_polygons::{BoundaryDataset, HexPolygonLayer};
pub use layer::*;
pub use points::PointLayer;
pub use rings::{RingLayer, RingState};
pub use symbology::ColorSource;
