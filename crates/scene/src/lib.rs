pub mod components;
pub mod entity;
pub mod geometry;
pub mod prefabs;
pub mod sanitize;
pub mod world;

pub use geometry::MeshBuffer;
pub use sanitize::{GeometryError, Repair, SanitizeReport, sanitize_mesh};
pub use world::*;
