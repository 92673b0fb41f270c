pub mod camera;
pub mod context;
pub mod controls;
pub mod host;
pub mod lighting;
pub mod material;
pub mod renderer;

pub use context::*;
pub use host::*;
