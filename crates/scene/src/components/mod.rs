pub mod drawable3d;
pub mod transform;

pub use drawable3d::*;
pub use transform::*;
