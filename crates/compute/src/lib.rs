pub mod generator;
pub mod protocol;
pub mod sampler;
pub mod worker;

pub use generator::*;
pub use protocol::*;
pub use worker::*;
