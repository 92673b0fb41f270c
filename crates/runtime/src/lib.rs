pub mod event_bus;
pub mod frame;
pub mod liveness;
pub mod resilience;
pub mod retry;
pub mod timer;

pub use event_bus::*;
pub use frame::*;
pub use liveness::*;
pub use resilience::*;
pub use retry::*;
pub use timer::*;
