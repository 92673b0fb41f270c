pub mod controller;
pub mod draw;
pub mod widget;

#[cfg(target_arch = "wasm32")]
mod gpu_backend;
#[cfg(target_arch = "wasm32")]
mod web;

pub use controller::{GlobeBuilder, SceneController, SceneError, ScenePhase};
pub use widget::{GlobeWidget, RetryAction, SharedWidget, WidgetEnv, WidgetOptions, WidgetStatus};
