//! Loading / error / pass-through shell shared by the widget's stages.
//!
//! A [`Guarded`] value tracks one stage. The presentation layer never looks
//! at the stage's own state machine; it only renders what [`Guarded::present`]
//! returns.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;

/// Generic text shown for failures that carry no user-facing message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Politeness {
    Polite,
    Assertive,
}

/// Live-region update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Announcement {
    pub politeness: Politeness,
    pub text: String,
}

impl Announcement {
    pub fn polite(text: impl Into<String>) -> Self {
        Self {
            politeness: Politeness::Polite,
            text: text.into(),
        }
    }

    pub fn assertive(text: impl Into<String>) -> Self {
        Self {
            politeness: Politeness::Assertive,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryAffordance {
    pub label: String,
    pub enabled: bool,
}

impl RetryAffordance {
    pub fn available() -> Self {
        Self {
            label: "Try again".to_string(),
            enabled: true,
        }
    }

    pub fn disabled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageState<T> {
    Idle,
    Loading { message: String },
    Failed { message: String, recoverable: bool },
    Ready(T),
}

#[derive(Debug, PartialEq)]
pub enum Presentation<'a, T> {
    Idle,
    Loading(Announcement),
    Error {
        announcement: Announcement,
        retry: Option<RetryAffordance>,
    },
    Content(&'a T),
}

#[derive(Debug, Clone)]
pub struct Guarded<T> {
    stage: &'static str,
    state: StageState<T>,
}

impl<T> Guarded<T> {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            state: StageState::Idle,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn state(&self) -> &StageState<T> {
        &self.state
    }

    pub fn begin(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(stage = self.stage, %message, "stage loading");
        self.state = StageState::Loading { message };
    }

    pub fn succeed(&mut self, value: T) {
        tracing::debug!(stage = self.stage, "stage ready");
        self.state = StageState::Ready(value);
    }

    pub fn fail(&mut self, message: impl Into<String>, recoverable: bool) {
        let message = message.into();
        if recoverable {
            tracing::warn!(stage = self.stage, %message, "stage failed");
        } else {
            tracing::error!(stage = self.stage, %message, "stage failed permanently");
        }
        self.state = StageState::Failed {
            message,
            recoverable,
        };
    }

    /// Drops any value or error; retry re-enters through [`Guarded::begin`].
    pub fn reset(&mut self) {
        self.state = StageState::Idle;
    }

    pub fn value(&self) -> Option<&T> {
        match &self.state {
            StageState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            StageState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn take(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.state, StageState::Idle) {
            StageState::Ready(value) => Some(value),
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, StageState::Loading { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, StageState::Failed { .. })
    }

    /// Runs `f`, turning a panic into a recoverable failure with a generic
    /// message. The panic payload is logged, never shown.
    pub fn catch<R>(&mut self, f: impl FnOnce() -> R) -> Option<R> {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(out) => Some(out),
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                tracing::error!(stage = self.stage, %detail, "stage panicked");
                self.state = StageState::Failed {
                    message: GENERIC_FAILURE.to_string(),
                    recoverable: true,
                };
                None
            }
        }
    }

    pub fn present(&self) -> Presentation<'_, T> {
        match &self.state {
            StageState::Idle => Presentation::Idle,
            StageState::Loading { message } => Presentation::Loading(Announcement::polite(message)),
            StageState::Failed {
                message,
                recoverable,
            } => Presentation::Error {
                announcement: Announcement::assertive(message),
                retry: recoverable.then(RetryAffordance::available),
            },
            StageState::Ready(value) => Presentation::Content(value),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
