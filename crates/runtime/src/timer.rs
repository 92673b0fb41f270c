use std::future::Future;
use std::time::Duration;

use futures_util::future::{Either, LocalBoxFuture, select};

/// Source of cancellable delays.
///
/// Dropping the returned future cancels the wait. Native drivers use
/// [`TokioTimer`]; the browser build schedules `setTimeout`.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {}ms", .after.as_millis())]
pub struct Elapsed {
    pub after: Duration,
}

/// Races `fut` against a `duration` sleep on `timer`.
pub async fn timeout<F>(timer: &dyn Timer, duration: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    let fut = std::pin::pin!(fut);
    match select(fut, timer.sleep(duration)).await {
        Either::Left((out, _)) => Ok(out),
        Either::Right(_) => Err(Elapsed { after: duration }),
    }
}

#[cfg(feature = "tokio")]
#[derive(Debug, Copy, Clone, Default)]
pub struct TokioTimer;

#[cfg(feature = "tokio")]
impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
