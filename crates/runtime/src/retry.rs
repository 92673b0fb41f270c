//! Bounded exponential-backoff retry shared by every stage that can fail
//! transiently.
//!
//! [`RetryPolicy`] owns the arithmetic (attempt budget and delay curve).
//! Async stages drive it through [`RetryPolicy::run`]; synchronous state
//! machines ask [`RetryPolicy::delay_after_failures`] and schedule the wait
//! themselves.

use std::future::Future;
use std::time::Duration;

use crate::liveness::Liveness;
use crate::timer::Timer;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Report passed to the observer after each failed attempt.
#[derive(Debug)]
pub struct AttemptFailure<'a, E> {
    /// 1-based attempt number that just failed.
    pub attempt: u32,
    pub error: &'a E,
    /// Wait before the next attempt, `None` when the budget is spent.
    pub next_delay: Option<Duration>,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("cancelled before completion")]
    Cancelled,
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// A policy allowing `retries` additional attempts after the first.
    pub fn with_retries(retries: u32, base_delay: Duration) -> Self {
        Self::new(retries.saturating_add(1), base_delay)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// `base_delay × 2^attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Wait before the next attempt after `failures` consecutive failures,
    /// or `None` when no attempts remain.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        if failures == 0 {
            return Some(Duration::ZERO);
        }
        if failures >= self.max_attempts {
            return None;
        }
        Some(self.delay_for(failures - 1))
    }

    /// Like [`RetryPolicy::next_delay`], but the exponent is the failure
    /// count itself: `base × 2^failures` (2000, 4000, 8000 ms for a 1000 ms
    /// base). Stages that bump their counter before scheduling use this.
    pub fn delay_after_failures(&self, failures: u32) -> Option<Duration> {
        if failures >= self.max_attempts {
            return None;
        }
        Some(self.delay_for(failures))
    }

    /// Runs `op` until it succeeds, the budget is spent, or `liveness` is
    /// revoked.
    ///
    /// `op` receives the 1-based attempt number. Liveness is checked before
    /// every attempt and after every await, so a revoked owner never observes
    /// a late result.
    pub async fn run<T, E, F, Fut, O>(
        &self,
        timer: &dyn Timer,
        liveness: &Liveness,
        mut observer: O,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        O: FnMut(&AttemptFailure<'_, E>),
    {
        let mut attempt = 0u32;
        loop {
            if !liveness.is_alive() {
                return Err(RetryError::Cancelled);
            }
            attempt += 1;

            let outcome = op(attempt).await;
            if !liveness.is_alive() {
                return Err(RetryError::Cancelled);
            }

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let next_delay = self.next_delay(attempt);
            observer(&AttemptFailure {
                attempt,
                error: &error,
                next_delay,
            });

            match next_delay {
                Some(delay) => {
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying");
                    timer.sleep(delay).await;
                }
                None => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
            }
        }
    }
}
