//! Arc data generation with timeout, bounded retry and cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::future::{self, FutureExt, LocalBoxFuture};
use layers::arcs::{ArcRecord, RecordValidator};
use layers::config::WidgetSettings;
use parking_lot::Mutex;
use runtime::event_bus::EventBus;
use runtime::liveness::Liveness;
use runtime::retry::{RetryError, RetryPolicy};
use runtime::timer::{Elapsed, Timer, timeout};

use crate::protocol::{GenerateRequest, WorkerMessage};
use crate::worker::{ArcWorker, WorkerError};

pub const EVENT_ATTEMPT_FAILED: &str = "generation.attempt_failed";
pub const EVENT_SUCCEEDED: &str = "generation.succeeded";
pub const EVENT_EXHAUSTED: &str = "generation.exhausted";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("worker error: {0}")]
    Worker(String),
    #[error("malformed worker reply: {0}")]
    Malformed(String),
    #[error("generation {0}")]
    Timeout(Elapsed),
    #[error("a generation request is already outstanding")]
    Busy,
    #[error("generation cancelled")]
    Cancelled,
    #[error("failed to generate arc data after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<GenerationError>,
    },
}

impl From<WorkerError> for GenerationError {
    fn from(err: WorkerError) -> Self {
        GenerationError::Worker(err.to_string())
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeneratorOptions {
    pub count: usize,
    pub min_arc_distance: f64,
    pub timeout: Duration,
    pub policy: RetryPolicy,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self::from(&WidgetSettings::default())
    }
}

impl From<&WidgetSettings> for GeneratorOptions {
    fn from(settings: &WidgetSettings) -> Self {
        Self {
            count: settings.arc_count,
            min_arc_distance: settings.min_arc_distance,
            timeout: settings.generation_timeout(),
            policy: settings.generation_policy(),
        }
    }
}

pub type WorkerFactory = Box<dyn Fn() -> Result<Arc<dyn ArcWorker>, WorkerError>>;

struct Shared {
    options: GeneratorOptions,
    factory: WorkerFactory,
    worker: Mutex<Option<Arc<dyn ArcWorker>>>,
    busy: AtomicBool,
    timer: Arc<dyn Timer>,
    liveness: Liveness,
    events: Arc<Mutex<EventBus>>,
}

/// Produces validated arc records through a worker.
///
/// At most one request is outstanding. A worker that times out or
/// disconnects is terminated and rebuilt from the factory on the next
/// attempt. Once `liveness` is revoked no result, event or retry is
/// delivered.
pub struct ArcGenerator {
    shared: Arc<Shared>,
}

impl ArcGenerator {
    pub fn new(
        options: GeneratorOptions,
        factory: WorkerFactory,
        timer: Arc<dyn Timer>,
        liveness: Liveness,
        events: Arc<Mutex<EventBus>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                options,
                factory,
                worker: Mutex::new(None),
                busy: AtomicBool::new(false),
                timer,
                liveness,
                events,
            }),
        }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.shared.options
    }

    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Starts a generation run.
    ///
    /// Fails immediately with [`GenerationError::Busy`] while another run is
    /// in flight.
    pub fn generate(&self) -> LocalBoxFuture<'static, Result<Vec<ArcRecord>, GenerationError>> {
        if !self.shared.liveness.is_alive() {
            return future::ready(Err(GenerationError::Cancelled)).boxed_local();
        }
        if self.shared.busy.swap(true, Ordering::AcqRel) {
            return future::ready(Err(GenerationError::Busy)).boxed_local();
        }
        let guard = BusyGuard(self.shared.clone());
        async move {
            let shared = guard.0.clone();
            let _guard = guard;
            shared.run().await
        }
        .boxed_local()
    }

    /// Terminates the current worker, if any.
    pub fn terminate(&self) {
        self.shared.drop_worker();
    }
}

impl Drop for ArcGenerator {
    fn drop(&mut self) {
        self.shared.drop_worker();
    }
}

struct BusyGuard(Arc<Shared>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::Release);
    }
}

impl Shared {
    async fn run(&self) -> Result<Vec<ArcRecord>, GenerationError> {
        tracing::info!(count = self.options.count, "generating arc data");
        let result = self
            .options
            .policy
            .run(
                &*self.timer,
                &self.liveness,
                |failure| {
                    tracing::warn!(
                        attempt = failure.attempt,
                        error = %failure.error,
                        next_delay_ms = failure.next_delay.map(|d| d.as_millis() as u64),
                        "arc generation attempt failed"
                    );
                    let message = match failure.next_delay {
                        Some(delay) => format!(
                            "attempt {} failed: {}; retrying in {}ms",
                            failure.attempt,
                            failure.error,
                            delay.as_millis()
                        ),
                        None => format!("attempt {} failed: {}", failure.attempt, failure.error),
                    };
                    self.events.lock().emit(EVENT_ATTEMPT_FAILED, message);
                },
                |attempt| self.attempt(attempt),
            )
            .await;

        match result {
            Ok(records) => {
                tracing::info!(records = records.len(), "arc data ready");
                self.events
                    .lock()
                    .emit(EVENT_SUCCEEDED, format!("{} records", records.len()));
                Ok(records)
            }
            Err(RetryError::Cancelled) => {
                tracing::debug!("arc generation cancelled");
                self.drop_worker();
                Err(GenerationError::Cancelled)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                tracing::error!(attempts, error = %last, "arc generation exhausted");
                let err = GenerationError::Exhausted {
                    attempts,
                    last: Box::new(last),
                };
                self.events.lock().emit(EVENT_EXHAUSTED, err.to_string());
                Err(err)
            }
        }
    }

    async fn attempt(&self, attempt: u32) -> Result<Vec<ArcRecord>, GenerationError> {
        let worker = self.worker()?;
        let request = GenerateRequest {
            count: self.options.count,
            min_arc_distance: self.options.min_arc_distance,
        };
        tracing::debug!(attempt, ?request, "posting generation request");

        match timeout(&*self.timer, self.options.timeout, worker.post(request)).await {
            Err(elapsed) => {
                self.drop_worker();
                Err(GenerationError::Timeout(elapsed))
            }
            Ok(Err(err)) => {
                self.drop_worker();
                Err(err.into())
            }
            Ok(Ok(WorkerMessage::Error(message))) => Err(GenerationError::Worker(message)),
            Ok(Ok(WorkerMessage::Records(value))) => self.accept(value),
        }
    }

    fn worker(&self) -> Result<Arc<dyn ArcWorker>, GenerationError> {
        let mut slot = self.worker.lock();
        if let Some(worker) = slot.as_ref() {
            return Ok(worker.clone());
        }
        let worker = (self.factory)()?;
        *slot = Some(worker.clone());
        Ok(worker)
    }

    fn drop_worker(&self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.terminate();
        }
    }

    /// Checks the reply shape, then re-validates every record.
    fn accept(&self, value: serde_json::Value) -> Result<Vec<ArcRecord>, GenerationError> {
        let serde_json::Value::Array(items) = value else {
            return Err(GenerationError::Malformed("reply is not an array".into()));
        };
        if items.len() != self.options.count {
            return Err(GenerationError::Malformed(format!(
                "expected {} records, got {}",
                self.options.count,
                items.len()
            )));
        }
        let records = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value::<ArcRecord>(item)
                    .map_err(|err| GenerationError::Malformed(format!("record {i}: {err}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (records, corrections) =
            RecordValidator::new(self.options.min_arc_distance).validate_all(&records);
        if !corrections.is_empty() {
            tracing::warn!(corrections = corrections.len(), "worker records corrected");
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    use futures_util::future::{self, FutureExt, LocalBoxFuture};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use runtime::event_bus::EventBus;
    use runtime::liveness::Liveness;
    use runtime::timer::{Elapsed, TokioTimer};
    use serde_json::json;
    use tokio::time::Instant;

    use super::{
        ArcGenerator, EVENT_ATTEMPT_FAILED, EVENT_EXHAUSTED, EVENT_SUCCEEDED, GenerationError,
        GeneratorOptions, WorkerFactory,
    };
    use crate::protocol::{GenerateRequest, WorkerMessage};
    use crate::worker::{ArcWorker, FlakyWorker, InlineWorker, WorkerReply};

    enum Script {
        Reply(WorkerMessage),
        Stall,
    }

    /// Worker that plays back scripted replies and records post times.
    #[derive(Default)]
    struct Scripted {
        script: Mutex<VecDeque<Script>>,
        posts: Mutex<Vec<Instant>>,
        terminations: AtomicUsize,
    }

    impl Scripted {
        fn new(script: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                ..Self::default()
            })
        }

        fn gaps_ms(&self) -> Vec<u128> {
            self.posts
                .lock()
                .windows(2)
                .map(|w| (w[1] - w[0]).as_millis())
                .collect()
        }
    }

    impl ArcWorker for Scripted {
        fn post(&self, _request: GenerateRequest) -> LocalBoxFuture<'static, WorkerReply> {
            self.posts.lock().push(Instant::now());
            match self.script.lock().pop_front() {
                Some(Script::Reply(message)) => future::ready(Ok(message)).boxed_local(),
                Some(Script::Stall) | None => future::pending().boxed_local(),
            }
        }

        fn terminate(&self) {
            self.terminations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn options(count: usize) -> GeneratorOptions {
        GeneratorOptions {
            count,
            ..GeneratorOptions::default()
        }
    }

    fn scripted_factory(worker: Arc<Scripted>, builds: Arc<AtomicUsize>) -> WorkerFactory {
        Box::new(move || {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(worker.clone() as Arc<dyn ArcWorker>)
        })
    }

    fn generator(
        options: GeneratorOptions,
        factory: WorkerFactory,
    ) -> (ArcGenerator, Liveness, Arc<Mutex<EventBus>>) {
        let liveness = Liveness::new();
        let events = Arc::new(Mutex::new(EventBus::new()));
        let generator = ArcGenerator::new(
            options,
            factory,
            Arc::new(TokioTimer),
            liveness.clone(),
            events.clone(),
        );
        (generator, liveness, events)
    }

    fn error(message: &str) -> Script {
        Script::Reply(WorkerMessage::Error(message.into()))
    }

    fn record_json(order: u32) -> serde_json::Value {
        json!({
            "order": order,
            "startLat": 10.0,
            "startLng": 20.0,
            "endLat": -5.0,
            "endLng": 40.0,
            "arcAlt": 0.3,
            "color": "#3b82f6"
        })
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_first_attempt_with_inline_worker() {
        let (generator, _, events) = generator(
            options(40),
            Box::new(|| Ok(Arc::new(InlineWorker::new(Some(5))) as Arc<dyn ArcWorker>)),
        );
        let records = generator.generate().await.unwrap();
        assert_eq!(records.len(), 40);
        assert!(records.iter().all(|r| r.satisfies_invariants()));
        assert_eq!(events.lock().count(EVENT_SUCCEEDED), 1);
        assert!(!generator.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_growing_delays() {
        let budget = Arc::new(AtomicU32::new(2));
        let (generator, _, events) = generator(
            options(10),
            Box::new(move || {
                Ok(Arc::new(FlakyWorker::new(InlineWorker::new(Some(5)), budget.clone()))
                    as Arc<dyn ArcWorker>)
            }),
        );
        let started = Instant::now();
        let records = generator.generate().await.unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
        assert_eq!(events.lock().count(EVENT_ATTEMPT_FAILED), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_three_attempts_without_trailing_sleep() {
        let worker = Scripted::new(vec![error("a"), error("b"), error("c")]);
        let builds = Arc::new(AtomicUsize::new(0));
        let (generator, _, events) =
            generator(options(1), scripted_factory(worker.clone(), builds.clone()));

        let started = Instant::now();
        let err = generator.generate().await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::Exhausted {
                attempts: 3,
                last: Box::new(GenerationError::Worker("c".into())),
            }
        );
        assert!(err.to_string().starts_with("failed to generate arc data after 3 attempts"));
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
        assert_eq!(worker.gaps_ms(), vec![1000, 2000]);
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        let events = events.lock();
        assert_eq!(events.count(EVENT_ATTEMPT_FAILED), 3);
        assert_eq!(events.count(EVENT_EXHAUSTED), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_replaces_the_worker() {
        let worker = Scripted::new(vec![
            Script::Stall,
            Script::Reply(WorkerMessage::Records(json!([record_json(1)]))),
        ]);
        let builds = Arc::new(AtomicUsize::new(0));
        let (generator, _, events) =
            generator(options(1), scripted_factory(worker.clone(), builds.clone()));

        let records = generator.generate().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(worker.terminations.load(Ordering::SeqCst), 1);
        assert_eq!(worker.gaps_ms(), vec![9000]);

        let events = events.lock();
        let failure = events.of_kind(EVENT_ATTEMPT_FAILED).next().unwrap();
        assert_eq!(
            failure.message,
            "attempt 1 failed: generation timed out after 8000ms; retrying in 1000ms"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_malformed_replies() {
        let worker = Scripted::new(vec![
            Script::Reply(WorkerMessage::Records(json!({"not": "an array"}))),
            Script::Reply(WorkerMessage::Records(json!([record_json(1)]))),
            Script::Reply(WorkerMessage::Records(json!([record_json(1), {"order": 2}]))),
        ]);
        let (generator, _, _) = generator(
            options(2),
            scripted_factory(worker, Arc::new(AtomicUsize::new(0))),
        );
        let GenerationError::Exhausted { last, .. } = generator.generate().await.unwrap_err()
        else {
            panic!("expected exhaustion");
        };
        assert!(matches!(*last, GenerationError::Malformed(ref m) if m.starts_with("record 1")));
    }

    #[tokio::test(start_paused = true)]
    async fn revalidates_worker_records() {
        let mut degenerate = record_json(1);
        degenerate["endLat"] = json!(10.0);
        degenerate["endLng"] = json!(20.0);
        degenerate["arcAlt"] = json!(9.0);
        let worker = Scripted::new(vec![Script::Reply(WorkerMessage::Records(json!([
            degenerate
        ])))]);
        let (generator, _, _) = generator(
            options(1),
            scripted_factory(worker, Arc::new(AtomicUsize::new(0))),
        );
        let records = generator.generate().await.unwrap();
        assert!(records[0].satisfies_invariants());
        assert!(!records[0].is_degenerate());
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_while_busy_is_rejected() {
        let worker = Scripted::new(vec![Script::Reply(WorkerMessage::Records(json!([
            record_json(1)
        ])))]);
        let (generator, _, _) = generator(
            options(1),
            scripted_factory(worker, Arc::new(AtomicUsize::new(0))),
        );
        let first = generator.generate();
        assert!(generator.is_busy());
        assert_eq!(generator.generate().await, Err(GenerationError::Busy));
        assert!(first.await.is_ok());
        assert!(!generator.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn revoked_liveness_cancels_pending_retry() {
        let worker = Scripted::new(vec![error("a"), error("b"), error("c")]);
        let (generator, liveness, events) = generator(
            options(1),
            scripted_factory(worker.clone(), Arc::new(AtomicUsize::new(0))),
        );

        let unmount = async {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            liveness.revoke();
            generator.terminate();
        };
        let (result, ()) = tokio::join!(generator.generate(), unmount);

        assert_eq!(result, Err(GenerationError::Cancelled));
        assert_eq!(worker.posts.lock().len(), 2);
        let events = events.lock();
        assert_eq!(events.count(EVENT_ATTEMPT_FAILED), 2);
        assert_eq!(events.count(EVENT_EXHAUSTED), 0);
        assert_eq!(events.count(EVENT_SUCCEEDED), 0);
    }

    #[test]
    fn timeout_message_names_the_duration() {
        let err = GenerationError::Timeout(Elapsed {
            after: Duration::from_millis(8000),
        });
        assert_eq!(err.to_string(), "generation timed out after 8000ms");
    }
}
