//! Arc data workers.
//!
//! A worker answers one [`GenerateRequest`] at a time. Production builds run
//! the sampler on a dedicated thread; tests and the browser build use the
//! inline variant.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use futures_util::future::{self, FutureExt, LocalBoxFuture};
use parking_lot::Mutex;

use crate::protocol::{GenerateRequest, WorkerMessage};
use crate::sampler::ArcSampler;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("worker terminated")]
    Terminated,
    #[error("worker is still handling a request")]
    Busy,
    #[error("failed to start worker: {0}")]
    Spawn(String),
}

pub type WorkerReply = Result<WorkerMessage, WorkerError>;

pub trait ArcWorker {
    /// Sends `request`; the future resolves with the worker's reply.
    fn post(&self, request: GenerateRequest) -> LocalBoxFuture<'static, WorkerReply>;

    /// Stops the worker. Pending replies resolve to [`WorkerError::Terminated`].
    fn terminate(&self);
}

/// Runs the sampler on the caller's thread.
#[derive(Debug)]
pub struct InlineWorker {
    sampler: Mutex<ArcSampler>,
    terminated: AtomicBool,
}

impl InlineWorker {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            sampler: Mutex::new(ArcSampler::new(seed)),
            terminated: AtomicBool::new(false),
        }
    }
}

impl ArcWorker for InlineWorker {
    fn post(&self, request: GenerateRequest) -> LocalBoxFuture<'static, WorkerReply> {
        if self.terminated.load(Ordering::Acquire) {
            return future::ready(Err(WorkerError::Terminated)).boxed_local();
        }
        let reply = self.sampler.lock().handle(&request);
        future::ready(Ok(reply)).boxed_local()
    }

    fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
    }
}

/// Answers the first requests with an error reply, then defers to `inner`.
///
/// The failure budget is shared so replacement workers built by the same
/// factory keep counting down.
#[derive(Debug)]
pub struct FlakyWorker<W> {
    inner: W,
    failures_left: Arc<AtomicU32>,
}

impl<W> FlakyWorker<W> {
    pub fn new(inner: W, failures_left: Arc<AtomicU32>) -> Self {
        Self {
            inner,
            failures_left,
        }
    }
}

impl<W: ArcWorker> ArcWorker for FlakyWorker<W> {
    fn post(&self, request: GenerateRequest) -> LocalBoxFuture<'static, WorkerReply> {
        let fail = self
            .failures_left
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return future::ready(Ok(WorkerMessage::Error("injected worker failure".into())))
                .boxed_local();
        }
        self.inner.post(request)
    }

    fn terminate(&self) {
        self.inner.terminate();
    }
}

#[cfg(not(target_arch = "wasm32"))]
struct Job {
    request: GenerateRequest,
    reply: tokio::sync::oneshot::Sender<WorkerMessage>,
}

/// Sampler on a named background thread.
///
/// Termination drops the job channel and raises the cancel flag; the thread
/// finishes its current request, discards the reply and exits.
#[cfg(not(target_arch = "wasm32"))]
pub struct ThreadWorker {
    jobs: Mutex<Option<crossbeam_channel::Sender<Job>>>,
    cancelled: Arc<AtomicBool>,
}

#[cfg(not(target_arch = "wasm32"))]
impl ThreadWorker {
    pub fn spawn(seed: Option<u64>) -> Result<Self, WorkerError> {
        let (tx, rx) = crossbeam_channel::bounded::<Job>(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        std::thread::Builder::new()
            .name("arc-generator".into())
            .spawn(move || {
                let mut sampler = ArcSampler::new(seed);
                while let Ok(job) = rx.recv() {
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    let reply = sampler.handle(&job.request);
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    let _ = job.reply.send(reply);
                }
                tracing::debug!("arc generator thread exiting");
            })
            .map_err(|err| WorkerError::Spawn(err.to_string()))?;

        Ok(Self {
            jobs: Mutex::new(Some(tx)),
            cancelled,
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl ArcWorker for ThreadWorker {
    fn post(&self, request: GenerateRequest) -> LocalBoxFuture<'static, WorkerReply> {
        use crossbeam_channel::TrySendError;

        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        let sent = match self.jobs.lock().as_ref() {
            None => Err(WorkerError::Terminated),
            Some(jobs) => jobs
                .try_send(Job {
                    request,
                    reply: reply_tx,
                })
                .map_err(|err| match err {
                    TrySendError::Full(_) => WorkerError::Busy,
                    TrySendError::Disconnected(_) => WorkerError::Terminated,
                }),
        };
        match sent {
            Err(err) => future::ready(Err(err)).boxed_local(),
            Ok(()) => async move { reply_rx.await.map_err(|_| WorkerError::Terminated) }
                .boxed_local(),
        }
    }

    fn terminate(&self) {
        self.cancelled.store(true, Ordering::Release);
        if self.jobs.lock().take().is_some() {
            tracing::debug!("arc generator worker terminated");
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Drop for ThreadWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}
