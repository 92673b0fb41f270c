//! The globe widget: render host, arc generation and scene controller behind
//! one mount/unmount lifecycle.
//!
//! Each stage sits in its own [`Guarded`] shell so a failure only ever
//! retries that stage. Async work (generation, retry backoff) runs in the
//! free functions at the bottom of this module; they hold the widget through
//! [`SharedWidget`] and re-check liveness after every await.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use compute::generator::{ArcGenerator, GenerationError, GeneratorOptions, WorkerFactory};
use futures_util::future::LocalBoxFuture;
use gpu::context::GraphicsProbe;
use gpu::host::{CONTEXT_LOST, ContextLoss, RenderHost, SCENE_LABEL, SCENE_ROLE_DESCRIPTION};
use gpu::renderer::RenderFrame;
use layers::arcs::ArcRecord;
use layers::config::{ConfigError, GlobeConfig, WidgetSettings};
use layers::hex_polygons::BoundaryDataset;
use parking_lot::Mutex;
use runtime::event_bus::EventBus;
use runtime::frame::FrameScheduler;
use runtime::liveness::Liveness;
use runtime::resilience::{Announcement, GENERIC_FAILURE, Guarded, Presentation, RetryAffordance};
use runtime::timer::Timer;
use scene::World;
use scene::entity::EntityId;
use serde::Serialize;

use crate::controller::{GlobeBuilder, SceneController, ScenePhase};

pub const GENERATING: &str = "Generating globe data... This may take a few moments.";
pub const RENDERING: &str = "Rendering Globe...";
pub const MAX_RETRIES_REACHED: &str = "Max retries reached";

pub const EVENT_MOUNTED: &str = "widget.mounted";
pub const EVENT_UNMOUNTED: &str = "widget.unmounted";
pub const EVENT_RETRY: &str = "widget.retry";
pub const EVENT_SCENE_READY: &str = "scene.ready";
pub const EVENT_SCENE_RETRYING: &str = "scene.retrying";
pub const EVENT_SCENE_FALLBACK: &str = "scene.fallback";
pub const EVENT_SCENE_FAILED: &str = "scene.failed";
pub const EVENT_CONTEXT_LOST: &str = "context.lost";
pub const EVENT_CONTEXT_RESTORED: &str = "context.restored";

#[derive(Debug, Clone)]
pub struct WidgetOptions {
    pub config: GlobeConfig,
    pub settings: WidgetSettings,
    pub boundaries: Option<Arc<BoundaryDataset>>,
    pub device_pixel_ratio: f64,
    pub viewport: Option<(f64, f64)>,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            config: GlobeConfig::default(),
            settings: WidgetSettings::default(),
            boundaries: None,
            device_pixel_ratio: 1.0,
            viewport: None,
        }
    }
}

impl WidgetOptions {
    /// Options from the page's JSON inputs. A missing config means the
    /// showcase globe; missing settings or boundaries take their defaults.
    pub fn from_json(
        config: Option<&str>,
        settings: Option<&str>,
        boundaries: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let config = match config {
            Some(json) => GlobeConfig::from_json_str(json)?,
            None => GlobeConfig::showcase(),
        };
        let settings = match settings {
            Some(json) => WidgetSettings::from_json_str(json)?,
            None => WidgetSettings::default(),
        };
        let boundaries = match boundaries {
            Some(json) => Some(Arc::new(BoundaryDataset::from_geojson_str(json)?)),
            None => None,
        };
        Ok(Self {
            config,
            settings,
            boundaries,
            ..Self::default()
        })
    }
}

/// Platform services the widget runs on.
pub struct WidgetEnv {
    pub timer: Arc<dyn Timer>,
    pub frames: Arc<dyn FrameScheduler>,
    pub workers: WorkerFactory,
}

/// What the surrounding page should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum WidgetStatus {
    Idle,
    Loading {
        announcement: Announcement,
    },
    /// Graphics context lost, waiting for the restore.
    Waiting {
        announcement: Announcement,
    },
    Error {
        announcement: Announcement,
        retry: Option<RetryAffordance>,
    },
    #[serde(rename_all = "camelCase")]
    Ready {
        label: &'static str,
        role_description: &'static str,
        fallback: bool,
        /// Offered over the fallback globe so the data globe can be retried.
        retry: Option<RetryAffordance>,
    },
    Unmounted,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RetryAction {
    /// Generation must run again; drive it with [`load`].
    Regenerate,
    /// The scene was retried in place.
    Scene,
    /// Manual retry budget spent.
    Refused,
    /// Nothing had failed.
    Ignored,
}

pub type GenerationFuture = LocalBoxFuture<'static, Result<Vec<ArcRecord>, GenerationError>>;

pub struct GlobeWidget {
    world: World,
    host: Option<RenderHost>,
    host_stage: Guarded<()>,
    generation: Guarded<Vec<ArcRecord>>,
    scene: Guarded<()>,
    controller: SceneController,
    generator: ArcGenerator,
    timer: Arc<dyn Timer>,
    liveness: Liveness,
    events: Arc<Mutex<EventBus>>,
    manual_retries: u32,
    manual_retry_limit: u32,
    scene_epoch: u64,
}

impl GlobeWidget {
    /// Mounts the host and prepares the stages. Nothing is generated until
    /// [`GlobeWidget::begin_generation`] (or [`load`]) runs.
    ///
    /// Missing graphics support leaves the widget in a terminal error state
    /// rather than failing construction, so the page can still show it.
    pub fn mount(options: WidgetOptions, probe: &dyn GraphicsProbe, env: WidgetEnv) -> Self {
        let liveness = Liveness::new();
        let events = Arc::new(Mutex::new(EventBus::new()));
        let mut world = World::new();

        let mut controller = SceneController::new(
            options.config,
            options.settings.scene_policy(),
            env.frames,
            options.settings.seed,
        );
        if let Some(boundaries) = options.boundaries {
            controller = controller.with_boundaries(boundaries);
        }

        let mut host_stage = Guarded::new("host");
        let host_config = controller
            .config()
            .host_config(options.device_pixel_ratio, options.viewport);
        let host = match RenderHost::mount(&mut world, probe, host_config) {
            Ok(host) => {
                host_stage.succeed(());
                Some(host)
            }
            Err(err) => {
                host_stage.fail(err.to_string(), false);
                None
            }
        };

        let generator = ArcGenerator::new(
            GeneratorOptions::from(&options.settings),
            env.workers,
            env.timer.clone(),
            liveness.clone(),
            events.clone(),
        );

        events
            .lock()
            .emit(EVENT_MOUNTED, if host.is_some() { "ready" } else { "graphics unavailable" });

        Self {
            world,
            host,
            host_stage,
            generation: Guarded::new("generation"),
            scene: Guarded::new("scene"),
            controller,
            generator,
            timer: env.timer,
            liveness,
            events,
            manual_retries: 0,
            manual_retry_limit: options.settings.manual_retry_limit,
            scene_epoch: 0,
        }
    }

    pub fn with_globe_builder(mut self, builder: impl GlobeBuilder + 'static) -> Self {
        self.controller.set_builder(builder);
        self
    }

    pub fn is_mounted(&self) -> bool {
        self.liveness.is_alive()
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    pub fn timer(&self) -> Arc<dyn Timer> {
        self.timer.clone()
    }

    pub fn events(&self) -> &Arc<Mutex<EventBus>> {
        &self.events
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn host(&self) -> Option<&RenderHost> {
        self.host.as_ref()
    }

    pub fn controller(&self) -> &SceneController {
        &self.controller
    }

    pub fn generator(&self) -> &ArcGenerator {
        &self.generator
    }

    pub fn records(&self) -> Option<&[ArcRecord]> {
        self.generation.value().map(Vec::as_slice)
    }

    pub fn manual_retries(&self) -> u32 {
        self.manual_retries
    }

    fn root(&self) -> Option<EntityId> {
        self.host.as_ref().and_then(RenderHost::root)
    }

    fn emit(&self, kind: &'static str, message: impl Into<String>) {
        self.events.lock().emit(kind, message);
    }

    /// Starts generation unless one is already running or the host is
    /// unavailable.
    pub fn begin_generation(&mut self) -> Option<GenerationFuture> {
        if !self.is_mounted() || self.host.is_none() || self.generation.is_loading() {
            return None;
        }
        self.generation.begin(GENERATING);
        self.scene.reset();
        Some(self.generator.generate())
    }

    /// Applies a generation result. Ignored once unmounted.
    pub fn finish_generation(&mut self, result: Result<Vec<ArcRecord>, GenerationError>) {
        if !self.is_mounted() {
            tracing::debug!("generation settled after unmount, ignoring");
            return;
        }
        match result {
            Ok(records) => {
                self.generation.succeed(records);
                self.initialize_scene();
            }
            Err(GenerationError::Cancelled) | Err(GenerationError::Busy) => {
                tracing::debug!("generation result discarded");
            }
            Err(err) => self.generation.fail(err.to_string(), true),
        }
    }

    fn initialize_scene(&mut self) {
        let Some(root) = self.root() else {
            return;
        };
        if self.host.as_ref().is_some_and(RenderHost::is_context_lost) {
            return;
        }
        let Some(records) = self.generation.value() else {
            return;
        };
        self.scene.begin(RENDERING);
        let outcome = self
            .scene
            .catch(|| self.controller.initialize(&mut self.world, root, records));
        self.sync_scene_stage(outcome.is_none());
    }

    fn sync_scene_stage(&mut self, panicked: bool) {
        if panicked {
            self.controller.abort(&mut self.world, GENERIC_FAILURE);
            self.emit(EVENT_SCENE_FAILED, GENERIC_FAILURE);
            return;
        }
        match self.controller.phase() {
            ScenePhase::Ready => {
                self.scene.succeed(());
                self.emit(EVENT_SCENE_READY, "");
            }
            ScenePhase::Fallback => {
                self.scene.succeed(());
                self.emit(EVENT_SCENE_FALLBACK, self.controller.error().unwrap_or_default());
            }
            ScenePhase::Retrying { attempt, delay } => {
                self.emit(
                    EVENT_SCENE_RETRYING,
                    format!("attempt {attempt} in {}ms", delay.as_millis()),
                );
            }
            ScenePhase::Error => {
                let message = self.controller.error().unwrap_or(GENERIC_FAILURE).to_string();
                self.emit(EVENT_SCENE_FAILED, message.clone());
                self.scene.fail(message, true);
            }
            ScenePhase::Initializing | ScenePhase::Uninitialized | ScenePhase::Disposed => {
                self.scene.reset();
            }
        }
    }

    /// Pending automatic scene retry: the epoch it belongs to and the wait.
    pub fn scene_retry(&self) -> Option<(u64, Duration)> {
        if !self.is_mounted() {
            return None;
        }
        match self.controller.phase() {
            ScenePhase::Retrying { delay, .. } => Some((self.scene_epoch, delay)),
            _ => None,
        }
    }

    /// Runs the scheduled scene retry. Returns `true` while more retries are
    /// pending. A stale `epoch` (superseded by a manual retry or a context
    /// change) does nothing.
    pub fn retry_scene(&mut self, epoch: u64) -> bool {
        if !self.is_mounted() || epoch != self.scene_epoch {
            return false;
        }
        let Some(root) = self.root() else {
            return false;
        };
        let outcome = self
            .scene
            .catch(|| self.controller.retry(&mut self.world, root));
        self.sync_scene_stage(outcome.is_none());
        matches!(self.controller.phase(), ScenePhase::Retrying { .. })
    }

    /// Handles one animation frame: a rotation step, then the frame to draw.
    pub fn on_animation_frame(&mut self) -> Option<RenderFrame> {
        if !self.is_mounted() {
            return None;
        }
        self.controller.on_animation_frame(&mut self.world);
        self.render()
    }

    /// Host frame plus the controller's batches; `None` while the context is
    /// lost, before mount or after unmount.
    pub fn render(&self) -> Option<RenderFrame> {
        let mut frame = self.host.as_ref()?.collect(&self.world)?;
        self.controller.encode(&mut frame);
        Some(frame)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if let Some(host) = self.host.as_mut() {
            host.resize(width, height);
        }
    }

    pub fn on_context_lost(&mut self) -> Option<ContextLoss> {
        if !self.is_mounted() {
            return None;
        }
        let loss = self.host.as_mut()?.on_context_lost();
        self.scene_epoch += 1;
        self.controller.release_for_context_loss(&mut self.world);
        self.scene.reset();
        self.emit(EVENT_CONTEXT_LOST, "");
        Some(loss)
    }

    /// Rebuilds the scene from the kept records. Returns `true` if the
    /// widget was waiting for the restore.
    pub fn on_context_restored(&mut self) -> bool {
        if !self.is_mounted() {
            return false;
        }
        let Some(host) = self.host.as_mut() else {
            return false;
        };
        if !host.on_context_restored() {
            return false;
        }
        self.manual_retries = 0;
        self.scene_epoch += 1;
        self.emit(EVENT_CONTEXT_RESTORED, "");
        self.initialize_scene();
        true
    }

    fn retry_affordance(&self) -> RetryAffordance {
        if self.manual_retries >= self.manual_retry_limit {
            RetryAffordance::disabled(MAX_RETRIES_REACHED)
        } else {
            RetryAffordance::available()
        }
    }

    /// User-triggered retry of whichever stage failed.
    pub fn retry(&mut self) -> RetryAction {
        if !self.is_mounted() {
            return RetryAction::Ignored;
        }
        let generation_failed = self.generation.is_failed();
        let on_fallback = self.controller.phase() == ScenePhase::Fallback;
        if !generation_failed && !self.scene.is_failed() && !on_fallback {
            return RetryAction::Ignored;
        }
        if self.manual_retries >= self.manual_retry_limit {
            tracing::warn!(limit = self.manual_retry_limit, "manual retry refused");
            return RetryAction::Refused;
        }
        self.manual_retries += 1;
        self.emit(EVENT_RETRY, format!("manual retry {}", self.manual_retries));

        let no_records = self.generation.value().is_none_or(|r| r.is_empty());
        if generation_failed || no_records {
            self.generation.reset();
            self.scene.reset();
            return RetryAction::Regenerate;
        }

        let Some(root) = self.root() else {
            return RetryAction::Ignored;
        };
        self.scene_epoch += 1;
        self.scene.begin(RENDERING);
        let outcome = self
            .scene
            .catch(|| self.controller.manual_retry(&mut self.world, root));
        self.sync_scene_stage(outcome.is_none());
        RetryAction::Scene
    }

    pub fn status(&self) -> WidgetStatus {
        if !self.is_mounted() {
            return WidgetStatus::Unmounted;
        }
        if let Presentation::Error {
            announcement,
            retry,
        } = self.host_stage.present()
        {
            return WidgetStatus::Error {
                announcement,
                retry,
            };
        }
        if self.host.as_ref().is_some_and(RenderHost::is_context_lost) {
            return WidgetStatus::Waiting {
                announcement: Announcement::assertive(CONTEXT_LOST),
            };
        }
        match self.generation.present() {
            Presentation::Idle => return WidgetStatus::Idle,
            Presentation::Loading(announcement) => return WidgetStatus::Loading { announcement },
            Presentation::Error {
                announcement,
                retry,
            } => {
                return WidgetStatus::Error {
                    announcement,
                    retry: retry.map(|_| self.retry_affordance()),
                };
            }
            Presentation::Content(_) => {}
        }
        match self.scene.present() {
            Presentation::Idle => WidgetStatus::Idle,
            Presentation::Loading(announcement) => WidgetStatus::Loading { announcement },
            Presentation::Error {
                announcement,
                retry,
            } => WidgetStatus::Error {
                announcement,
                retry: retry.map(|_| self.retry_affordance()),
            },
            Presentation::Content(_) => {
                let fallback = self.controller.phase() == ScenePhase::Fallback;
                WidgetStatus::Ready {
                    label: SCENE_LABEL,
                    role_description: SCENE_ROLE_DESCRIPTION,
                    fallback,
                    retry: fallback.then(|| self.retry_affordance()),
                }
            }
        }
    }

    /// Revokes liveness, terminates the worker, cancels the pending frame and
    /// releases the scene. Idempotent.
    pub fn unmount(&mut self) {
        if !self.liveness.revoke() {
            return;
        }
        self.generator.terminate();
        self.controller.dispose(&mut self.world);
        if let Some(host) = self.host.as_mut() {
            host.unmount(&mut self.world);
        }
        tracing::info!("globe widget unmounted");
        self.emit(EVENT_UNMOUNTED, "");
    }
}

impl Drop for GlobeWidget {
    fn drop(&mut self) {
        self.unmount();
    }
}

pub type SharedWidget = Rc<RefCell<GlobeWidget>>;

/// Generates data, builds the scene and waits out any automatic scene
/// retries.
pub async fn load(widget: SharedWidget) {
    let pending = widget.borrow_mut().begin_generation();
    let Some(pending) = pending else {
        return;
    };
    let result = pending.await;
    widget.borrow_mut().finish_generation(result);
    settle_scene(widget).await;
}

/// Sleeps through scheduled scene retries until the scene settles, the epoch
/// changes or the widget unmounts.
pub async fn settle_scene(widget: SharedWidget) {
    loop {
        let (timer, epoch, delay) = {
            let w = widget.borrow();
            match w.scene_retry() {
                Some((epoch, delay)) => (w.timer(), epoch, delay),
                None => return,
            }
        };
        timer.sleep(delay).await;
        if !widget.borrow_mut().retry_scene(epoch) {
            return;
        }
    }
}

/// Manual retry, then whatever async work it implies.
pub async fn retry(widget: SharedWidget) -> RetryAction {
    let action = widget.borrow_mut().retry();
    match action {
        RetryAction::Regenerate => load(widget).await,
        RetryAction::Scene => settle_scene(widget).await,
        RetryAction::Refused | RetryAction::Ignored => {}
    }
    action
}

/// Context restore, then any automatic scene retries it schedules.
pub async fn restore(widget: SharedWidget) -> bool {
    let restored = widget.borrow_mut().on_context_restored();
    if restored {
        settle_scene(widget).await;
    }
    restored
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use compute::worker::{ArcWorker, InlineWorker};
    use gpu::context::StaticProbe;
    use gpu::host::GRAPHICS_UNAVAILABLE;
    use layers::config::WidgetSettings;
    use runtime::frame::FrameQueue;
    use runtime::resilience::{Announcement, RetryAffordance};
    use runtime::timer::TokioTimer;

    use super::{
        GENERATING, GlobeWidget, MAX_RETRIES_REACHED, RetryAction, WidgetEnv, WidgetOptions,
        WidgetStatus,
    };
    use compute::generator::GenerationError;

    fn env() -> WidgetEnv {
        WidgetEnv {
            timer: Arc::new(TokioTimer),
            frames: Arc::new(FrameQueue::new()),
            workers: Box::new(|| Ok(Arc::new(InlineWorker::new(Some(2))) as Arc<dyn ArcWorker>)),
        }
    }

    fn options(count: usize) -> WidgetOptions {
        WidgetOptions {
            settings: WidgetSettings {
                arc_count: count,
                seed: Some(4),
                ..WidgetSettings::default()
            },
            ..WidgetOptions::default()
        }
    }

    #[test]
    fn missing_graphics_is_terminal() {
        let mut widget = GlobeWidget::mount(options(4), &StaticProbe(false), env());
        assert_eq!(
            widget.status(),
            WidgetStatus::Error {
                announcement: Announcement::assertive(GRAPHICS_UNAVAILABLE),
                retry: None,
            }
        );
        assert!(widget.begin_generation().is_none());
        assert_eq!(widget.retry(), RetryAction::Ignored);
    }

    #[test]
    fn generation_is_announced_and_not_duplicated() {
        let mut widget = GlobeWidget::mount(options(4), &StaticProbe(true), env());
        assert_eq!(widget.status(), WidgetStatus::Idle);
        let pending = widget.begin_generation();
        assert!(pending.is_some());
        assert!(widget.begin_generation().is_none());
        assert_eq!(
            widget.status(),
            WidgetStatus::Loading {
                announcement: Announcement::polite(GENERATING)
            }
        );
    }

    #[test]
    fn manual_retries_are_limited() {
        let mut widget = GlobeWidget::mount(options(4), &StaticProbe(true), env());
        for _ in 0..3 {
            let _ = widget.begin_generation();
            widget.finish_generation(Err(GenerationError::Worker("down".into())));
            assert_eq!(widget.retry(), RetryAction::Regenerate);
        }
        let _ = widget.begin_generation();
        widget.finish_generation(Err(GenerationError::Worker("down".into())));
        assert_eq!(widget.retry(), RetryAction::Refused);
        match widget.status() {
            WidgetStatus::Error { retry, .. } => {
                assert_eq!(retry, Some(RetryAffordance::disabled(MAX_RETRIES_REACHED)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_serializes_with_tag() {
        let widget = GlobeWidget::mount(options(4), &StaticProbe(true), env());
        let json = serde_json::to_value(widget.status()).unwrap();
        assert_eq!(json["status"], "idle");
    }
}
