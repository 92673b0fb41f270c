//! Globe scene controller.
//!
//! Owns the globe object, its mesh buffer, material and data layers, and moves
//! through an explicit lifecycle:
//!
//! ```text
//! Uninitialized -> Initializing -> Ready
//!                      |
//!                      v
//!                    Error -> Retrying -> Initializing ...
//!                      |
//!                      v
//!                   Fallback
//! ```
//!
//! The controller is synchronous. It reports the wait before the next
//! automatic attempt through [`ScenePhase::Retrying`]; the widget sleeps and
//! then calls [`SceneController::retry`].

use std::sync::Arc;
use std::time::Duration;

use gpu::material::{FALLBACK_GLOBE_TEXTURE, GlobeMaterial};
use gpu::renderer::{RenderCommand, RenderFrame};
use layers::arcs::ArcRecord;
use layers::config::GlobeConfig;
use layers::hex_polygons::BoundaryDataset;
use layers::layer::Layer;
use layers::{ArcLayer, HexPolygonLayer, PointLayer, RingLayer, RingState};
use rand::SeedableRng;
use rand::rngs::StdRng;
use runtime::frame::{FrameRequestId, FrameScheduler};
use runtime::retry::RetryPolicy;
use scene::entity::EntityId;
use scene::prefabs::globe::{globe_mesh, spawn_fallback_sphere, spawn_globe};
use scene::{GeometryError, MeshBuffer, SanitizeReport, World, sanitize_mesh};

pub const NO_DATA: &str = "No data available to render the globe.";

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ScenePhase {
    Uninitialized,
    Initializing,
    Ready,
    Error,
    Retrying { attempt: u32, delay: Duration },
    Fallback,
    Disposed,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("No data available to render the globe.")]
    NoData,
    #[error("globe geometry is unusable: {0}")]
    Geometry(#[from] GeometryError),
    #[error("scene root is not mounted")]
    RootMissing,
    #[error("failed to build globe: {0}")]
    Build(String),
    #[error("scene controller has been disposed")]
    Disposed,
}

/// Produces the globe's base mesh. Swapped out in tests to force failures.
pub trait GlobeBuilder {
    fn build_mesh(&mut self) -> Result<MeshBuffer, SceneError>;
}

/// UV sphere of globe radius.
#[derive(Debug, Default)]
pub struct SphereBuilder;

impl GlobeBuilder for SphereBuilder {
    fn build_mesh(&mut self) -> Result<MeshBuffer, SceneError> {
        Ok(globe_mesh())
    }
}

impl<F> GlobeBuilder for F
where
    F: FnMut() -> Result<MeshBuffer, SceneError>,
{
    fn build_mesh(&mut self) -> Result<MeshBuffer, SceneError> {
        self()
    }
}

pub struct SceneController {
    config: GlobeConfig,
    policy: RetryPolicy,
    builder: Box<dyn GlobeBuilder>,
    frames: Arc<dyn FrameScheduler>,
    phase: ScenePhase,
    globe: Option<EntityId>,
    mesh: Option<MeshBuffer>,
    material: Option<GlobeMaterial>,
    atmosphere: bool,
    graticules: bool,
    arcs: ArcLayer,
    points: PointLayer,
    rings: RingLayer,
    hex_polygons: HexPolygonLayer,
    ring_state: RingState,
    boundaries: Option<Arc<BoundaryDataset>>,
    rng: StdRng,
    records: Vec<ArcRecord>,
    failures: u32,
    error: Option<String>,
    pending_frame: Option<FrameRequestId>,
    last_report: Option<SanitizeReport>,
    revision: u64,
}

impl SceneController {
    /// `config` is validated here; `policy` bounds the automatic retries.
    pub fn new(
        config: GlobeConfig,
        policy: RetryPolicy,
        frames: Arc<dyn FrameScheduler>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config: config.validated(),
            policy,
            builder: Box::new(SphereBuilder),
            frames,
            phase: ScenePhase::Uninitialized,
            globe: None,
            mesh: None,
            material: None,
            atmosphere: false,
            graticules: false,
            arcs: ArcLayer::new(1),
            points: PointLayer::new(2),
            rings: RingLayer::new(3),
            hex_polygons: HexPolygonLayer::new(4),
            ring_state: RingState::new(),
            boundaries: None,
            rng,
            records: Vec::new(),
            failures: 0,
            error: None,
            pending_frame: None,
            last_report: None,
            revision: 0,
        }
    }

    pub fn with_builder(mut self, builder: impl GlobeBuilder + 'static) -> Self {
        self.set_builder(builder);
        self
    }

    pub fn set_builder(&mut self, builder: impl GlobeBuilder + 'static) {
        self.builder = Box::new(builder);
    }

    pub fn with_boundaries(mut self, boundaries: Arc<BoundaryDataset>) -> Self {
        self.boundaries = Some(boundaries);
        self
    }

    pub fn phase(&self) -> ScenePhase {
        self.phase
    }

    pub fn config(&self) -> &GlobeConfig {
        &self.config
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn globe(&self) -> Option<EntityId> {
        self.globe
    }

    pub fn mesh(&self) -> Option<&MeshBuffer> {
        self.mesh.as_ref()
    }

    pub fn material(&self) -> Option<&GlobeMaterial> {
        self.material.as_ref()
    }

    pub fn records(&self) -> &[ArcRecord] {
        &self.records
    }

    pub fn arcs(&self) -> &ArcLayer {
        &self.arcs
    }

    pub fn points(&self) -> &PointLayer {
        &self.points
    }

    pub fn rings(&self) -> &RingLayer {
        &self.rings
    }

    pub fn ring_state(&self) -> &RingState {
        &self.ring_state
    }

    pub fn hex_polygons(&self) -> &HexPolygonLayer {
        &self.hex_polygons
    }

    /// Failed initializations since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn last_report(&self) -> Option<&SanitizeReport> {
        self.last_report.as_ref()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    /// Bumped every time the globe geometry or its layers are rebuilt.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Builds the data globe under `root` from `records`.
    ///
    /// An empty record set is a terminal input error: the phase becomes
    /// [`ScenePhase::Error`] and no retry is scheduled. Other failures tear
    /// the partial object down and either schedule a retry or switch to the
    /// fallback globe.
    pub fn initialize(
        &mut self,
        world: &mut World,
        root: EntityId,
        records: &[ArcRecord],
    ) -> Result<(), SceneError> {
        if self.phase == ScenePhase::Disposed {
            return Err(SceneError::Disposed);
        }
        self.records = records.to_vec();
        self.failures = 0;
        self.attempt(world, root)
    }

    /// Runs the automatic attempt scheduled by [`ScenePhase::Retrying`].
    pub fn retry(&mut self, world: &mut World, root: EntityId) -> Result<(), SceneError> {
        match self.phase {
            ScenePhase::Retrying { attempt, .. } => {
                tracing::info!(attempt, "retrying globe initialization");
                self.attempt(world, root)
            }
            ScenePhase::Disposed => Err(SceneError::Disposed),
            _ => Ok(()),
        }
    }

    /// User-triggered retry with the kept records; clears the automatic
    /// retry budget first.
    pub fn manual_retry(&mut self, world: &mut World, root: EntityId) -> Result<(), SceneError> {
        if self.phase == ScenePhase::Disposed {
            return Err(SceneError::Disposed);
        }
        tracing::info!(phase = ?self.phase, "manual globe retry");
        self.failures = 0;
        self.error = None;
        self.attempt(world, root)
    }

    fn attempt(&mut self, world: &mut World, root: EntityId) -> Result<(), SceneError> {
        if self.records.is_empty() {
            tracing::error!("no arc records to render");
            self.teardown(world);
            self.error = Some(NO_DATA.to_string());
            self.phase = ScenePhase::Error;
            return Err(SceneError::NoData);
        }

        if self.phase == ScenePhase::Fallback {
            self.teardown(world);
        }
        self.phase = ScenePhase::Initializing;
        match self.build(world, root) {
            Ok(()) => {
                self.phase = ScenePhase::Ready;
                self.error = None;
                self.failures = 0;
                self.revision += 1;
                tracing::info!(arcs = self.arcs.len(), points = self.points.len(), "globe ready");
                self.request_frame();
                Ok(())
            }
            Err(err) => {
                self.teardown(world);
                self.error = Some(err.to_string());
                self.phase = ScenePhase::Error;
                self.failures += 1;
                match self.policy.delay_after_failures(self.failures) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt = self.failures,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "globe initialization failed, retrying"
                        );
                        self.phase = ScenePhase::Retrying {
                            attempt: self.failures,
                            delay,
                        };
                    }
                    None => {
                        tracing::error!(attempts = self.failures, error = %err, "globe initialization exhausted");
                        self.enter_fallback(world, root);
                    }
                }
                Err(err)
            }
        }
    }

    fn build(&mut self, world: &mut World, root: EntityId) -> Result<(), SceneError> {
        if !world.is_alive(root) {
            return Err(SceneError::RootMissing);
        }
        let globe = match self.globe {
            Some(globe) if world.is_alive(globe) => globe,
            _ => spawn_globe(world),
        };
        self.globe = Some(globe);

        let config = &self.config;
        let material = GlobeMaterial::phong(
            config.globe_color(),
            config.emissive_color(),
            config.emissive_intensity,
            config.shininess,
        );

        self.arcs.configure(&self.records, config, &mut self.rng);
        self.points.configure(&self.records, config);
        self.ring_state.reselect(self.records.len(), &mut self.rng);
        self.rings.configure(&self.records, &self.ring_state, config);
        if let Some(boundaries) = &self.boundaries {
            self.hex_polygons.configure(boundaries.clone(), config);
        }

        let mut mesh = self.builder.build_mesh()?;
        mesh.extend_from(&self.points.vertices());
        let report = sanitize_mesh(&mut mesh)?;
        if !mesh.is_render_ready() {
            return Err(SceneError::Build("mesh failed the render-ready check".into()));
        }

        if !world.attach(globe, root) {
            return Err(SceneError::RootMissing);
        }
        self.atmosphere = self.config.show_atmosphere;
        self.graticules = false;
        self.mesh = Some(mesh);
        self.material = Some(material);
        self.last_report = Some(report);
        Ok(())
    }

    fn enter_fallback(&mut self, world: &mut World, root: EntityId) {
        self.teardown(world);
        if !world.is_alive(root) {
            return;
        }
        let sphere = spawn_fallback_sphere(world);
        let mut mesh = globe_mesh();
        let report = match sanitize_mesh(&mut mesh) {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(%err, "fallback globe mesh unusable");
                world.despawn(sphere);
                return;
            }
        };
        world.attach(sphere, root);
        self.globe = Some(sphere);
        self.mesh = Some(mesh);
        self.material = Some(GlobeMaterial::textured(FALLBACK_GLOBE_TEXTURE));
        self.last_report = Some(report);
        self.atmosphere = false;
        self.graticules = true;
        self.phase = ScenePhase::Fallback;
        self.revision += 1;
        tracing::warn!("showing fallback globe");
        self.request_frame();
    }

    /// Detaches and despawns the owned object and clears every data layer.
    fn teardown(&mut self, world: &mut World) {
        if let Some(globe) = self.globe.take() {
            world.detach(globe);
            world.despawn(globe);
        }
        self.mesh = None;
        if let Some(mut material) = self.material.take() {
            material.dispose();
        }
        self.arcs.clear();
        self.points.clear();
        self.rings.clear();
        self.hex_polygons.clear();
        self.ring_state.clear();
        self.atmosphere = false;
        self.graticules = false;
    }

    /// Asks for one frame; the frame re-requests itself only while
    /// auto-rotating.
    fn request_frame(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.frames.request_frame());
        }
    }

    fn cancel_frame(&mut self) {
        if let Some(id) = self.pending_frame.take() {
            self.frames.cancel_frame(id);
        }
    }

    /// One auto-rotate step. Returns `true` if the globe turned.
    pub fn on_animation_frame(&mut self, world: &mut World) -> bool {
        self.pending_frame = None;
        if !matches!(self.phase, ScenePhase::Ready | ScenePhase::Fallback)
            || !self.config.auto_rotate
        {
            return false;
        }
        let speed = self.config.auto_rotate_speed;
        let turned = match self.globe.and_then(|g| world.transform_mut(g)) {
            Some(transform) => {
                transform.rotate_y(speed);
                true
            }
            None => false,
        };
        if turned {
            self.request_frame();
        }
        turned
    }

    /// Appends material, atmosphere and layer batches to `frame`.
    pub fn encode(&self, frame: &mut RenderFrame) {
        if !matches!(self.phase, ScenePhase::Ready | ScenePhase::Fallback) {
            return;
        }
        if let Some(material) = self.material.as_ref().filter(|m| !m.is_disposed()) {
            frame.push(RenderCommand::Material(material.clone()));
        }
        if self.atmosphere {
            frame.push(RenderCommand::Atmosphere {
                color: layers::symbology::parse_or_white(&self.config.atmosphere_color),
                altitude: self.config.atmosphere_altitude,
            });
        }
        if self.graticules {
            frame.push(RenderCommand::Graticules);
        }
        self.hex_polygons.encode(frame);
        self.arcs.encode(frame);
        self.points.encode(frame);
        self.rings.encode(frame);
    }

    /// Drops GPU-backed state after a context loss. Records are kept so the
    /// restore path can rebuild without regenerating.
    pub fn release_for_context_loss(&mut self, world: &mut World) {
        if self.phase == ScenePhase::Disposed {
            return;
        }
        if let Some(material) = self.material.as_mut() {
            material.dispose();
        }
        self.cancel_frame();
        self.teardown(world);
        self.phase = ScenePhase::Uninitialized;
        tracing::info!("globe released for context loss");
    }

    /// Marks the current attempt failed with `message` after something
    /// outside the controller's own error handling went wrong.
    pub fn abort(&mut self, world: &mut World, message: &str) {
        if self.phase == ScenePhase::Disposed {
            return;
        }
        self.cancel_frame();
        self.teardown(world);
        self.error = Some(message.to_string());
        self.phase = ScenePhase::Error;
    }

    /// Idempotent.
    pub fn dispose(&mut self, world: &mut World) {
        if self.phase == ScenePhase::Disposed {
            return;
        }
        self.cancel_frame();
        self.teardown(world);
        self.records.clear();
        self.phase = ScenePhase::Disposed;
        tracing::info!("globe disposed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use gpu::renderer::{RenderCommand, RenderFrame};
    use layers::arcs::ArcRecord;
    use layers::config::GlobeConfig;
    use layers::layer::Layer;
    use pretty_assertions::assert_eq;
    use runtime::frame::FrameQueue;
    use runtime::retry::RetryPolicy;
    use scene::entity::EntityId;
    use scene::{MeshBuffer, World};

    use super::{NO_DATA, SceneController, SceneError, ScenePhase};

    fn records(n: usize) -> Vec<ArcRecord> {
        (0..n)
            .map(|i| ArcRecord {
                order: i as u32 + 1,
                start_lat: -40.0 + i as f64,
                start_lng: 10.0,
                end_lat: 30.0,
                end_lng: -60.0 + i as f64,
                arc_alt: 0.3,
                color: "#06b6d4".into(),
            })
            .collect()
    }

    fn setup(config: GlobeConfig) -> (World, EntityId, FrameQueue, SceneController) {
        let mut world = World::new();
        let root = world.spawn();
        let frames = FrameQueue::new();
        let controller = SceneController::new(
            config,
            RetryPolicy::with_retries(3, Duration::from_millis(1000)),
            Arc::new(frames.clone()),
            Some(11),
        );
        (world, root, frames, controller)
    }

    fn rotating() -> GlobeConfig {
        GlobeConfig {
            auto_rotate: true,
            auto_rotate_speed: 0.5,
            ..GlobeConfig::default()
        }
    }

    fn failing() -> Result<MeshBuffer, SceneError> {
        Err(SceneError::Build("boom".into()))
    }

    #[test]
    fn initializes_layers_and_attaches_globe() {
        let (mut world, root, frames, mut controller) = setup(rotating());
        controller.initialize(&mut world, root, &records(40)).unwrap();

        assert_eq!(controller.phase(), ScenePhase::Ready);
        assert_eq!(controller.arcs().len(), 40);
        assert_eq!(controller.points().len(), 40);
        assert_eq!(controller.rings().len(), 32);
        let globe = controller.globe().unwrap();
        assert_eq!(world.parent(globe), Some(root));
        let mesh = controller.mesh().unwrap();
        assert!(mesh.is_render_ready());
        assert!(mesh.bounding_sphere().is_some_and(|s| s.is_valid()));
        assert_eq!(frames.pending(), 1);
    }

    #[test]
    fn empty_records_fail_without_retry() {
        let (mut world, root, frames, mut controller) = setup(rotating());
        let err = controller.initialize(&mut world, root, &[]).unwrap_err();
        assert_eq!(err, SceneError::NoData);
        assert_eq!(controller.phase(), ScenePhase::Error);
        assert_eq!(controller.error(), Some(NO_DATA));
        assert!(NO_DATA.to_lowercase().contains("no data"));
        assert_eq!(controller.failures(), 0);
        assert_eq!(frames.pending(), 0);
    }

    #[test]
    fn failures_back_off_then_fall_back() {
        let (mut world, root, _, controller) = setup(GlobeConfig::default());
        let mut controller = controller.with_builder(failing);

        assert!(controller.initialize(&mut world, root, &records(3)).is_err());
        assert_eq!(
            controller.phase(),
            ScenePhase::Retrying {
                attempt: 1,
                delay: Duration::from_millis(2000)
            }
        );
        assert!(controller.globe().is_none());
        assert_eq!(world.entity_count(), 1);

        let _ = controller.retry(&mut world, root);
        assert_eq!(
            controller.phase(),
            ScenePhase::Retrying {
                attempt: 2,
                delay: Duration::from_millis(4000)
            }
        );
        let _ = controller.retry(&mut world, root);
        assert_eq!(
            controller.phase(),
            ScenePhase::Retrying {
                attempt: 3,
                delay: Duration::from_millis(8000)
            }
        );
        let _ = controller.retry(&mut world, root);
        assert_eq!(controller.phase(), ScenePhase::Fallback);
        assert_eq!(controller.error(), Some("failed to build globe: boom"));

        let fallback = controller.globe().unwrap();
        assert_eq!(world.parent(fallback), Some(root));
        assert_eq!(controller.arcs().len(), 0);
        assert!(controller.material().unwrap().texture.is_some());

        let mut frame = RenderFrame::new(
            gpu::camera::Camera3D::globe(),
            gpu::lighting::LightRig::new(Default::default()).lights(),
            Default::default(),
            1.0,
        );
        controller.encode(&mut frame);
        assert_eq!(frame.count_where(|c| matches!(c, RenderCommand::Graticules)), 1);
        assert_eq!(frame.count_where(|c| matches!(c, RenderCommand::Atmosphere { .. })), 0);
        assert_eq!(frame.count_where(|c| matches!(c, RenderCommand::Arcs(_))), 0);
    }

    #[test]
    fn recovers_after_transient_failure() {
        let (mut world, root, _, controller) = setup(GlobeConfig::default());
        let mut calls = 0;
        let mut controller = controller.with_builder(move || {
            calls += 1;
            if calls == 1 {
                failing()
            } else {
                Ok(scene::prefabs::globe::globe_mesh())
            }
        });
        assert!(controller.initialize(&mut world, root, &records(5)).is_err());
        controller.retry(&mut world, root).unwrap();
        assert_eq!(controller.phase(), ScenePhase::Ready);
        assert_eq!(controller.failures(), 0);
        assert_eq!(controller.error(), None);
    }

    #[test]
    fn invalid_mesh_values_are_repaired_before_hand_off() {
        let (mut world, root, _, controller) = setup(GlobeConfig::default());
        let mut controller = controller.with_builder(|| {
            let mut mesh = scene::prefabs::globe::globe_mesh();
            mesh.positions_mut()[4] = f32::NAN;
            mesh.positions_mut()[10] = f32::INFINITY;
            Ok(mesh)
        });
        controller.initialize(&mut world, root, &records(2)).unwrap();
        assert_eq!(controller.last_report().unwrap().repair_count(), 2);
        assert!(controller.mesh().unwrap().is_render_ready());
    }

    #[test]
    fn manual_retry_resets_exhausted_budget() {
        let (mut world, root, _, controller) = setup(GlobeConfig::default());
        let mut calls = 0;
        let mut controller = controller.with_builder(move || {
            calls += 1;
            if calls <= 4 {
                failing()
            } else {
                Ok(scene::prefabs::globe::globe_mesh())
            }
        });
        let _ = controller.initialize(&mut world, root, &records(2));
        for _ in 0..3 {
            let _ = controller.retry(&mut world, root);
        }
        assert_eq!(controller.phase(), ScenePhase::Fallback);

        controller.manual_retry(&mut world, root).unwrap();
        assert_eq!(controller.phase(), ScenePhase::Ready);
        assert_eq!(controller.arcs().len(), 2);
        assert_eq!(world.children(root).len(), 1);
    }

    #[test]
    fn rotation_advances_per_frame_and_rerequests() {
        let (mut world, root, frames, mut controller) = setup(rotating());
        controller.initialize(&mut world, root, &records(2)).unwrap();
        let globe = controller.globe().unwrap();

        for _ in 0..3 {
            assert_eq!(frames.take_due().len(), 1);
            assert!(controller.on_animation_frame(&mut world));
        }
        assert_eq!(world.transform(globe).unwrap().rotation.y, 1.5);
        assert_eq!(frames.pending(), 1);
    }

    #[test]
    fn static_globe_gets_a_single_frame() {
        let (mut world, root, frames, mut controller) = setup(GlobeConfig::default());
        controller.initialize(&mut world, root, &records(2)).unwrap();
        assert_eq!(frames.take_due().len(), 1);

        assert!(!controller.on_animation_frame(&mut world));
        let globe = controller.globe().unwrap();
        assert_eq!(world.transform(globe).unwrap().rotation.y, 0.0);
        assert_eq!(frames.pending(), 0);
    }

    #[test]
    fn fallback_globe_requests_a_frame_without_auto_rotate() {
        let (mut world, root, frames, controller) = setup(GlobeConfig::default());
        let mut controller = controller.with_builder(failing);
        let _ = controller.initialize(&mut world, root, &records(1));
        for _ in 0..3 {
            let _ = controller.retry(&mut world, root);
        }
        assert_eq!(controller.phase(), ScenePhase::Fallback);
        assert_eq!(frames.pending(), 1);
        assert!(controller.has_pending_frame());
    }

    #[test]
    fn dispose_is_idempotent_and_cancels_frame() {
        let (mut world, root, frames, mut controller) = setup(rotating());
        controller.initialize(&mut world, root, &records(4)).unwrap();
        controller.dispose(&mut world);
        controller.dispose(&mut world);

        assert_eq!(controller.phase(), ScenePhase::Disposed);
        assert_eq!(frames.pending(), 0);
        assert!(controller.globe().is_none());
        assert!(controller.arcs().is_empty());
        assert!(controller.ring_state().selected().is_empty());
        assert!(world.children(root).is_empty());
        assert!(!controller.on_animation_frame(&mut world));
        assert_eq!(
            controller.initialize(&mut world, root, &records(1)),
            Err(SceneError::Disposed)
        );
    }

    #[test]
    fn context_loss_keeps_records_for_restore() {
        let (mut world, root, frames, mut controller) = setup(rotating());
        controller.initialize(&mut world, root, &records(6)).unwrap();
        controller.release_for_context_loss(&mut world);

        assert_eq!(controller.phase(), ScenePhase::Uninitialized);
        assert!(controller.globe().is_none());
        assert!(controller.material().is_none());
        assert_eq!(controller.records().len(), 6);
        assert_eq!(frames.pending(), 0);

        let kept = controller.records().to_vec();
        controller.initialize(&mut world, root, &kept).unwrap();
        assert_eq!(controller.phase(), ScenePhase::Ready);
        assert_eq!(controller.points().len(), 6);
    }

    #[test]
    fn ring_selection_is_per_instance() {
        let (mut world, root, _, mut a) = setup(GlobeConfig::default());
        let (mut other_world, other_root, _, mut b) = setup(GlobeConfig::default());
        a.initialize(&mut world, root, &records(10)).unwrap();
        assert!(b.ring_state().selected().is_empty());
        b.initialize(&mut other_world, other_root, &records(5)).unwrap();
        assert_eq!(a.ring_state().selected().len(), 8);
        assert_eq!(b.ring_state().selected().len(), 4);
    }
}
