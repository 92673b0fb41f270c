//! Render host: owns the viewport state around the globe.
//!
//! The host never builds the globe itself. The scene controller attaches its
//! object under [`RenderHost::root`]; the host only decides whether and how a
//! frame is produced.

use foundation::math::LatLng;
use runtime::resilience::Announcement;
use scene::components::Transform;
use scene::entity::EntityId;
use scene::world::World;

use crate::camera::Camera3D;
use crate::context::{ContextState, GraphicsProbe};
use crate::controls::OrbitControls;
use crate::lighting::{Fog, LightColors, LightRig};
use crate::renderer::{RenderFrame, Renderer};

pub const GRAPHICS_UNAVAILABLE: &str =
    "WebGL is not available in your browser. Please try a different browser or device.";
pub const CONTEXT_LOST: &str = "WebGL context lost. Attempting to restore... Please wait.";
pub const SCENE_LABEL: &str = "Interactive 3D Globe";
pub const SCENE_ROLE_DESCRIPTION: &str =
    "Interactive 3D visualization of Earth with data points and arcs";

const MAX_PIXEL_RATIO: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("WebGL is not available in your browser. Please try a different browser or device.")]
    GraphicsUnavailable,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HostConfig {
    pub light_colors: LightColors,
    pub initial_position: LatLng,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f64,
    pub device_pixel_ratio: f64,
    pub viewport: Option<(f64, f64)>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            light_colors: LightColors::default(),
            initial_position: LatLng::new(0.0, 0.0),
            auto_rotate: false,
            auto_rotate_speed: 1.0,
            device_pixel_ratio: 1.0,
            viewport: None,
        }
    }
}

/// What the platform should do with a context-lost event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLoss {
    /// Suppress the platform default so the context can be restored.
    pub prevent_default: bool,
    pub announcement: Announcement,
}

#[derive(Debug)]
pub struct RenderHost {
    root: Option<EntityId>,
    camera: Camera3D,
    lights: LightRig,
    controls: OrbitControls,
    fog: Fog,
    pixel_ratio: f64,
    context: ContextState,
}

impl RenderHost {
    /// Probes graphics support, then creates the scene root.
    ///
    /// A failed probe is terminal: no retry is offered because the
    /// environment, not the data, is at fault.
    pub fn mount(
        world: &mut World,
        probe: &dyn GraphicsProbe,
        config: HostConfig,
    ) -> Result<Self, HostError> {
        if !probe.probe() {
            tracing::error!("graphics context unavailable");
            return Err(HostError::GraphicsUnavailable);
        }

        let root = world.spawn();
        world.set_transform(root, Transform::identity());

        let mut camera = Camera3D::globe();
        camera.place_over(config.initial_position);
        if let Some((w, h)) = config.viewport {
            camera.resize(w, h);
        }

        let pixel_ratio = if config.device_pixel_ratio.is_finite() && config.device_pixel_ratio > 0.0
        {
            config.device_pixel_ratio.min(MAX_PIXEL_RATIO)
        } else {
            1.0
        };

        tracing::info!(?root, pixel_ratio, "render host mounted");
        Ok(Self {
            root: Some(root),
            camera,
            lights: LightRig::new(config.light_colors),
            controls: OrbitControls::new(config.auto_rotate, config.auto_rotate_speed),
            fog: Fog::default(),
            pixel_ratio,
            context: ContextState::Active,
        })
    }

    pub fn root(&self) -> Option<EntityId> {
        self.root
    }

    pub fn is_mounted(&self) -> bool {
        self.root.is_some()
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn lights(&self) -> &LightRig {
        &self.lights
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn context(&self) -> ContextState {
        self.context
    }

    pub fn is_context_lost(&self) -> bool {
        self.context == ContextState::Lost
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.camera.resize(width, height);
    }

    pub fn on_context_lost(&mut self) -> ContextLoss {
        if self.context != ContextState::Lost {
            tracing::warn!("graphics context lost");
        }
        self.context = ContextState::Lost;
        ContextLoss {
            prevent_default: true,
            announcement: Announcement::assertive(CONTEXT_LOST),
        }
    }

    /// Returns `true` when the host was waiting for the restore.
    pub fn on_context_restored(&mut self) -> bool {
        let was_lost = self.context == ContextState::Lost;
        self.context = ContextState::Active;
        if was_lost {
            tracing::info!("graphics context restored");
        }
        was_lost
    }

    /// Despawns the scene root and everything still attached to it.
    pub fn unmount(&mut self, world: &mut World) {
        if let Some(root) = self.root.take() {
            world.despawn(root);
            tracing::info!("render host unmounted");
        }
    }

    /// Camera, lights and the drawables under the root; `None` while the
    /// context is lost or after unmount.
    pub fn collect(&self, world: &World) -> Option<RenderFrame> {
        let root = self.root?;
        if self.is_context_lost() {
            return None;
        }
        let mut frame = RenderFrame::new(self.camera, self.lights.lights(), self.fog, self.pixel_ratio);
        Renderer::collect_3d(world, root, &mut frame);
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::{CONTEXT_LOST, HostConfig, HostError, RenderHost};
    use crate::context::StaticProbe;
    use scene::components::{Drawable3D, Transform};
    use scene::world::World;

    #[test]
    fn unavailable_graphics_is_terminal() {
        let mut world = World::new();
        let err = RenderHost::mount(&mut world, &StaticProbe(false), HostConfig::default())
            .unwrap_err();
        assert_eq!(err, HostError::GraphicsUnavailable);
        assert!(err.to_string().contains("WebGL is not available"));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn pixel_ratio_is_capped() {
        let mut world = World::new();
        let config = HostConfig {
            device_pixel_ratio: 3.0,
            ..HostConfig::default()
        };
        let host = RenderHost::mount(&mut world, &StaticProbe(true), config).unwrap();
        assert_eq!(host.pixel_ratio(), 2.0);
    }

    #[test]
    fn context_loss_suppresses_frames_until_restore() {
        let mut world = World::new();
        let mut host =
            RenderHost::mount(&mut world, &StaticProbe(true), HostConfig::default()).unwrap();
        let root = host.root().unwrap();
        let globe = world.spawn();
        world.set_transform(globe, Transform::identity());
        world.set_drawable_3d(globe, Drawable3D::globe(100.0));
        world.attach(globe, root);

        assert_eq!(host.collect(&world).unwrap().commands.len(), 1);

        let loss = host.on_context_lost();
        assert!(loss.prevent_default);
        assert_eq!(loss.announcement.text, CONTEXT_LOST);
        assert!(host.collect(&world).is_none());

        assert!(host.on_context_restored());
        assert!(!host.on_context_restored());
        assert!(host.collect(&world).is_some());
    }

    #[test]
    fn unmount_despawns_root() {
        let mut world = World::new();
        let mut host =
            RenderHost::mount(&mut world, &StaticProbe(true), HostConfig::default()).unwrap();
        host.unmount(&mut world);
        host.unmount(&mut world);
        assert!(!host.is_mounted());
        assert!(host.collect(&world).is_none());
        assert_eq!(world.entity_count(), 0);
    }
}
