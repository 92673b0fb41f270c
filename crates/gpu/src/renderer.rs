use foundation::color::Color;
use scene::components::{Shape3D, Transform};
use scene::entity::EntityId;
use scene::world::World;

use crate::camera::Camera3D;
use crate::lighting::{Fog, Light};
use crate::material::GlobeMaterial;

#[derive(Debug, Clone, PartialEq)]
pub struct ArcBatch {
    pub count: usize,
    pub dash_length: f64,
    pub dash_gap: f64,
    pub dash_animate_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointBatch {
    pub count: usize,
    pub radius: f64,
    pub merged: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RingBatch {
    pub count: usize,
    pub max_radius: f64,
    pub propagation_speed: f64,
    pub repeat_period_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HexPolygonBatch {
    pub features: usize,
    pub resolution: u8,
    pub margin: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Draw3D {
        entity: EntityId,
        transform: Transform,
        shape: Shape3D,
    },
    Material(GlobeMaterial),
    Atmosphere {
        color: Color,
        altitude: f64,
    },
    Graticules,
    Arcs(ArcBatch),
    Points(PointBatch),
    Rings(RingBatch),
    HexPolygons(HexPolygonBatch),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub camera: Camera3D,
    pub lights: [Light; 4],
    pub fog: Fog,
    /// Transparent clear.
    pub clear_color: [f32; 4],
    pub pixel_ratio: f64,
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn new(camera: Camera3D, lights: [Light; 4], fog: Fog, pixel_ratio: f64) -> Self {
        Self {
            camera,
            lights,
            fog,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            pixel_ratio,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }

    pub fn count_where(&self, f: impl Fn(&RenderCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| f(c)).count()
    }
}

pub struct Renderer;

impl Renderer {
    /// Appends draw commands for every visible drawable under `root`.
    pub fn collect_3d(world: &World, root: EntityId, frame: &mut RenderFrame) {
        for (entity, transform, drawable) in world.drawables_3d_under(root) {
            frame.push(RenderCommand::Draw3D {
                entity,
                transform,
                shape: drawable.shape,
            });
        }
    }
}
