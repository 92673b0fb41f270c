use std::f64::consts::PI;

use foundation::math::GLOBE_RADIUS;

use crate::World;
use crate::components::{Drawable3D, Transform};
use crate::entity::EntityId;
use crate::geometry::MeshBuffer;

pub const WIDTH_SEGMENTS: u32 = 64;
pub const HEIGHT_SEGMENTS: u32 = 32;

/// Globe entity with an identity transform. Not attached to any parent.
pub fn spawn_globe(world: &mut World) -> EntityId {
    let entity = world.spawn();
    world.set_transform(entity, Transform::identity());
    world.set_drawable_3d(entity, Drawable3D::globe(GLOBE_RADIUS));
    entity
}

/// Data-free textured sphere shown when the data globe cannot be built.
pub fn spawn_fallback_sphere(world: &mut World) -> EntityId {
    let entity = world.spawn();
    world.set_transform(entity, Transform::identity());
    world.set_drawable_3d(entity, Drawable3D::sphere(GLOBE_RADIUS));
    entity
}

/// UV sphere vertex grid: `(height + 1) × (width + 1)` vertices, rows from
/// the north pole down, seam duplicated.
pub fn uv_sphere(radius: f64, width_segments: u32, height_segments: u32) -> MeshBuffer {
    let width = width_segments.max(3);
    let height = height_segments.max(2);
    let mut positions = Vec::with_capacity(((width + 1) * (height + 1) * 3) as usize);

    for iy in 0..=height {
        let v = iy as f64 / height as f64;
        for ix in 0..=width {
            let u = ix as f64 / width as f64;
            let x = -radius * (u * 2.0 * PI).cos() * (v * PI).sin();
            let y = radius * (v * PI).cos();
            let z = radius * (u * 2.0 * PI).sin() * (v * PI).sin();
            positions.extend_from_slice(&[x as f32, y as f32, z as f32]);
        }
    }

    MeshBuffer::new(positions)
}

pub fn globe_mesh() -> MeshBuffer {
    uv_sphere(GLOBE_RADIUS, WIDTH_SEGMENTS, HEIGHT_SEGMENTS)
}
