//! CPU-side draw data for the browser backend.
//!
//! A [`RenderFrame`] says *what* to draw; the controller owns the geometry.
//! This module turns both into vertex, index and uniform data in the layout
//! the WGSL shaders expect. Matrices are column-major, `m[col][row]`, with a
//! right-handed `[0, 1]` depth range.

use bytemuck::{Pod, Zeroable};
use foundation::math::{GLOBE_RADIUS, LatLng, lat_lng_to_cartesian};
use gpu::camera::Camera3D;
use gpu::renderer::{RenderCommand, RenderFrame};
use layers::arcs::ArcInstance;
use layers::points::PointMarker;
use layers::symbology::parse_or_white;
use scene::MeshBuffer;
use scene::components::Shape3D;
use scene::prefabs::globe::{HEIGHT_SEGMENTS, WIDTH_SEGMENTS};

use crate::controller::SceneController;

pub const ARC_SEGMENTS: usize = 48;
pub const GRATICULE_STEP_DEG: f64 = 15.0;
pub const GRATICULE_LIFT: f64 = 1.002;
pub const GRATICULE_COLOR: [f32; 4] = [0.65, 0.85, 1.0, 0.35];
/// Untextured stand-in for the fallback globe's image.
pub const FALLBACK_SURFACE_COLOR: [f32; 4] = [0.32, 0.42, 0.52, 1.0];
pub const DEFAULT_SURFACE_COLOR: [f32; 4] = [0.10, 0.55, 0.85, 1.0];
/// Point crosses are this fraction of the marker radius across, each way.
pub const POINT_CROSS_SCALE: f64 = 0.5;

const GRID_COLUMNS: usize = WIDTH_SEGMENTS as usize + 1;
const GRID_ROWS: usize = HEIGHT_SEGMENTS as usize + 1;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Uniform block shared by every pipeline.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub light_dir: [f32; 4],
    pub surface_color: [f32; 4],
    pub emissive: [f32; 4],
    pub ambient: [f32; 4],
}

/// Buffers for one scene revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneGeometry {
    pub surface: Vec<SurfaceVertex>,
    pub indices: Vec<u16>,
    pub lines: Vec<LineVertex>,
}

pub fn mat4_mul(a: [[f32; 4]; 4], b: [[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut c = [[0.0f32; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            c[col][row] = a[0][row] * b[col][0]
                + a[1][row] * b[col][1]
                + a[2][row] * b[col][2]
                + a[3][row] * b[col][3];
        }
    }
    c
}

fn mat4_perspective_rh_z0(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> [[f32; 4]; 4] {
    let f = 1.0 / (0.5 * fov_y_rad).tan();
    let m00 = (f / aspect) as f32;
    let m11 = f as f32;
    let m22 = (far / (near - far)) as f32;
    let m23 = ((near * far) / (near - far)) as f32;

    [
        [m00, 0.0, 0.0, 0.0],
        [0.0, m11, 0.0, 0.0],
        [0.0, 0.0, m22, -1.0],
        [0.0, 0.0, m23, 0.0],
    ]
}

fn mat4_look_at_rh(eye: [f64; 3], target: [f64; 3], up: [f64; 3]) -> [[f32; 4]; 4] {
    let f = vec3_normalize(vec3_sub(target, eye));
    let s = vec3_normalize(vec3_cross(f, up));
    let u = vec3_cross(s, f);

    let ex = -vec3_dot(s, eye);
    let ey = -vec3_dot(u, eye);
    let ez = vec3_dot(f, eye);

    [
        [s[0] as f32, u[0] as f32, (-f[0]) as f32, 0.0],
        [s[1] as f32, u[1] as f32, (-f[1]) as f32, 0.0],
        [s[2] as f32, u[2] as f32, (-f[2]) as f32, 0.0],
        [ex as f32, ey as f32, ez as f32, 1.0],
    ]
}

/// Rotation about +Y; `(1, 0, 0)` turns towards `-Z` for positive angles.
pub fn mat4_rotation_y(radians: f64) -> [[f32; 4]; 4] {
    let (sin, cos) = (radians.sin() as f32, radians.cos() as f32);
    [
        [cos, 0.0, -sin, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [sin, 0.0, cos, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

fn vec3_sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn vec3_dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn vec3_cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn vec3_normalize(a: [f64; 3]) -> [f64; 3] {
    let n = vec3_dot(a, a).sqrt();
    if n > 0.0 && n.is_finite() {
        [a[0] / n, a[1] / n, a[2] / n]
    } else {
        [0.0, 0.0, 0.0]
    }
}

fn to_f32(v: [f64; 3]) -> [f32; 3] {
    [v[0] as f32, v[1] as f32, v[2] as f32]
}

/// Projection times view for the fixed globe camera.
pub fn view_projection(camera: &Camera3D) -> [[f32; 4]; 4] {
    let eye = camera.position.as_array();
    let target = camera.target.as_array();
    let view = mat4_look_at_rh(eye, target, [0.0, 1.0, 0.0]);
    let proj = mat4_perspective_rh_z0(
        camera.fov_y_deg.to_radians(),
        camera.aspect,
        camera.near,
        camera.far,
    );
    mat4_mul(proj, view)
}

/// Triangle list over the globe's UV grid. Vertices appended after the grid
/// (point markers) are not part of the surface. Returns nothing if the mesh
/// is shorter than the grid.
pub fn globe_surface(mesh: &MeshBuffer) -> (Vec<SurfaceVertex>, Vec<u16>) {
    let grid = GRID_COLUMNS * GRID_ROWS;
    if mesh.vertex_count() < grid || grid > usize::from(u16::MAX) + 1 {
        return (Vec::new(), Vec::new());
    }

    let vertices = (0..grid)
        .filter_map(|i| mesh.vertex(i))
        .map(|position| {
            let normal = vec3_normalize([
                position[0] as f64,
                position[1] as f64,
                position[2] as f64,
            ]);
            SurfaceVertex {
                position,
                normal: to_f32(normal),
            }
        })
        .collect();

    let mut indices = Vec::with_capacity((GRID_COLUMNS - 1) * (GRID_ROWS - 1) * 6);
    for row in 0..GRID_ROWS - 1 {
        for col in 0..GRID_COLUMNS - 1 {
            let a = (row * GRID_COLUMNS + col) as u16;
            let b = a + 1;
            let c = a + GRID_COLUMNS as u16;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    (vertices, indices)
}

fn push_polyline(out: &mut Vec<LineVertex>, path: &[[f32; 3]], color: [f32; 4]) {
    for pair in path.windows(2) {
        out.push(LineVertex {
            position: pair[0],
            color,
        });
        out.push(LineVertex {
            position: pair[1],
            color,
        });
    }
}

/// Great-circle arcs as line-list pairs in each arc's own color.
pub fn arc_lines(arcs: &[ArcInstance], radius: f64) -> Vec<LineVertex> {
    let mut out = Vec::with_capacity(arcs.len() * ARC_SEGMENTS * 2);
    for arc in arcs {
        let color = parse_or_white(&arc.color).to_rgba_f32();
        let path: Vec<[f32; 3]> = arc
            .path(radius, ARC_SEGMENTS)
            .into_iter()
            .map(|p| to_f32(p.as_array()))
            .collect();
        push_polyline(&mut out, &path, color);
    }
    out
}

/// Meridians and parallels every [`GRATICULE_STEP_DEG`], lifted just above
/// the surface.
pub fn graticule_lines(radius: f64) -> Vec<LineVertex> {
    let r = radius * GRATICULE_LIFT;
    let step = GRATICULE_STEP_DEG;
    let fine = 2.0;
    let mut out = Vec::new();

    let mut lng = -180.0;
    while lng < 180.0 {
        let path: Vec<[f32; 3]> = (0..=(180.0 / fine) as usize)
            .map(|i| {
                let lat = -90.0 + i as f64 * fine;
                to_f32(lat_lng_to_cartesian(LatLng::new(lat, lng), r).as_array())
            })
            .collect();
        push_polyline(&mut out, &path, GRATICULE_COLOR);
        lng += step;
    }

    let mut lat = -90.0 + step;
    while lat < 90.0 {
        let path: Vec<[f32; 3]> = (0..=(360.0 / fine) as usize)
            .map(|i| {
                let lng = -180.0 + i as f64 * fine;
                to_f32(lat_lng_to_cartesian(LatLng::new(lat, lng), r).as_array())
            })
            .collect();
        push_polyline(&mut out, &path, GRATICULE_COLOR);
        lat += step;
    }
    out
}

/// Each marker as a small cross in the tangent plane at its position.
pub fn point_crosses(points: &[PointMarker], radius: f64, marker_radius: f64) -> Vec<LineVertex> {
    let half = (marker_radius * POINT_CROSS_SCALE).max(0.0);
    let mut out = Vec::with_capacity(points.len() * 4);
    for point in points {
        let center =
            lat_lng_to_cartesian(point.position, radius * (1.0 + point.altitude)).as_array();
        let up = vec3_normalize(center);
        let mut east = vec3_normalize(vec3_cross([0.0, 1.0, 0.0], up));
        if east == [0.0; 3] {
            // Pole: any tangent will do.
            east = [1.0, 0.0, 0.0];
        }
        let north = vec3_cross(up, east);
        let color = parse_or_white(&point.color).to_rgba_f32();
        for axis in [east, north] {
            let offset = [axis[0] * half, axis[1] * half, axis[2] * half];
            out.push(LineVertex {
                position: to_f32(vec3_sub(center, offset)),
                color,
            });
            out.push(LineVertex {
                position: to_f32([
                    center[0] + offset[0],
                    center[1] + offset[1],
                    center[2] + offset[2],
                ]),
                color,
            });
        }
    }
    out
}

fn globe_radius(frame: &RenderFrame) -> Option<f64> {
    frame.commands.iter().find_map(|c| match c {
        RenderCommand::Draw3D {
            shape: Shape3D::Globe { radius } | Shape3D::Sphere { radius },
            ..
        } => Some(*radius),
        _ => None,
    })
}

/// Geometry for everything `frame` asks for, sourced from `controller`.
pub fn build_geometry(frame: &RenderFrame, controller: &SceneController) -> SceneGeometry {
    let mut geometry = SceneGeometry::default();
    let Some(radius) = globe_radius(frame) else {
        return geometry;
    };
    let radius = if radius.is_finite() && radius > 0.0 {
        radius
    } else {
        GLOBE_RADIUS
    };

    if let Some(mesh) = controller.mesh() {
        (geometry.surface, geometry.indices) = globe_surface(mesh);
    }
    for command in &frame.commands {
        match command {
            RenderCommand::Graticules => geometry.lines.extend(graticule_lines(radius)),
            RenderCommand::Arcs(_) => {
                geometry.lines.extend(arc_lines(controller.arcs().arcs(), radius));
            }
            RenderCommand::Points(batch) => {
                geometry.lines.extend(point_crosses(
                    controller.points().points(),
                    radius,
                    batch.radius,
                ));
            }
            _ => {}
        }
    }
    geometry
}

/// Per-frame uniforms: camera, globe rotation, material and lights.
pub fn frame_globals(frame: &RenderFrame) -> Globals {
    let rotation_y = frame
        .commands
        .iter()
        .find_map(|c| match c {
            RenderCommand::Draw3D { transform, .. } => Some(transform.rotation.y),
            _ => None,
        })
        .unwrap_or(0.0);

    let (surface_color, emissive) = frame
        .commands
        .iter()
        .find_map(|c| match c {
            RenderCommand::Material(material) => Some(material),
            _ => None,
        })
        .map_or((DEFAULT_SURFACE_COLOR, [0.0; 4]), |material| {
            let surface = if material.texture.is_some() {
                FALLBACK_SURFACE_COLOR
            } else {
                material.color.to_rgba_f32()
            };
            let [r, g, b, _] = material.emissive.to_rgba_f32();
            let k = material.emissive_intensity as f32;
            (surface, [r * k, g * k, b * k, 1.0])
        });

    let [ambient_light, ..] = frame.lights;
    let [r, g, b, _] = ambient_light.color.to_rgba_f32();
    let k = ambient_light.intensity as f32;

    let light_dir = frame
        .lights
        .iter()
        .find_map(|l| l.position)
        .map_or([0.0, 0.0, 1.0], |p| vec3_normalize(p.as_array()));

    Globals {
        view_proj: view_projection(&frame.camera),
        model: mat4_rotation_y(rotation_y),
        light_dir: [light_dir[0] as f32, light_dir[1] as f32, light_dir[2] as f32, 0.0],
        surface_color,
        emissive,
        ambient: [r * k, g * k, b * k, 1.0],
    }
}
