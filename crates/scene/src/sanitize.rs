//! Mesh buffer repair.
//!
//! Invalid components (NaN, infinite, or beyond [`MAX_COMPONENT`]) are
//! replaced in place, in index order, with the mean of their valid structural
//! neighbours: the same axis of the previous and next vertex, and the other
//! two axes of the same vertex. Repaired values count as valid for the
//! components scanned after them.

use foundation::bounds::BoundingSphere;
use foundation::math::Vec3;

use crate::geometry::MeshBuffer;

/// Largest coordinate magnitude accepted as-is.
pub const MAX_COMPONENT: f32 = 1.0e6;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Repair {
    pub index: usize,
    pub original: f32,
    pub fixed: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SanitizeReport {
    pub repairs: Vec<Repair>,
    pub bounding_sphere: BoundingSphere,
    /// The computed sphere was unusable and an extent-based one was stored.
    pub used_fallback_sphere: bool,
}

impl SanitizeReport {
    pub fn repair_count(&self) -> usize {
        self.repairs.len()
    }

    pub fn is_clean(&self) -> bool {
        self.repairs.is_empty() && !self.used_fallback_sphere
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("geometry buffer is empty")]
    Empty,
    #[error("position buffer length {len} is not a multiple of 3")]
    Malformed { len: usize },
}

pub fn is_valid_component(v: f32) -> bool {
    v.is_finite() && v.abs() <= MAX_COMPONENT
}

/// Repairs `mesh` and recomputes its bounding volumes.
///
/// On success the buffer is render-ready: every component valid, a bounding
/// box present and a bounding sphere with a finite positive radius.
pub fn sanitize_mesh(mesh: &mut MeshBuffer) -> Result<SanitizeReport, GeometryError> {
    if mesh.is_empty() {
        return Err(GeometryError::Empty);
    }
    if mesh.len() % 3 != 0 {
        return Err(GeometryError::Malformed { len: mesh.len() });
    }

    let mut repairs = Vec::new();
    {
        let positions = mesh.positions_mut();
        for index in 0..positions.len() {
            let original = positions[index];
            if is_valid_component(original) {
                continue;
            }
            let fixed = neighbour_mean(positions, index);
            positions[index] = fixed;
            tracing::warn!(index, %original, %fixed, "repaired invalid mesh component");
            repairs.push(Repair {
                index,
                original,
                fixed,
            });
        }
    }

    if repairs.is_empty() {
        tracing::debug!(components = mesh.len(), "mesh scan clean");
    } else {
        tracing::warn!(repairs = repairs.len(), "mesh contained invalid components");
    }

    mesh.compute_bounding_box();
    let computed = mesh.compute_bounding_sphere();
    let (bounding_sphere, used_fallback_sphere) = match computed {
        Some(sphere) if sphere.is_valid() => (sphere, false),
        other => {
            let fallback = fallback_sphere(mesh.positions());
            tracing::warn!(
                computed_radius = other.map(|s| s.radius).unwrap_or(f64::NAN),
                fallback_radius = fallback.radius,
                "bounding sphere unusable, using extent fallback"
            );
            mesh.set_bounding_sphere(fallback);
            (fallback, true)
        }
    };

    Ok(SanitizeReport {
        repairs,
        bounding_sphere,
        used_fallback_sphere,
    })
}

fn neighbour_mean(positions: &[f32], index: usize) -> f32 {
    let vertex = index / 3;
    let axis = index % 3;
    let base = vertex * 3;

    let candidates = [
        index.checked_sub(3),
        Some(index + 3),
        Some(base + (axis + 1) % 3),
        Some(base + (axis + 2) % 3),
    ];

    let mut sum = 0.0f64;
    let mut count = 0u32;
    for i in candidates.into_iter().flatten() {
        let Some(&v) = positions.get(i) else { continue };
        if is_valid_component(v) {
            sum += v as f64;
            count += 1;
        }
    }

    if count == 0 {
        tracing::warn!(index, "no valid neighbours, using 0");
        return 0.0;
    }
    (sum / count as f64) as f32
}

/// Sphere from the min/max extents of the finite vertices, radius half the
/// largest extent. Falls back to a unit sphere at the origin when no vertex
/// is finite or the extent radius is not finite and positive.
pub fn fallback_sphere(positions: &[f32]) -> BoundingSphere {
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    let mut valid = 0usize;

    for v in positions.chunks_exact(3) {
        if !v.iter().all(|c| c.is_finite()) {
            continue;
        }
        for axis in 0..3 {
            let c = v[axis] as f64;
            min[axis] = min[axis].min(c);
            max[axis] = max[axis].max(c);
        }
        valid += 1;
    }

    if valid == 0 {
        return BoundingSphere::unit();
    }

    let center = Vec3::new(
        (min[0] + max[0]) / 2.0,
        (min[1] + max[1]) / 2.0,
        (min[2] + max[2]) / 2.0,
    );
    let radius = (0..3).map(|a| max[a] - min[a]).fold(0.0, f64::max) / 2.0;
    let sphere = BoundingSphere::new(center, radius);
    if sphere.is_valid() {
        sphere
    } else {
        BoundingSphere::unit()
    }
}

#[cfg(test)]
mod tests {
    use super::{GeometryError, MAX_COMPONENT, fallback_sphere, sanitize_mesh};
    use crate::geometry::MeshBuffer;
    use crate::prefabs::globe::uv_sphere;
    use foundation::bounds::BoundingSphere;
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;

    #[test]
    fn clean_buffer_has_no_repairs() {
        let mut mesh = uv_sphere(100.0, 8, 6);
        let report = sanitize_mesh(&mut mesh).unwrap();
        assert!(report.is_clean());
        assert!(mesh.is_render_ready());
        assert!((report.bounding_sphere.radius - 100.0).abs() < 1e-3);
    }

    #[test]
    fn repairs_with_neighbour_mean() {
        // vertex 1 x is NaN: neighbours are v0.x = 1, v2.x = 3, v1.y = 5, v1.z = 7
        let mut mesh = MeshBuffer::new(vec![
            1.0, 0.0, 0.0, //
            f32::NAN, 5.0, 7.0, //
            3.0, 0.0, 0.0,
        ]);
        let report = sanitize_mesh(&mut mesh).unwrap();
        assert_eq!(report.repair_count(), 1);
        let repair = report.repairs[0];
        assert_eq!(repair.index, 3);
        assert!(repair.original.is_nan());
        assert_eq!(repair.fixed, 4.0);
        assert_eq!(mesh.positions()[3], 4.0);
    }

    #[test]
    fn out_of_range_component_counts_as_invalid() {
        let mut mesh = MeshBuffer::new(vec![MAX_COMPONENT * 10.0, 2.0, 2.0]);
        let report = sanitize_mesh(&mut mesh).unwrap();
        assert_eq!(report.repair_count(), 1);
        assert_eq!(mesh.positions()[0], 2.0);
    }

    #[test]
    fn isolated_invalid_component_becomes_zero() {
        let mut mesh = MeshBuffer::new(vec![f32::INFINITY, f32::NAN, f32::NEG_INFINITY]);
        let report = sanitize_mesh(&mut mesh).unwrap();
        // index 0 has no valid neighbour; 1 and 2 then see the repaired 0.0
        assert_eq!(
            report.repairs.iter().map(|r| r.fixed).collect::<Vec<_>>(),
            vec![0.0, 0.0, 0.0]
        );
        assert!(report.used_fallback_sphere);
        assert_eq!(report.bounding_sphere, BoundingSphere::unit());
        assert!(mesh.is_render_ready());
    }

    #[test]
    fn k_invalid_components_yield_k_repairs() {
        let base = uv_sphere(100.0, 6, 4);
        let total = base.len();
        for k in [0, 1, 7, total / 2, total] {
            let mut mesh = base.clone();
            for (i, v) in mesh.positions_mut().iter_mut().enumerate().take(k) {
                *v = if i % 2 == 0 { f32::NAN } else { f32::INFINITY };
            }
            let report = sanitize_mesh(&mut mesh).unwrap();
            assert_eq!(report.repair_count(), k);
            assert!(report.bounding_sphere.is_valid());
            assert!(mesh.is_render_ready());
        }
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut mesh = MeshBuffer::new(vec![
            0.0,
            f32::NAN,
            1.0,
            2.0,
            2.0,
            f32::INFINITY,
            -4.0,
            1.0,
            0.5,
        ]);
        let first = sanitize_mesh(&mut mesh).unwrap();
        let second = sanitize_mesh(&mut mesh).unwrap();
        assert_eq!(first.repair_count(), 2);
        assert_eq!(second.repair_count(), 0);
        assert_eq!(first.bounding_sphere, second.bounding_sphere);
    }

    #[test]
    fn single_point_uses_unit_fallback() {
        let mut mesh = MeshBuffer::new(vec![5.0, 5.0, 5.0]);
        let report = sanitize_mesh(&mut mesh).unwrap();
        assert!(report.used_fallback_sphere);
        assert_eq!(report.bounding_sphere.radius, 1.0);
    }

    #[test]
    fn fallback_from_extents() {
        let sphere = fallback_sphere(&[0.0, 0.0, 0.0, 4.0, 2.0, 0.0, f32::NAN, 9.0, 9.0]);
        assert_eq!(sphere.center, Vec3::new(2.0, 1.0, 0.0));
        assert_eq!(sphere.radius, 2.0);
    }

    #[test]
    fn rejects_empty_and_partial_buffers() {
        assert_eq!(
            sanitize_mesh(&mut MeshBuffer::default()),
            Err(GeometryError::Empty)
        );
        assert_eq!(
            sanitize_mesh(&mut MeshBuffer::new(vec![1.0, 2.0])),
            Err(GeometryError::Malformed { len: 2 })
        );
    }
}
