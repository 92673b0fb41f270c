use foundation::bounds::{Aabb3, BoundingSphere};
use foundation::math::Vec3;

/// Flat `xyz` vertex positions plus derived bounding volumes.
///
/// Bounds are computed in `f64` from the `f32` positions. Any mutation of the
/// positions clears them; call [`crate::sanitize::sanitize_mesh`] before
/// handing the buffer to a renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    positions: Vec<f32>,
    bounding_box: Option<Aabb3>,
    bounding_sphere: Option<BoundingSphere>,
}

impl MeshBuffer {
    pub fn new(positions: Vec<f32>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [f32] {
        self.clear_bounds();
        &mut self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Complete vertices; a partial trailing vertex is not counted.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn vertex(&self, i: usize) -> Option<[f32; 3]> {
        let base = i.checked_mul(3)?;
        let v = self.positions.get(base..base + 3)?;
        Some([v[0], v[1], v[2]])
    }

    pub fn push_vertex(&mut self, v: [f32; 3]) {
        self.clear_bounds();
        self.positions.extend_from_slice(&v);
    }

    pub fn extend_from(&mut self, positions: &[f32]) {
        self.clear_bounds();
        self.positions.extend_from_slice(positions);
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.clear_bounds();
    }

    pub fn clear_bounds(&mut self) {
        self.bounding_box = None;
        self.bounding_sphere = None;
    }

    pub fn bounding_box(&self) -> Option<Aabb3> {
        self.bounding_box
    }

    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.bounding_sphere
    }

    pub fn set_bounding_sphere(&mut self, sphere: BoundingSphere) {
        self.bounding_sphere = Some(sphere);
    }

    /// Box over every complete vertex. Non-finite components poison the
    /// result instead of being skipped.
    pub fn compute_bounding_box(&mut self) -> Option<Aabb3> {
        let mut bbox = Aabb3::empty();
        let mut finite = true;
        for v in self.positions.chunks_exact(3) {
            let p = [v[0] as f64, v[1] as f64, v[2] as f64];
            finite &= p.iter().all(|c| c.is_finite());
            bbox.expand(p);
        }
        if bbox.is_empty() {
            self.bounding_box = None;
            return None;
        }
        if !finite {
            bbox = Aabb3::new([f64::NAN; 3], [f64::NAN; 3]);
        }
        self.bounding_box = Some(bbox);
        self.bounding_box
    }

    /// Sphere centred on the box with the farthest vertex on its surface.
    /// The radius is NaN when any component is not finite.
    pub fn compute_bounding_sphere(&mut self) -> Option<BoundingSphere> {
        let bbox = match self.bounding_box {
            Some(bbox) => Some(bbox),
            None => self.compute_bounding_box(),
        };
        let Some(bbox) = bbox else {
            self.bounding_sphere = None;
            return None;
        };

        let center = bbox.center();
        let mut max_sq = 0.0f64;
        let mut finite = center.is_finite();
        for v in self.positions.chunks_exact(3) {
            let p = Vec3::new(v[0] as f64, v[1] as f64, v[2] as f64);
            let d = p - center;
            let d_sq = d.dot(d);
            if !d_sq.is_finite() {
                finite = false;
                continue;
            }
            max_sq = max_sq.max(d_sq);
        }

        let radius = if finite { max_sq.sqrt() } else { f64::NAN };
        let sphere = BoundingSphere::new(center, radius);
        self.bounding_sphere = Some(sphere);
        Some(sphere)
    }

    /// Every component finite, box present and sphere valid.
    pub fn is_render_ready(&self) -> bool {
        !self.positions.is_empty()
            && self.positions.len() % 3 == 0
            && self.positions.iter().all(|v| v.is_finite())
            && self.bounding_box.is_some()
            && self.bounding_sphere.is_some_and(|s| s.is_valid())
    }
}

#[cfg(test)]
mod tests {
    use super::MeshBuffer;
    use foundation::math::Vec3;

    #[test]
    fn bounds_of_symmetric_points() {
        let mut mesh = MeshBuffer::new(vec![-1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let bbox = mesh.compute_bounding_box().unwrap();
        assert_eq!(bbox.min, [-1.0, 0.0, 0.0]);
        let sphere = mesh.compute_bounding_sphere().unwrap();
        assert_eq!(sphere.center, Vec3::ZERO);
        assert_eq!(sphere.radius, 1.0);
        assert!(mesh.is_render_ready());
    }

    #[test]
    fn nan_poisons_sphere_radius() {
        let mut mesh = MeshBuffer::new(vec![0.0, 0.0, 0.0, f32::NAN, 1.0, 1.0]);
        let sphere = mesh.compute_bounding_sphere().unwrap();
        assert!(sphere.radius.is_nan());
        assert!(!mesh.is_render_ready());
    }

    #[test]
    fn mutation_clears_bounds() {
        let mut mesh = MeshBuffer::new(vec![1.0, 2.0, 3.0]);
        mesh.compute_bounding_sphere();
        assert!(mesh.bounding_box().is_some());
        mesh.push_vertex([4.0, 5.0, 6.0]);
        assert!(mesh.bounding_box().is_none());
        assert!(mesh.bounding_sphere().is_none());
        assert_eq!(mesh.vertex(1), Some([4.0, 5.0, 6.0]));
        assert_eq!(mesh.vertex(2), None);
    }

    #[test]
    fn empty_buffer_has_no_bounds() {
        let mut mesh = MeshBuffer::default();
        assert_eq!(mesh.compute_bounding_box(), None);
        assert_eq!(mesh.compute_bounding_sphere(), None);
    }
}
