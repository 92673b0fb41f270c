use crate::math::Vec3;

/// Axis-aligned bounding box
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    /// Empty box: expanding it by any point yields that point.
    pub fn empty() -> Self {
        Aabb3 {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn expand(&mut self, p: [f64; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.min[axis] > self.max[axis])
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        )
    }

    /// Largest edge length.
    pub fn max_extent(&self) -> f64 {
        (0..3)
            .map(|axis| self.max[axis] - self.min[axis])
            .fold(0.0, f64::max)
    }

    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn unit() -> Self {
        Self::new(Vec3::ZERO, 1.0)
    }

    /// Usable for culling: finite center and a finite, strictly positive radius.
    pub fn is_valid(&self) -> bool {
        self.center.is_finite() && self.radius.is_finite() && self.radius > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{Aabb3, BoundingSphere};
    use crate::math::Vec3;

    #[test]
    fn expand_tracks_extents() {
        let mut b = Aabb3::empty();
        assert!(b.is_empty());
        b.expand([1.0, -2.0, 0.5]);
        b.expand([-1.0, 4.0, 0.5]);
        assert!(!b.is_empty());
        assert_eq!(b.center(), Vec3::new(0.0, 1.0, 0.5));
        assert_eq!(b.max_extent(), 6.0);
    }

    #[test]
    fn sphere_validity() {
        assert!(BoundingSphere::unit().is_valid());
        assert!(!BoundingSphere::new(Vec3::ZERO, 0.0).is_valid());
        assert!(!BoundingSphere::new(Vec3::ZERO, f64::INFINITY).is_valid());
        assert!(!BoundingSphere::new(Vec3::new(f64::NAN, 0.0, 0.0), 1.0).is_valid());
    }
}
