#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Shape3D {
    /// Data globe backed by the owning controller's mesh buffer.
    Globe { radius: f64 },
    /// Plain textured sphere without data layers.
    Sphere { radius: f64 },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Drawable3D {
    pub shape: Shape3D,
}

impl Drawable3D {
    pub fn globe(radius: f64) -> Self {
        Self {
            shape: Shape3D::Globe { radius },
        }
    }

    pub fn sphere(radius: f64) -> Self {
        Self {
            shape: Shape3D::Sphere { radius },
        }
    }

    pub fn radius(&self) -> f64 {
        match self.shape {
            Shape3D::Globe { radius } | Shape3D::Sphere { radius } => radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Drawable3D, Shape3D};

    #[test]
    fn create_sphere_drawable() {
        let drawable = Drawable3D::sphere(1.5);
        assert!(matches!(drawable.shape, Shape3D::Sphere { .. }));
        assert_eq!(drawable.radius(), 1.5);
    }
}
