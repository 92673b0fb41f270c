use foundation::math::Vec3;

/// Local transform relative to the parent entity.
///
/// `rotation` holds Euler angles in radians (XYZ order).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn rotate_y(&mut self, radians: f64) {
        self.rotation.y += radians;
    }
}

#[cfg(test)]
mod tests {
    use super::Transform;
    use foundation::math::Vec3;

    #[test]
    fn identity_is_origin() {
        let transform = Transform::identity();
        assert_eq!(transform.position, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(transform.rotation, Vec3::ZERO);
    }

    #[test]
    fn rotate_y_accumulates() {
        let mut transform = Transform::translate(Vec3::new(0.0, 0.0, 300.0));
        transform.rotate_y(0.5);
        transform.rotate_y(0.25);
        assert_eq!(transform.rotation.y, 0.75);
        assert_eq!(transform.position.z, 300.0);
    }
}
