use foundation::math::{LatLng, Vec3, lat_lng_to_cartesian};

pub const CAMERA_DISTANCE: f64 = 300.0;
pub const CAMERA_FOV_DEG: f64 = 50.0;
pub const CAMERA_ASPECT: f64 = 1.2;
pub const CAMERA_NEAR: f64 = 180.0;
pub const CAMERA_FAR: f64 = 1800.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera3D {
    pub fn look_at(position: Vec3, target: Vec3, fov_y_deg: f64, near: f64, far: f64) -> Self {
        Self {
            position,
            target,
            fov_y_deg,
            aspect: CAMERA_ASPECT,
            near,
            far,
        }
    }

    /// Fixed globe camera on the +Z axis looking at the origin.
    pub fn globe() -> Self {
        Self::look_at(
            Vec3::new(0.0, 0.0, CAMERA_DISTANCE),
            Vec3::ZERO,
            CAMERA_FOV_DEG,
            CAMERA_NEAR,
            CAMERA_FAR,
        )
    }

    /// Moves the camera over `pos` at the orbit distance, keeping the target.
    pub fn place_over(&mut self, pos: LatLng) {
        let eye = lat_lng_to_cartesian(pos, CAMERA_DISTANCE);
        if eye.is_finite() {
            self.position = eye;
        } else {
            tracing::warn!(lat = pos.lat, lng = pos.lng, "ignoring non-finite camera position");
        }
    }

    /// Viewport resize; zero or non-finite sizes keep the previous aspect.
    pub fn resize(&mut self, width: f64, height: f64) {
        let aspect = width / height;
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn distance(&self) -> f64 {
        (self.position - self.target).length()
    }
}

#[cfg(test)]
mod tests {
    use super::{CAMERA_DISTANCE, Camera3D};
    use foundation::math::LatLng;

    #[test]
    fn default_globe_camera() {
        let camera = Camera3D::globe();
        assert_eq!(camera.position.z, 300.0);
        assert_eq!(camera.fov_y_deg, 50.0);
        assert_eq!(camera.aspect, 1.2);
        assert_eq!((camera.near, camera.far), (180.0, 1800.0));
    }

    #[test]
    fn place_over_keeps_orbit_distance() {
        let mut camera = Camera3D::globe();
        camera.place_over(LatLng::new(22.3193, 114.1694));
        assert!((camera.distance() - CAMERA_DISTANCE).abs() < 1e-9);
        assert!(camera.position.y > 0.0);
    }

    #[test]
    fn resize_updates_aspect() {
        let mut camera = Camera3D::globe();
        camera.resize(800.0, 400.0);
        assert_eq!(camera.aspect, 2.0);
        camera.resize(800.0, 0.0);
        assert_eq!(camera.aspect, 2.0);
    }
}
