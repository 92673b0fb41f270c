use std::f64::consts::PI;

use crate::camera::CAMERA_DISTANCE;

/// Orbit controls locked to a fixed distance. Only rotation is interactive.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitControls {
    pub enable_pan: bool,
    pub enable_zoom: bool,
    pub min_distance: f64,
    pub max_distance: f64,
    pub min_polar_angle: f64,
    pub max_polar_angle: f64,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f64,
}

impl OrbitControls {
    pub fn new(auto_rotate: bool, auto_rotate_speed: f64) -> Self {
        Self {
            enable_pan: false,
            enable_zoom: false,
            min_distance: CAMERA_DISTANCE,
            max_distance: CAMERA_DISTANCE,
            min_polar_angle: PI / 3.5,
            max_polar_angle: PI - PI / 3.0,
            auto_rotate,
            auto_rotate_speed,
        }
    }

    pub fn clamp_polar(&self, angle: f64) -> f64 {
        angle.clamp(self.min_polar_angle, self.max_polar_angle)
    }

    pub fn clamp_distance(&self, distance: f64) -> f64 {
        distance.clamp(self.min_distance, self.max_distance)
    }
}
