use foundation::color::Color;
use foundation::math::Vec3;

pub const AMBIENT_INTENSITY: f64 = 0.6;
pub const POINT_INTENSITY: f64 = 0.8;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub color: Color,
    pub intensity: f64,
    /// `None` for ambient light.
    pub position: Option<Vec3>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightRig {
    pub ambient: Light,
    pub directional_left: Light,
    pub directional_top: Light,
    pub point: Light,
}

/// Light colors taken from the globe configuration.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightColors {
    pub ambient: Color,
    pub directional_left: Color,
    pub directional_top: Color,
    pub point: Color,
}

impl Default for LightColors {
    fn default() -> Self {
        Self {
            ambient: Color::WHITE,
            directional_left: Color::WHITE,
            directional_top: Color::WHITE,
            point: Color::WHITE,
        }
    }
}

impl LightRig {
    pub fn new(colors: LightColors) -> Self {
        Self {
            ambient: Light {
                color: colors.ambient,
                intensity: AMBIENT_INTENSITY,
                position: None,
            },
            directional_left: Light {
                color: colors.directional_left,
                intensity: 1.0,
                position: Some(Vec3::new(-400.0, 100.0, 400.0)),
            },
            directional_top: Light {
                color: colors.directional_top,
                intensity: 1.0,
                position: Some(Vec3::new(-200.0, 500.0, 200.0)),
            },
            point: Light {
                color: colors.point,
                intensity: POINT_INTENSITY,
                position: Some(Vec3::new(-200.0, 500.0, 200.0)),
            },
        }
    }

    pub fn lights(&self) -> [Light; 4] {
        [
            self.ambient,
            self.directional_left,
            self.directional_top,
            self.point,
        ]
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Fog {
    pub color: Color,
    pub near: f64,
    pub far: f64,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            near: 400.0,
            far: 2000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LightColors, LightRig};
    use foundation::color::Color;

    #[test]
    fn rig_uses_configured_colors() {
        let colors = LightColors {
            ambient: Color::rgb(0x38, 0xbd, 0xf8),
            ..LightColors::default()
        };
        let rig = LightRig::new(colors);
        assert_eq!(rig.ambient.color, Color::rgb(0x38, 0xbd, 0xf8));
        assert_eq!(rig.ambient.intensity, 0.6);
        assert!(rig.ambient.position.is_none());
        assert_eq!(rig.point.intensity, 0.8);
        assert_eq!(rig.lights().len(), 4);
    }
}
