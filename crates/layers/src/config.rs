//! Globe and widget configuration.
//!
//! Every field is optional on the wire; missing fields take the defaults
//! below and [`GlobeConfig::validated`] replaces values that are not usable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use foundation::color::Color;
use foundation::math::{LAT_RANGE, LNG_RANGE, LatLng};
use gpu::host::HostConfig;
use gpu::lighting::LightColors;
use runtime::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::symbology::parse_or_white;

/// Per-frame rotation used when the configured speed is unusable.
pub const FALLBACK_ROTATE_SPEED: f64 = 0.002;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialPosition {
    pub lat: f64,
    pub lng: f64,
}

impl Default for InitialPosition {
    fn default() -> Self {
        Self { lat: 0.0, lng: 0.0 }
    }
}

impl From<InitialPosition> for LatLng {
    fn from(p: InitialPosition) -> Self {
        LatLng::new(p.lat, p.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobeConfig {
    pub point_size: f64,
    pub globe_color: String,
    pub show_atmosphere: bool,
    pub atmosphere_color: String,
    pub atmosphere_altitude: f64,
    pub emissive: String,
    pub emissive_intensity: f64,
    pub shininess: f64,
    pub polygon_color: String,
    pub ambient_light: String,
    pub directional_left_light: String,
    pub directional_top_light: String,
    pub point_light: String,
    /// Arc dash animation time in milliseconds.
    pub arc_time: f64,
    pub arc_length: f64,
    pub rings: u32,
    pub max_rings: f64,
    pub initial_position: InitialPosition,
    pub auto_rotate: bool,
    /// Radians added to the globe's Y rotation per animation frame.
    pub auto_rotate_speed: f64,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            point_size: 1.0,
            globe_color: "#1d072e".into(),
            show_atmosphere: true,
            atmosphere_color: "#ffffff".into(),
            atmosphere_altitude: 0.1,
            emissive: "#000000".into(),
            emissive_intensity: 0.1,
            shininess: 0.9,
            polygon_color: "rgba(255,255,255,0.7)".into(),
            ambient_light: "#ffffff".into(),
            directional_left_light: "#ffffff".into(),
            directional_top_light: "#ffffff".into(),
            point_light: "#ffffff".into(),
            arc_time: 2000.0,
            arc_length: 0.9,
            rings: 1,
            max_rings: 3.0,
            initial_position: InitialPosition::default(),
            auto_rotate: false,
            auto_rotate_speed: 1.0,
        }
    }
}

impl GlobeConfig {
    /// The configuration rendered on the portfolio page.
    pub fn showcase() -> Self {
        Self {
            point_size: 4.0,
            globe_color: "#062056".into(),
            atmosphere_color: "#FFFFFF".into(),
            emissive: "#062056".into(),
            ambient_light: "#38bdf8".into(),
            arc_time: 1000.0,
            initial_position: InitialPosition {
                lat: 22.3193,
                lng: 114.1694,
            },
            auto_rotate: true,
            auto_rotate_speed: 0.5,
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        Ok(config.validated())
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Replaces non-finite, out-of-range and unparseable values with
    /// defaults, logging each substitution.
    pub fn validated(mut self) -> Self {
        let d = Self::default();

        self.point_size = positive(self.point_size, d.point_size, "pointSize");
        self.arc_time = positive(self.arc_time, d.arc_time, "arcTime");
        self.arc_length = positive(self.arc_length, d.arc_length, "arcLength");
        self.max_rings = positive(self.max_rings, d.max_rings, "maxRings");
        self.atmosphere_altitude =
            non_negative(self.atmosphere_altitude, d.atmosphere_altitude, "atmosphereAltitude");
        self.emissive_intensity =
            non_negative(self.emissive_intensity, d.emissive_intensity, "emissiveIntensity");
        self.shininess = non_negative(self.shininess, d.shininess, "shininess");

        if !self.auto_rotate_speed.is_finite() || self.auto_rotate_speed == 0.0 {
            tracing::warn!(
                value = self.auto_rotate_speed,
                fallback = FALLBACK_ROTATE_SPEED,
                "invalid autoRotateSpeed"
            );
            self.auto_rotate_speed = FALLBACK_ROTATE_SPEED;
        }

        self.initial_position = InitialPosition {
            lat: clamp_or_mid(self.initial_position.lat, LAT_RANGE, "initialPosition.lat"),
            lng: clamp_or_mid(self.initial_position.lng, LNG_RANGE, "initialPosition.lng"),
        };

        color_or(&mut self.globe_color, &d.globe_color, "globeColor");
        color_or(&mut self.atmosphere_color, &d.atmosphere_color, "atmosphereColor");
        color_or(&mut self.emissive, &d.emissive, "emissive");
        color_or(&mut self.polygon_color, &d.polygon_color, "polygonColor");
        color_or(&mut self.ambient_light, &d.ambient_light, "ambientLight");
        color_or(
            &mut self.directional_left_light,
            &d.directional_left_light,
            "directionalLeftLight",
        );
        color_or(
            &mut self.directional_top_light,
            &d.directional_top_light,
            "directionalTopLight",
        );
        color_or(&mut self.point_light, &d.point_light, "pointLight");

        self
    }

    /// `arcTime × arcLength / rings`, or 2000 ms without rings.
    pub fn ring_repeat_period_ms(&self) -> f64 {
        if self.rings == 0 {
            return 2000.0;
        }
        let period = self.arc_time * self.arc_length / self.rings as f64;
        if period.is_finite() && period > 0.0 { period } else { 2000.0 }
    }

    pub fn light_colors(&self) -> LightColors {
        LightColors {
            ambient: parse_or_white(&self.ambient_light),
            directional_left: parse_or_white(&self.directional_left_light),
            directional_top: parse_or_white(&self.directional_top_light),
            point: parse_or_white(&self.point_light),
        }
    }

    pub fn host_config(&self, device_pixel_ratio: f64, viewport: Option<(f64, f64)>) -> HostConfig {
        HostConfig {
            light_colors: self.light_colors(),
            initial_position: self.initial_position.into(),
            auto_rotate: self.auto_rotate,
            auto_rotate_speed: self.auto_rotate_speed,
            device_pixel_ratio,
            viewport,
        }
    }

    pub fn globe_color(&self) -> Color {
        parse_or_white(&self.globe_color)
    }

    pub fn emissive_color(&self) -> Color {
        Color::parse(&self.emissive).unwrap_or(Color::BLACK)
    }
}

fn positive(value: f64, default: f64, field: &str) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        tracing::warn!(field, value, default, "invalid value, using default");
        default
    }
}

fn non_negative(value: f64, default: f64, field: &str) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        tracing::warn!(field, value, default, "invalid value, using default");
        default
    }
}

fn clamp_or_mid(value: f64, (min, max): (f64, f64), field: &str) -> f64 {
    if !value.is_finite() {
        let mid = (min + max) / 2.0;
        tracing::warn!(field, value, fixed = mid, "non-finite coordinate");
        return mid;
    }
    value.clamp(min, max)
}

fn color_or(value: &mut String, default: &str, field: &str) {
    if let Err(err) = Color::parse(value) {
        tracing::warn!(field, value = %value, default, %err, "invalid color, using default");
        *value = default.to_string();
    }
}

/// Widget-level knobs for data generation and retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetSettings {
    pub arc_count: usize,
    pub min_arc_distance: f64,
    pub generation_timeout_ms: u64,
    pub retry_base_delay_ms: u64,
    /// Total generation attempts, including the first.
    pub generation_attempts: u32,
    /// Automatic scene retries after the first failed initialization.
    pub scene_retries: u32,
    pub manual_retry_limit: u32,
    /// Fixed seed for reproducible sample data.
    pub seed: Option<u64>,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            arc_count: 40,
            min_arc_distance: 0.75,
            generation_timeout_ms: 8000,
            retry_base_delay_ms: 1000,
            generation_attempts: 3,
            scene_retries: 3,
            manual_retry_limit: 3,
            seed: None,
        }
    }
}

impl WidgetSettings {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn generation_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.generation_attempts, self.retry_base_delay())
    }

    pub fn scene_policy(&self) -> RetryPolicy {
        RetryPolicy::with_retries(self.scene_retries, self.retry_base_delay())
    }
}
