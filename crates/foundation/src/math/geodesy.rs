use super::Vec3;

/// Radius of the rendered globe in scene units.
pub const GLOBE_RADIUS: f64 = 100.0;

/// Valid latitude range in degrees.
pub const LAT_RANGE: (f64, f64) = (-90.0, 90.0);
/// Valid longitude range in degrees.
pub const LNG_RANGE: (f64, f64) = (-180.0, 180.0);
/// Valid normalized arc altitude range.
pub const ALT_RANGE: (f64, f64) = (0.0, 1.0);

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Maps geographic degrees onto a sphere of `radius` centered at the origin.
///
/// Y is up; (0, 0) lies on +Z so the default camera on the +Z axis looks at
/// the prime meridian.
pub fn lat_lng_to_cartesian(pos: LatLng, radius: f64) -> Vec3 {
    let phi = (90.0 - pos.lat).to_radians();
    let theta = (90.0 - pos.lng).to_radians();
    Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

/// Central angle between two positions in degrees (haversine).
pub fn great_circle_distance_deg(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng * 0.5).sin().powi(2);
    (2.0 * h.sqrt().min(1.0).asin()).to_degrees()
}
