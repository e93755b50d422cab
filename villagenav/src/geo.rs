//! Geodesy helpers for walking-scale navigation.
//!
//! All functions use a spherical earth model, which is accurate to well under
//! a meter over the few hundred meters a village route spans.
//!
//! # Coordinate System
//!
//! - Longitude: degrees east (-180 to 180)
//! - Latitude: degrees north (-90 to 90)
//! - Heading: degrees true (0-360, 0=north, 90=east)
//! - Distance: meters
//!
//! Coordinates are carried as `[longitude, latitude]` pairs, matching the
//! GeoJSON order used by the routing services and the destination backend.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = PI / 180.0;

/// Meters spanned by one degree of latitude (constant on a sphere).
pub const METERS_PER_DEGREE_LATITUDE: f64 = EARTH_RADIUS_METERS * DEG_TO_RAD;

/// A geographic point in `[longitude, latitude]` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
}

impl Coordinate {
    /// Create a coordinate without validation.
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Returns true if both axes are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        is_valid_longitude(self.longitude) && is_valid_latitude(self.latitude)
    }

    /// The coordinate as a GeoJSON-style `[lon, lat]` pair.
    pub fn to_pair(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Build a coordinate from a GeoJSON-style `[lon, lat]` pair.
    pub fn from_pair(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.longitude, self.latitude)
    }
}

impl std::str::FromStr for Coordinate {
    type Err = String;

    /// Parse `"lon,lat"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lon, lat) = s
            .split_once(',')
            .ok_or_else(|| format!("expected 'lon,lat', got '{}'", s))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
        let coordinate = Self::new(longitude, latitude);
        if !coordinate.is_valid() {
            return Err(format!("coordinate out of range: {}", s));
        }
        Ok(coordinate)
    }
}

/// Longitude is finite and within [-180, 180].
pub fn is_valid_longitude(longitude: f64) -> bool {
    longitude.is_finite() && (-180.0..=180.0).contains(&longitude)
}

/// Latitude is finite and within [-90, 90].
pub fn is_valid_latitude(latitude: f64) -> bool {
    latitude.is_finite() && (-90.0..=90.0).contains(&latitude)
}

/// Fold a compass heading into [0, 360).
///
/// `rem_euclid` rounds tiny negative inputs up to exactly 360.0, which is
/// folded back to 0.
pub fn normalize_heading(degrees: f64) -> f64 {
    let heading = degrees.rem_euclid(360.0);
    if heading >= 360.0 {
        0.0
    } else {
        heading
    }
}

/// Great-circle distance between two coordinates in meters (haversine).
///
/// # Example
///
/// ```
/// use villagenav::geo::{distance_meters, Coordinate};
///
/// // One degree of latitude is roughly 111.2 km
/// let d = distance_meters(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0));
/// assert!((d - 111_195.0).abs() < 10.0);
/// ```
pub fn distance_meters(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.latitude * DEG_TO_RAD;
    let lat2_rad = to.latitude * DEG_TO_RAD;
    let delta_lat = (to.latitude - from.latitude) * DEG_TO_RAD;
    let delta_lon = (to.longitude - from.longitude) * DEG_TO_RAD;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

/// Meters spanned by one degree of longitude at the given latitude.
///
/// Shrinks with `cos(latitude)` and reaches zero at the poles.
pub fn meters_per_degree_longitude(latitude: f64) -> f64 {
    METERS_PER_DEGREE_LATITUDE * (latitude * DEG_TO_RAD).cos()
}

/// Shift a coordinate by a local east/north displacement in meters.
///
/// Uses a flat local tangent plane, which is what dead reckoning between two
/// fixes needs. Returns `None` when the longitude scale collapses (at or
/// extremely near the poles).
pub fn offset_meters(
    origin: Coordinate,
    east_meters: f64,
    north_meters: f64,
) -> Option<Coordinate> {
    let lon_scale = meters_per_degree_longitude(origin.latitude);
    if lon_scale.abs() < 1e-6 {
        return None;
    }

    let latitude = (origin.latitude + north_meters / METERS_PER_DEGREE_LATITUDE).clamp(-90.0, 90.0);
    let mut longitude = origin.longitude + east_meters / lon_scale;

    // Normalize longitude to -180..180
    if longitude > 180.0 {
        longitude -= 360.0;
    } else if longitude < -180.0 {
        longitude += 360.0;
    }

    Some(Coordinate::new(longitude, latitude))
}
