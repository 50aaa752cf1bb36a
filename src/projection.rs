//! Coordinate reference systems and planar projection.
//!
//! DBSCAN's `eps` is a Euclidean distance, so clustering runs over a
//! planar metric projection rather than raw degrees. The metric system
//! used is spherical Web Mercator (EPSG:3857): exactly invertible, with
//! scale distortion that is negligible at the city-scale radii this tool
//! works with.

use std::f64::consts::PI;
use std::str::FromStr;

use crate::error::{GeoFocusError, Result};

/// WGS84 equatorial radius in meters (the Web Mercator sphere radius).
const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Latitude bound of the Web Mercator projection plane.
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

/// A supported coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Geographic WGS84 degrees (EPSG:4326).
    Wgs84,
    /// Spherical Web Mercator meters (EPSG:3857).
    WebMercator,
}

impl Crs {
    /// The EPSG identifier for this system.
    pub fn epsg_code(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
        }
    }

    /// True if coordinates in this system are planar meters.
    pub fn is_metric(&self) -> bool {
        matches!(self, Crs::WebMercator)
    }
}

impl FromStr for Crs {
    type Err = GeoFocusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EPSG:4326" | "WGS84" => Ok(Crs::Wgs84),
            "EPSG:3857" | "WEB MERCATOR" => Ok(Crs::WebMercator),
            other => Err(GeoFocusError::UnsupportedCrs {
                crs: other.to_string(),
            }),
        }
    }
}

/// A position on the metric projection plane, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another projected point.
    pub fn distance_sq(&self, other: &ProjectedPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Project geographic coordinates from `source` onto the metric plane.
///
/// Only geographic WGS84 input is supported; any other source system fails
/// with [`GeoFocusError::UnsupportedCrs`]. Latitudes beyond the Mercator
/// bound are clamped to it.
pub fn project_to_metric(source: Crs, latitude: f64, longitude: f64) -> Result<ProjectedPoint> {
    if source != Crs::Wgs84 {
        return Err(GeoFocusError::UnsupportedCrs {
            crs: format!("EPSG:{}", source.epsg_code()),
        });
    }

    let lat = latitude.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
    let x = EARTH_RADIUS_METERS * longitude.to_radians();
    let y = EARTH_RADIUS_METERS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();

    Ok(ProjectedPoint::new(x, y))
}

/// Convert a metric-plane position back to geographic (latitude, longitude)
/// degrees.
pub fn metric_to_geographic(point: ProjectedPoint) -> (f64, f64) {
    let longitude = (point.x / EARTH_RADIUS_METERS).to_degrees();
    let latitude = (2.0 * (point.y / EARTH_RADIUS_METERS).exp().atan() - PI / 2.0).to_degrees();
    (latitude, longitude)
}
