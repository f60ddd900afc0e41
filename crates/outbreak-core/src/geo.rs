//! Planar geometry over decimal degrees.
//!
//! Distances, centroids and search areas are computed on the raw
//! latitude/longitude plane. This is accurate enough for a few kilometres
//! around mid-latitude cities and keeps every geometric decision in this
//! module, so a geodesic implementation can replace it without touching
//! the validator.

use serde::{Deserialize, Serialize};

use crate::model::PositiveCase;

/// Kilometres per degree of latitude (and of longitude at the equator)
pub const KM_PER_DEGREE: f64 = 111.0;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }
}

impl From<&PositiveCase> for GeoPoint {
    fn from(case: &PositiveCase) -> Self {
        GeoPoint::new(case.latitude, case.longitude)
    }
}

/// Euclidean distance in degrees, treating lat/lon as a flat plane
pub fn planar_distance_degrees(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = a.lat - b.lat;
    let dlon = a.lon - b.lon;
    (dlat * dlat + dlon * dlon).sqrt()
}

/// Arithmetic mean of the case coordinates, `None` for an empty slice
pub fn centroid<'a, I>(cases: I) -> Option<GeoPoint>
where
    I: IntoIterator<Item = &'a PositiveCase>,
{
    let mut count = 0usize;
    let (mut lat, mut lon) = (0.0, 0.0);
    for case in cases {
        lat += case.latitude;
        lon += case.longitude;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(GeoPoint::new(lat / count as f64, lon / count as f64))
}

/// Axis-aligned search area approximating a radius around a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box spanning `radius_km` in each direction.
    ///
    /// `lat_delta = r / 111`, `lon_delta = r / (111 * cos(lat))`.
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE;
        let lon_delta = radius_km / (KM_PER_DEGREE * center.lat.to_radians().cos());
        BoundingBox {
            min_lat: center.lat - lat_delta,
            max_lat: center.lat + lat_delta,
            min_lon: center.lon - lon_delta,
            max_lon: center.lon + lon_delta,
        }
    }

    /// Inclusive on every edge
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }
}
