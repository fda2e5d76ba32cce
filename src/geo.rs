//! geo.rs — Great-circle distance kernel and the configured region bounds.
//!
//! Pure math, no I/O. Non-finite input degrades to an infinite distance so
//! callers can treat the point as "never eligible" instead of handling a
//! per-item error.

use serde::Deserialize;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two lat/lon points, in km.
///
/// Returns `f64::INFINITY` when any coordinate is NaN or infinite.
/// Symmetric within floating-point tolerance; zero for identical points.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    if !(lat1.is_finite() && lon1.is_finite() && lat2.is_finite() && lon2.is_finite()) {
        return f64::INFINITY;
    }

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Round to two decimals for wire output (distances, scores, risk levels).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Bounding box for catalog coordinates.
///
/// Sites outside the box are excluded from recommendation, not deleted;
/// the defaults cover Ecuador's continental and insular territory.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RegionBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl RegionBounds {
    /// Continental Ecuador plus Galápagos.
    pub const fn ecuador() -> Self {
        Self {
            lat_min: -6.0,
            lat_max: 3.0,
            lon_min: -92.0,
            lon_max: -75.0,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat.is_finite()
            && lon.is_finite()
            && (self.lat_min..=self.lat_max).contains(&lat)
            && (self.lon_min..=self.lon_max).contains(&lon)
    }
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self::ecuador()
    }
}
