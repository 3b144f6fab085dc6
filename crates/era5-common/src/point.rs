//! Query point type.

use serde::{Deserialize, Serialize};

/// A user-selected geographic coordinate in degrees.
///
/// Ranges are nominally [-90, 90] and [-180, 180] but nothing here validates
/// them; values are passed through to the grid lookup as given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both coordinates are ordinary numbers (not NaN or infinite).
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl From<(f64, f64)> for GeoPoint {
    /// Build from a `(lat, lon)` pair.
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_finite() {
        assert!(GeoPoint::new(40.0, -75.0).is_finite());
        assert!(!GeoPoint::new(f64::NAN, -75.0).is_finite());
        assert!(!GeoPoint::new(40.0, f64::INFINITY).is_finite());
    }
}
