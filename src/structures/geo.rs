use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters.
const EARTH_RADIUS: f64 = 6_371_008.8;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> LatLng {
        LatLng {
            latitude,
            longitude,
        }
    }

    /// Haversine distance between two `[lat, lon]` slices, in meters.
    ///
    /// Shaped to be handed directly to the k-d tree as its metric.
    pub fn distance(loc1: &[f64], loc2: &[f64]) -> f64 {
        debug_assert!(loc1.len() == 2);
        debug_assert!(loc2.len() == 2);
        haversine(loc1[0], loc1[1], loc2[0], loc2[1])
    }

    pub fn dist(&self, other: Self) -> f64 {
        haversine(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    pub fn midpoint(&self, other: Self) -> LatLng {
        LatLng {
            latitude: (self.latitude + other.latitude) / 2.0,
            longitude: (self.longitude + other.longitude) / 2.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    pub fn as_point(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let delta_latitude = (lat1 - lat2).to_radians();
    let delta_longitude = (lon1 - lon2).to_radians();

    let central_angle_inner = (delta_latitude / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (delta_longitude / 2.0).sin().powi(2);
    let central_angle = 2.0 * central_angle_inner.sqrt().min(1.0).asin();

    EARTH_RADIUS * central_angle
}
