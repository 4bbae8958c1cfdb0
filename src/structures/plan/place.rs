use async_graphql::SimpleObject;

use crate::structures::LatLng;

#[derive(Debug, SimpleObject, Clone, Copy, PartialEq)]
pub struct PlanPlace {
    pub lat: f64,
    pub lon: f64,
}

impl From<LatLng> for PlanPlace {
    fn from(loc: LatLng) -> Self {
        PlanPlace {
            lat: loc.latitude,
            lon: loc.longitude,
        }
    }
}
