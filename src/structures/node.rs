use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::structures::LatLng;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Identifier in the source map (OSM node id for imported networks).
    pub eid: i64,
    pub lat_lng: LatLng,
}

impl NodeData {
    pub fn loc(&self) -> LatLng {
        self.lat_lng
    }
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeID(pub usize);

impl Display for NodeID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return self.0.fmt(f);
    }
}
