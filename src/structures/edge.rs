use serde::{Deserialize, Serialize};

use crate::structures::{LatLng, NodeID};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetEdgeData {
    pub origin: NodeID,
    pub destination: NodeID,
    /// Distinguishes parallel edges between the same pair of nodes.
    pub key: u32,
    /// Meters.
    pub length: f64,
    pub geometry: Option<Vec<LatLng>>,
    /// `None` until the network has been enriched.
    pub safety_cost: Option<f64>,
}

impl StreetEdgeData {
    pub fn safety(&self) -> f64 {
        self.safety_cost.unwrap_or(0.0)
    }
}

/// Stable identity of an edge across runs: `(origin, destination, key)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRef {
    pub origin: NodeID,
    pub destination: NodeID,
    pub key: u32,
}

impl From<&StreetEdgeData> for EdgeRef {
    fn from(edge: &StreetEdgeData) -> Self {
        EdgeRef {
            origin: edge.origin,
            destination: edge.destination,
            key: edge.key,
        }
    }
}
