use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::structures::{EdgeRef, LatLng, NodeData, NodeID, StreetEdgeData};

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFoundError(NodeID),
}

/// Directed street multigraph.
///
/// Nodes are addressed by their insertion index. Outgoing edges are kept per
/// origin node, so iterating `edges()` always yields the same order for the
/// same network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadNetwork {
    nodes: Vec<NodeData>,
    edges: Vec<Vec<StreetEdgeData>>,
}

impl RoadNetwork {
    pub fn new() -> RoadNetwork {
        RoadNetwork {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: NodeData) -> NodeID {
        let id = NodeID(self.nodes.len());

        self.nodes.push(node);
        self.edges.push(Vec::new());

        id
    }

    /// Adds a directed edge and returns its identity. Parallel edges between
    /// the same pair get increasing keys starting at 0.
    pub fn add_edge(
        &mut self,
        from: NodeID,
        to: NodeID,
        length: f64,
        geometry: Option<Vec<LatLng>>,
    ) -> Result<EdgeRef, GraphError> {
        if to.0 >= self.nodes.len() {
            return Err(GraphError::NodeNotFoundError(to));
        }
        let outgoing = self
            .edges
            .get_mut(from.0)
            .ok_or(GraphError::NodeNotFoundError(from))?;

        let key = outgoing.iter().filter(|e| e.destination == to).count() as u32;
        let edge = StreetEdgeData {
            origin: from,
            destination: to,
            key,
            length,
            geometry,
            safety_cost: None,
        };
        let edge_ref = EdgeRef::from(&edge);
        outgoing.push(edge);

        Ok(edge_ref)
    }

    pub fn get_node(&self, id: NodeID) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeID, &NodeData)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeID(i), n))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    pub fn edges_from(&self, id: NodeID) -> &[StreetEdgeData] {
        self.edges.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every edge, by origin node then insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &StreetEdgeData> {
        self.edges.iter().flatten()
    }

    pub fn get_edge(&self, edge: EdgeRef) -> Option<&StreetEdgeData> {
        self.edges
            .get(edge.origin.0)?
            .iter()
            .find(|e| e.destination == edge.destination && e.key == edge.key)
    }

    /// Returns `false` when the edge does not exist in this network.
    pub fn set_safety_cost(&mut self, edge: EdgeRef, cost: f64) -> bool {
        let found = self.edges.get_mut(edge.origin.0).and_then(|outgoing| {
            outgoing
                .iter_mut()
                .find(|e| e.destination == edge.destination && e.key == edge.key)
        });
        match found {
            Some(e) => {
                e.safety_cost = Some(cost);
                true
            }
            None => false,
        }
    }

    pub fn annotated_edge_count(&self) -> usize {
        self.edges().filter(|e| e.safety_cost.is_some()).count()
    }

    pub fn nodes_distance(&self, a: NodeID, b: NodeID) -> Option<f64> {
        let node_a = self.get_node(a)?;
        let node_b = self.get_node(b)?;

        Some(node_a.loc().dist(node_b.loc()))
    }
}
