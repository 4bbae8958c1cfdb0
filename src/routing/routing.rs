use std::{
    cmp::{Ordering, Reverse},
    collections::{HashMap, HashSet},
    time::Instant,
};

use kdtree::KdTree;
use priority_queue::PriorityQueue;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    safety::SAFETY_COST_MAX,
    structures::{LatLng, NodeID, RoadNetwork, RouteMode, RoutingParameters, StreetEdgeData},
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouteError {
    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("no node near ({lat}, {lon})")]
    NoNearbyNode { lat: f64, lon: f64 },
    #[error("no {mode} route found")]
    NoRouteFound { mode: RouteMode },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub mode: RouteMode,
    pub nodes: Vec<NodeID>,
    pub coordinates: Vec<LatLng>,
    /// Meters.
    pub total_distance: f64,
    pub total_safety: f64,
}

/// Path cost with a total order, so it can sit in the priority queue.
#[derive(Debug, Clone, Copy)]
struct Cost(f64);

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Equal weights fall back to the node id, which keeps paths deterministic.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct DijkstraPriority {
    weight: Cost,
    node: NodeID,
}

/// Answers route queries over an annotated network.
///
/// Holds the network and a spatial index of its nodes, both immutable after
/// construction, so one planner can serve concurrent queries.
pub struct RoutePlanner {
    network: RoadNetwork,
    nodes_tree: Option<KdTree<f64, NodeID, [f64; 2]>>,
    params: RoutingParameters,
}

impl RoutePlanner {
    pub fn new(network: RoadNetwork, params: RoutingParameters) -> RoutePlanner {
        let mut tree = KdTree::new(2);
        for (id, node) in network.nodes() {
            if let Err(e) = tree.add(node.loc().as_point(), id) {
                warn!("Node {} not indexed: {:?}", id, e);
            }
        }
        let nodes_tree = (tree.size() > 0).then_some(tree);

        let unannotated = network.edge_count() - network.annotated_edge_count();
        if unannotated > 0 {
            warn!(
                edges = unannotated,
                "Network has edges without safety cost, they count as 0"
            );
        }

        RoutePlanner {
            network,
            nodes_tree,
            params,
        }
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn snap_to_nearest_node(&self, lat: f64, lon: f64) -> Result<NodeID, RouteError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(RouteError::InvalidCoordinate { lat, lon });
        }
        let tree = self
            .nodes_tree
            .as_ref()
            .ok_or(RouteError::NoNearbyNode { lat, lon })?;

        match tree.nearest(&[lat, lon], 1, &LatLng::distance) {
            Ok(nearest) => match nearest.first() {
                Some((dist, id)) => {
                    debug!("Nearest node to ({lat}, {lon}): {} at {:.2}m", id, dist);
                    Ok(**id)
                }
                None => Err(RouteError::NoNearbyNode { lat, lon }),
            },
            Err(_) => Err(RouteError::NoNearbyNode { lat, lon }),
        }
    }

    pub fn find_route(
        &self,
        origin: LatLng,
        destination: LatLng,
        mode: RouteMode,
    ) -> Result<RouteResult, RouteError> {
        let from = self.snap_to_nearest_node(origin.latitude, origin.longitude)?;
        let to = self.snap_to_nearest_node(destination.latitude, destination.longitude)?;

        self.route_between(from, to, mode)
    }

    /// One outcome per mode: shortest, safest, hybrid.
    pub fn find_routes(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> Vec<(RouteMode, Result<RouteResult, RouteError>)> {
        RouteMode::ALL
            .into_iter()
            .map(|mode| (mode, self.find_route(origin, destination, mode)))
            .collect()
    }

    pub fn route_between(
        &self,
        from: NodeID,
        to: NodeID,
        mode: RouteMode,
    ) -> Result<RouteResult, RouteError> {
        if from == to {
            return Err(RouteError::NoRouteFound { mode });
        }

        let before = Instant::now();
        let edges = self
            .dijkstra(from, to, mode)
            .ok_or(RouteError::NoRouteFound { mode })?;
        debug!(
            "{mode} route: {} edges in {}us",
            edges.len(),
            before.elapsed().as_micros()
        );

        let mut nodes = Vec::with_capacity(edges.len() + 1);
        nodes.push(from);
        nodes.extend(edges.iter().map(|e| e.destination));
        if nodes.len() < 2 {
            return Err(RouteError::NoRouteFound { mode });
        }

        let coordinates = nodes
            .iter()
            .filter_map(|id| self.network.get_node(*id).map(|n| n.loc()))
            .collect();
        let total_distance = edges.iter().map(|e| e.length).sum();
        let total_safety = edges.iter().map(|e| e.safety()).sum();

        Ok(RouteResult {
            mode,
            nodes,
            coordinates,
            total_distance,
            total_safety,
        })
    }

    fn edge_cost(&self, mode: RouteMode, edge: &StreetEdgeData) -> f64 {
        let cost = match mode {
            RouteMode::Shortest => edge.length,
            RouteMode::Safest => edge.safety(),
            RouteMode::Hybrid => {
                let w = self.params.safety_weight;
                (1.0 - w) * edge.length / self.params.length_scale
                    + w * edge.safety() / SAFETY_COST_MAX
            }
        };
        // Dijkstra needs non-negative weights; NaN collapses to 0 as well.
        cost.max(0.0)
    }

    /// Edges of the cheapest path from `a` to `b`, in travel order.
    fn dijkstra(&self, a: NodeID, b: NodeID, mode: RouteMode) -> Option<Vec<&StreetEdgeData>> {
        let mut pq = PriorityQueue::<NodeID, Reverse<DijkstraPriority>>::new();
        let mut origins = HashMap::<NodeID, &StreetEdgeData>::new();
        let mut visited = HashSet::<NodeID>::new();
        pq.push(
            a,
            Reverse(DijkstraPriority {
                weight: Cost(0.0),
                node: a,
            }),
        );

        while let Some((id, Reverse(p))) = pq.pop() {
            if id == b {
                debug!("Found a path after visiting {} nodes", visited.len());
                return Some(reconstruct_path(&origins, a, b));
            }
            visited.insert(id);

            for edge in self.network.edges_from(id) {
                if visited.contains(&edge.destination) {
                    continue;
                }
                let weight = Cost(p.weight.0 + self.edge_cost(mode, edge));
                let priority = Reverse(DijkstraPriority {
                    weight,
                    node: edge.destination,
                });

                match pq.get_priority(&edge.destination) {
                    Some(current) => {
                        if weight < current.0.weight {
                            pq.change_priority(&edge.destination, priority);
                            origins.insert(edge.destination, edge);
                        }
                    }
                    None => {
                        pq.push(edge.destination, priority);
                        origins.insert(edge.destination, edge);
                    }
                }
            }
        }

        debug!("No path found after visiting {} nodes", visited.len());
        None
    }
}

fn reconstruct_path<'a>(
    origins: &HashMap<NodeID, &'a StreetEdgeData>,
    a: NodeID,
    b: NodeID,
) -> Vec<&'a StreetEdgeData> {
    let mut path = Vec::new();
    let mut current = b;

    while current != a {
        match origins.get(&current) {
            Some(edge) => {
                path.push(*edge);
                current = edge.origin;
            }
            None => break,
        }
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::structures::NodeData;

    const A: LatLng = LatLng {
        latitude: 51.5000,
        longitude: -0.1000,
    };
    const B: LatLng = LatLng {
        latitude: 51.5000,
        longitude: -0.0986,
    };
    const C: LatLng = LatLng {
        latitude: 51.5009,
        longitude: -0.0986,
    };
    const D: LatLng = LatLng {
        latitude: 51.5009,
        longitude: -0.1000,
    };

    fn link(g: &mut RoadNetwork, from: usize, to: usize, length: f64, safety: f64) {
        for (u, v) in [(from, to), (to, from)] {
            let e = g.add_edge(NodeID(u), NodeID(v), length, None).unwrap();
            g.set_safety_cost(e, safety);
        }
    }

    /// A-B and B-C are quiet, the A-C diagonal is shorter but crosses a
    /// high-crime block. D is only reachable from nowhere.
    fn square(params: RoutingParameters) -> RoutePlanner {
        let mut g = RoadNetwork::new();
        for (i, loc) in [A, B, C, D].into_iter().enumerate() {
            g.add_node(NodeData {
                eid: i as i64 + 1,
                lat_lng: loc,
            });
        }
        link(&mut g, 0, 1, 100.0, 1.0);
        link(&mut g, 1, 2, 100.0, 1.0);
        link(&mut g, 0, 2, 150.0, 9.0);
        RoutePlanner::new(g, params)
    }

    #[test]
    fn shortest_takes_the_diagonal() {
        let planner = square(RoutingParameters::default());
        let route = planner.find_route(A, C, RouteMode::Shortest).unwrap();

        assert_eq!(route.nodes, vec![NodeID(0), NodeID(2)]);
        assert_eq!(route.coordinates, vec![A, C]);
        assert_eq!(route.total_distance, 150.0);
        assert_eq!(route.total_safety, 9.0);
    }

    #[test]
    fn safest_goes_around() {
        let planner = square(RoutingParameters::default());
        let route = planner.find_route(A, C, RouteMode::Safest).unwrap();

        assert_eq!(route.nodes, vec![NodeID(0), NodeID(1), NodeID(2)]);
        assert_eq!(route.total_distance, 200.0);
        assert_eq!(route.total_safety, 2.0);
    }

    #[test]
    fn hybrid_follows_the_blend_ratio() {
        let balanced = square(RoutingParameters::default());
        let route = balanced.find_route(A, C, RouteMode::Hybrid).unwrap();
        assert_eq!(route.nodes, vec![NodeID(0), NodeID(1), NodeID(2)]);

        let distance_only = square(RoutingParameters {
            safety_weight: 0.0,
            ..RoutingParameters::default()
        });
        let route = distance_only.find_route(A, C, RouteMode::Hybrid).unwrap();
        assert_eq!(route.nodes, vec![NodeID(0), NodeID(2)]);
    }

    #[test]
    fn same_node_is_not_a_route() {
        let planner = square(RoutingParameters::default());
        let near_a = LatLng::new(51.50001, -0.10001);
        for mode in RouteMode::ALL {
            assert_eq!(
                planner.find_route(A, near_a, mode),
                Err(RouteError::NoRouteFound { mode })
            );
        }
    }

    #[test]
    fn unreachable_node_is_no_route() {
        let planner = square(RoutingParameters::default());
        assert_eq!(
            planner.find_route(A, D, RouteMode::Safest),
            Err(RouteError::NoRouteFound {
                mode: RouteMode::Safest
            })
        );
    }

    #[test]
    fn snapping_rejects_bad_input() {
        let planner = square(RoutingParameters::default());
        assert_eq!(planner.snap_to_nearest_node(51.50089, -0.09861), Ok(NodeID(2)));
        assert!(matches!(
            planner.snap_to_nearest_node(f64::NAN, 0.0),
            Err(RouteError::InvalidCoordinate { .. })
        ));

        let empty = RoutePlanner::new(RoadNetwork::new(), RoutingParameters::default());
        assert!(matches!(
            empty.snap_to_nearest_node(51.5, -0.1),
            Err(RouteError::NoNearbyNode { .. })
        ));
    }

    #[test]
    fn parallel_edges_use_the_cheapest_and_count_it_once() {
        let mut g = RoadNetwork::new();
        g.add_node(NodeData { eid: 1, lat_lng: A });
        g.add_node(NodeData { eid: 2, lat_lng: B });
        let long_safe = g.add_edge(NodeID(0), NodeID(1), 120.0, None).unwrap();
        let short_risky = g.add_edge(NodeID(0), NodeID(1), 100.0, None).unwrap();
        g.set_safety_cost(long_safe, 1.0);
        g.set_safety_cost(short_risky, 8.0);
        let planner = RoutePlanner::new(g, RoutingParameters::default());

        let shortest = planner.find_route(A, B, RouteMode::Shortest).unwrap();
        assert_eq!((shortest.total_distance, shortest.total_safety), (100.0, 8.0));

        let safest = planner.find_route(A, B, RouteMode::Safest).unwrap();
        assert_eq!((safest.total_distance, safest.total_safety), (120.0, 1.0));
        assert_eq!(safest.nodes.len(), 2);
    }

    #[test]
    fn find_routes_reports_every_mode() {
        let planner = square(RoutingParameters::default());
        let outcomes = planner.find_routes(A, C);
        let modes: Vec<_> = outcomes.iter().map(|(m, _)| *m).collect();
        assert_eq!(modes, RouteMode::ALL.to_vec());
        assert!(outcomes.iter().all(|(_, r)| r.is_ok()));
    }

    /// Bellman-Ford over a single attribute, as an independent reference.
    fn reference_cost(
        g: &RoadNetwork,
        from: usize,
        to: usize,
        attr: fn(&StreetEdgeData) -> f64,
    ) -> Option<f64> {
        let mut dist = vec![f64::INFINITY; g.node_count()];
        dist[from] = 0.0;
        for _ in 0..g.node_count() {
            for e in g.edges() {
                let candidate = dist[e.origin.0] + attr(e);
                if candidate < dist[e.destination.0] {
                    dist[e.destination.0] = candidate;
                }
            }
        }
        dist[to].is_finite().then_some(dist[to])
    }

    #[test]
    fn totals_match_a_reference_search() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut g = RoadNetwork::new();
        for i in 0..40 {
            g.add_node(NodeData {
                eid: i,
                lat_lng: LatLng::new(
                    51.5 + (i / 8) as f64 * 0.001,
                    -0.1 + (i % 8) as f64 * 0.001,
                ),
            });
        }
        for _ in 0..160 {
            let u = rng.gen_range(0..40_usize);
            let v = rng.gen_range(0..40_usize);
            if u == v {
                continue;
            }
            let length = f64::from(rng.gen_range(10_u32..510));
            let safety = f64::from(rng.gen_range(0_u32..1000)) / 100.0;
            let e = g.add_edge(NodeID(u), NodeID(v), length, None).unwrap();
            g.set_safety_cost(e, safety);
        }
        let planner = RoutePlanner::new(g.clone(), RoutingParameters::default());

        for from in 0..40 {
            for to in (0..40).filter(|&t| t != from) {
                let (a, b) = (NodeID(from), NodeID(to));
                let shortest = planner.route_between(a, b, RouteMode::Shortest);
                let safest = planner.route_between(a, b, RouteMode::Safest);

                match reference_cost(&g, from, to, |e| e.length) {
                    Some(expected) => {
                        let route = shortest.unwrap();
                        assert!((route.total_distance - expected).abs() < 1e-9);
                        assert_eq!(route.nodes.first(), Some(&NodeID(from)));
                        assert_eq!(route.nodes.last(), Some(&NodeID(to)));
                    }
                    None => assert!(shortest.is_err()),
                }
                match reference_cost(&g, from, to, |e| e.safety()) {
                    Some(expected) => {
                        assert!((safest.unwrap().total_safety - expected).abs() < 1e-9)
                    }
                    None => assert!(safest.is_err()),
                }
            }
        }
    }
}
