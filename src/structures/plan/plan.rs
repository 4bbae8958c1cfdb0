use async_graphql::SimpleObject;

use crate::{
    routing::{RouteError, RouteResult},
    structures::{RoadNetwork, RouteMode, plan::PlanPlace},
};

#[derive(Debug, SimpleObject)]
pub struct Plan {
    /// Source map ids of the traversed nodes.
    pub nodes: Vec<i64>,
    pub places: Vec<PlanPlace>,
    /// Meters.
    pub total_distance: f64,
    pub total_safety: f64,
}

/// Result of one routing mode. Exactly one of `plan` and `error` is set.
#[derive(Debug, SimpleObject)]
pub struct PlanOutcome {
    pub mode: RouteMode,
    pub plan: Option<Plan>,
    pub error: Option<String>,
}

impl Plan {
    pub fn from_route(g: &RoadNetwork, route: RouteResult) -> Plan {
        Plan {
            nodes: route
                .nodes
                .iter()
                .filter_map(|id| g.get_node(*id).map(|n| n.eid))
                .collect(),
            places: route.coordinates.into_iter().map(PlanPlace::from).collect(),
            total_distance: route.total_distance,
            total_safety: route.total_safety,
        }
    }
}

impl PlanOutcome {
    pub fn from_result(
        g: &RoadNetwork,
        mode: RouteMode,
        result: Result<RouteResult, RouteError>,
    ) -> PlanOutcome {
        match result {
            Ok(route) => PlanOutcome {
                mode,
                plan: Some(Plan::from_route(g, route)),
                error: None,
            },
            Err(e) => PlanOutcome {
                mode,
                plan: None,
                error: Some(e.to_string()),
            },
        }
    }
}
