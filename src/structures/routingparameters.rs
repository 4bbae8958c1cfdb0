use std::fmt::Display;

use async_graphql::Enum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, clap::ValueEnum)]
pub enum RouteMode {
    Shortest,
    Safest,
    Hybrid,
}

impl RouteMode {
    pub const ALL: [RouteMode; 3] = [RouteMode::Shortest, RouteMode::Safest, RouteMode::Hybrid];

    pub fn label(&self) -> &'static str {
        match self {
            RouteMode::Shortest => "shortest",
            RouteMode::Safest => "safest",
            RouteMode::Hybrid => "hybrid",
        }
    }
}

impl Display for RouteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingParameters {
    /// Share of the safety term in hybrid mode, in `[0, 1]`.
    pub safety_weight: f64,
    /// Meters that count as one unit of distance in hybrid mode.
    pub length_scale: f64,
}

impl Default for RoutingParameters {
    fn default() -> Self {
        RoutingParameters {
            safety_weight: 0.5,
            length_scale: 100.0,
        }
    }
}
