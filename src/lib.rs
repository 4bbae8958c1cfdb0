//! Crime-aware pedestrian routing.
//!
//! Crime incidents are aggregated and indexed ([`safety::CrimeIndex`]), turned
//! into per-edge safety costs ([`safety::SafetyScorer`]), written onto a road
//! network by a resumable batch job ([`services::enrich::GraphEnricher`]) and
//! finally searched by [`routing::RoutePlanner`] under a shortest, safest or
//! hybrid cost.

pub mod error;
pub mod ingestion;
pub mod routing;
pub mod safety;
pub mod services;
pub mod structures;
pub mod web;

pub use error::{Error, Result};
