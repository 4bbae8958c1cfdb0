mod config;
mod crime;
mod edge;
mod geo;
mod graph;
mod node;
pub mod plan;
mod routingparameters;

pub use config::*;
pub use crime::*;
pub use edge::*;
pub use geo::*;
pub use graph::*;
pub use node::*;
pub use routingparameters::*;
