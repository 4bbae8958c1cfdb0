mod place;
mod plan;

pub use place::*;
pub use plan::*;
