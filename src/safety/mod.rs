mod index;
mod scorer;
mod weights;

pub use index::*;
pub use scorer::*;
pub use weights::*;
