pub mod cache;
pub mod crime;
pub mod osm;
