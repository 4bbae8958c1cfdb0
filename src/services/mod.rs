pub mod build;
pub mod enrich;
pub mod persistence;
