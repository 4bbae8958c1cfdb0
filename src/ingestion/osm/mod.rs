mod pbf;

pub use pbf::load_pbf_file;
