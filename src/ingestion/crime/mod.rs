mod street_csv;

pub use street_csv::{IngestStats, ingest_crime_csv};
