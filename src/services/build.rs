use std::{path::Path, time::Instant};

use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    ingestion::{cache::resolve_path, crime::ingest_crime_csv, osm},
    services::persistence::{load_crime_data, save_crime_data},
    structures::{BuildConfig, CrimeAccumulator, CrimeData, Ingestor, RoadNetwork},
};

/// Builds the plain road network from every `osm/pbf` input.
pub fn build_network(config: &BuildConfig) -> Result<RoadNetwork> {
    let mut g = RoadNetwork::new();
    let mut loaded = 0;

    for input in &config.inputs {
        let Ingestor::OsmPbf(_) = input else {
            continue;
        };
        info!("Loading '{}'...", input.label());
        let before = Instant::now();

        let path = resolve_path(input)?;
        osm::load_pbf_file(Path::new(&path), &mut g)?;
        loaded += 1;

        info!(
            "Loaded '{}' in {}ms",
            input.label(),
            before.elapsed().as_millis()
        );
    }

    if loaded == 0 {
        return Err(Error::Config("no osm/pbf input configured".into()));
    }
    Ok(g)
}

/// Aggregates every `crime/csv` input into one immutable crime artifact.
pub fn ingest_crimes(config: &BuildConfig) -> Result<CrimeData> {
    let mut acc = CrimeAccumulator::new();
    let mut loaded = 0;

    for input in &config.inputs {
        let Ingestor::CrimeCsv(_) = input else {
            continue;
        };
        info!("Loading crime data '{}'...", input.label());
        let before = Instant::now();

        let path = resolve_path(input)?;
        ingest_crime_csv(Path::new(&path), &config.bounding_box, &mut acc)?;
        loaded += 1;

        info!(
            "Loaded '{}' in {}ms",
            input.label(),
            before.elapsed().as_millis()
        );
    }

    if loaded == 0 {
        return Err(Error::Config("no crime/csv input configured".into()));
    }

    let data = acc.finish();
    info!(
        locations = data.len(),
        incidents = data.incident_count(),
        crime_types = data.crime_types().len(),
        "Crime data aggregated"
    );
    Ok(data)
}

/// Reads the cached crime artifact, rebuilding it from the configured sources
/// when it no longer decodes. A missing artifact is left to the caller.
pub fn restore_crime_data(config: &BuildConfig) -> Result<CrimeData> {
    let path = Path::new(&config.crime_data);
    match load_crime_data(path) {
        Err(e @ Error::CacheCorrupted { .. }) => {
            warn!("{e}, rebuilding from sources");
            let data = ingest_crimes(config)?;
            save_crime_data(&data, path)?;
            Ok(data)
        }
        other => other,
    }
}
