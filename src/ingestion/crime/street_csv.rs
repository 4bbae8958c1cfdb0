use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    structures::{BoundingBox, CrimeAccumulator, GridPoint},
};

/// One row of a police street-level crime export. Other columns are ignored.
#[derive(Debug, Deserialize)]
struct CrimeRow {
    #[serde(rename = "Latitude")]
    latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    longitude: Option<f64>,
    #[serde(rename = "Crime type")]
    crime_type: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub files: usize,
    pub accepted: u64,
    pub malformed: u64,
    pub outside: u64,
}

impl IngestStats {
    pub fn merge(&mut self, other: IngestStats) {
        self.files += other.files;
        self.accepted += other.accepted;
        self.malformed += other.malformed;
        self.outside += other.outside;
    }
}

/// Feeds every CSV under `path` (a file, or a directory walked recursively in
/// name order) into `acc`.
///
/// Rows that fail to parse, miss a field, or fall outside `bbox` are skipped.
/// A file that cannot be opened is logged and skipped too.
pub fn ingest_crime_csv(
    path: &Path,
    bbox: &BoundingBox,
    acc: &mut CrimeAccumulator,
) -> Result<IngestStats> {
    let files = if path.is_dir() {
        collect_csv_files(path)
    } else if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        return Err(Error::MissingArtifact {
            path: path.to_path_buf(),
        });
    };

    let mut stats = IngestStats::default();
    for file in files {
        match ingest_single_file(&file, bbox, acc) {
            Ok(file_stats) => {
                debug!(
                    file = %file.display(),
                    accepted = file_stats.accepted,
                    malformed = file_stats.malformed,
                    outside = file_stats.outside,
                    "Crime file ingested"
                );
                stats.merge(file_stats);
            }
            Err(e) => warn!("Unable to parse {}: {e}", file.display()),
        }
    }

    info!(
        path = %path.display(),
        files = stats.files,
        accepted = stats.accepted,
        malformed = stats.malformed,
        outside = stats.outside,
        "Crime source ingested"
    );
    Ok(stats)
}

fn ingest_single_file(
    path: &Path,
    bbox: &BoundingBox,
    acc: &mut CrimeAccumulator,
) -> Result<IngestStats> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut stats = IngestStats {
        files: 1,
        ..IngestStats::default()
    };

    for result in reader.deserialize::<CrimeRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                debug!(
                    "{}",
                    Error::MalformedRecord {
                        path: path.to_path_buf(),
                        line,
                        reason: e.to_string(),
                    }
                );
                stats.malformed += 1;
                continue;
            }
        };

        let (Some(lat), Some(lon), Some(crime_type)) = (row.latitude, row.longitude, row.crime_type)
        else {
            stats.malformed += 1;
            continue;
        };
        let crime_type = crime_type.trim();
        if crime_type.is_empty() {
            stats.malformed += 1;
            continue;
        }
        if !bbox.contains(lat, lon) {
            stats.outside += 1;
            continue;
        }
        let Some(point) = GridPoint::round(lat, lon) else {
            stats.malformed += 1;
            continue;
        };

        acc.add(point, crime_type);
        stats.accepted += 1;
    }

    Ok(stats)
}

/// CSV files under `dir`, depth first in file name order. Entries that cannot
/// be read are logged and skipped.
fn collect_csv_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {e}", dir.display());
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect()
}
