use std::{collections::BTreeMap, fs};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    ingestion::cache::SourceLocation,
    structures::{BoundingBox, RoutingParameters},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub build: BuildConfig,
    pub scoring: ScoringConfig,
    pub default_routing: RoutingParameters,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub inputs: Vec<Ingestor>,
    pub bounding_box: BoundingBox,
    /// Postcard crime artifact, written by `ingest-crimes`.
    pub crime_data: String,
    /// Plain road network, written by `import-network`.
    pub network: String,
    /// Annotated road network, written by `enrich`.
    pub output: String,
    pub checkpoint_dir: String,
    pub batch_size: usize,
    /// Worker threads for enrichment. Defaults to the number of cores.
    pub workers: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            inputs: Vec::new(),
            bounding_box: BoundingBox::default(),
            crime_data: "cache/crime_data.bin".to_string(),
            network: "cache/network.bin".to_string(),
            output: "cache/network_safety.bin".to_string(),
            checkpoint_dir: "cache/checkpoints".to_string(),
            batch_size: 10_000,
            workers: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "ingestor")]
pub enum Ingestor {
    #[serde(rename = "osm/pbf")]
    OsmPbf(OsmPbfIngestor),
    #[serde(rename = "crime/csv")]
    CrimeCsv(CrimeCsvIngestor),
}

#[derive(Debug, Deserialize)]
pub struct OsmPbfIngestor {
    pub url: String,
}

/// A CSV file, or a directory walked recursively for CSV files.
#[derive(Debug, Deserialize)]
pub struct CrimeCsvIngestor {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Meters.
    pub max_distance: f64,
    pub max_score: f64,
    /// Replaces the built-in crime weight table when present.
    pub weights: Option<BTreeMap<String, f64>>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            max_distance: 500.0,
            max_score: 300.0,
            weights: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Ingestor {
    pub fn label(&self) -> &str {
        match self {
            Ingestor::OsmPbf(_) => "osm/pbf",
            Ingestor::CrimeCsv(c) => &c.name,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Ingestor::OsmPbf(c) => &c.url,
            Ingestor::CrimeCsv(c) => &c.url,
        }
    }

    pub fn location(&self) -> Result<SourceLocation> {
        let url = self.url();
        if let Some(path) = url.strip_prefix("path:") {
            Ok(SourceLocation::Local(path.to_string()))
        } else if url.starts_with("http://") || url.starts_with("https://") {
            Ok(SourceLocation::Remote(url.to_string()))
        } else {
            Err(Error::Config(format!(
                "Unknown URL scheme for '{}': {url}",
                self.label()
            )))
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Config::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = serde_yml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.build.batch_size == 0 {
            return Err(Error::Config("build.batch_size must be positive".into()));
        }
        if self.build.workers == Some(0) {
            return Err(Error::Config("build.workers must be positive".into()));
        }
        if !(self.scoring.max_distance >= 0.0) {
            return Err(Error::Config("scoring.max_distance must be >= 0".into()));
        }
        if !(self.scoring.max_score > 0.0) || !self.scoring.max_score.is_finite() {
            return Err(Error::Config("scoring.max_score must be positive".into()));
        }
        if let Some(weights) = &self.scoring.weights {
            if let Some((crime_type, w)) = weights.iter().find(|(_, w)| !(**w > 0.0 && w.is_finite()))
            {
                return Err(Error::Config(format!(
                    "weight for '{crime_type}' must be positive, got {w}"
                )));
            }
        }
        let routing = &self.default_routing;
        if !(0.0..=1.0).contains(&routing.safety_weight) {
            return Err(Error::Config(
                "default_routing.safety_weight must be within [0, 1]".into(),
            ));
        }
        if !(routing.length_scale > 0.0) || !routing.length_scale.is_finite() {
            return Err(Error::Config(
                "default_routing.length_scale must be positive".into(),
            ));
        }
        Ok(())
    }
}
