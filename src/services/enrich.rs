use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    safety::{CrimeIndex, SafetyScorer},
    services::{
        build::restore_crime_data,
        persistence::{read_artifact, save_network, write_artifact},
    },
    structures::{BuildConfig, Config, EdgeRef, LatLng, RoadNetwork, StreetEdgeData},
};

const CHECKPOINT_PREFIX: &str = "safety_batch_";
const CHECKPOINT_SUFFIX: &str = ".bin";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeScore {
    pub edge: EdgeRef,
    pub safety_cost: f64,
    /// False when no representative point could be derived for the edge.
    pub derivable: bool,
}

/// Persisted result of one batch of edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentCheckpoint {
    pub offset: usize,
    pub scores: Vec<EdgeScore>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichReport {
    pub edges: usize,
    pub batches_computed: usize,
    pub batches_restored: usize,
    /// Edges scored 0 because no representative point could be derived.
    pub underivable: usize,
}

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub batch_size: usize,
    /// Defaults to one worker per core.
    pub workers: Option<usize>,
    pub checkpoint_dir: PathBuf,
}

/// Annotates every edge of a network with a safety cost, one checkpointed
/// batch at a time.
pub struct GraphEnricher<'a> {
    scorer: &'a SafetyScorer,
    options: EnrichOptions,
    pool: ThreadPool,
}

impl<'a> GraphEnricher<'a> {
    pub fn new(scorer: &'a SafetyScorer, options: EnrichOptions) -> Result<GraphEnricher<'a>> {
        if options.batch_size == 0 {
            return Err(Error::Config("batch size must be positive".into()));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.workers.unwrap_or(0))
            .thread_name(|i| format!("enrich-{i}"))
            .build()?;

        Ok(GraphEnricher {
            scorer,
            options,
            pool,
        })
    }

    pub fn enrich(&self, network: &mut RoadNetwork) -> Result<EnrichReport> {
        let dir = &self.options.checkpoint_dir;
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let (scores, mut report) = self.compute_scores(network)?;

        for (i, score) in scores.iter().enumerate() {
            if !network.set_safety_cost(score.edge, score.safety_cost) {
                // Only reachable if a checkpoint slipped past validation.
                warn!(index = i, edge = ?score.edge, "Scored edge not found in network");
            }
        }

        report.edges = scores.len();
        report.underivable = scores.iter().filter(|s| !s.derivable).count();
        Ok(report)
    }

    /// Scores of every edge in network order.
    fn compute_scores(&self, network: &RoadNetwork) -> Result<(Vec<EdgeScore>, EnrichReport)> {
        let edges: Vec<&StreetEdgeData> = network.edges().collect();
        let total = edges.len();
        let mut results = Vec::with_capacity(total);
        let mut computed = 0;
        let mut restored = 0;

        info!(
            edges = total,
            batch_size = self.options.batch_size,
            workers = self.pool.current_num_threads(),
            "Starting edge enrichment"
        );

        for (batch_no, batch) in edges.chunks(self.options.batch_size).enumerate() {
            let offset = batch_no * self.options.batch_size;
            let path = checkpoint_path(&self.options.checkpoint_dir, offset);

            if let Some(checkpoint) = self.restore_checkpoint(&path, offset, batch) {
                debug!(offset, "Restored batch from {}", path.display());
                results.extend(checkpoint.scores);
                restored += 1;
                continue;
            }

            info!("Processing edges {} ~ {}...", offset, offset + batch.len());
            let before = Instant::now();

            let scores: Vec<EdgeScore> = self.pool.install(|| {
                batch
                    .par_iter()
                    .map(|edge| score_edge(network, self.scorer, edge))
                    .collect()
            });

            let checkpoint = EnrichmentCheckpoint { offset, scores };
            write_artifact(&checkpoint, &path, "checkpoint")?;
            info!(
                "Cached {} in {}ms",
                path.display(),
                before.elapsed().as_millis()
            );

            results.extend(checkpoint.scores);
            computed += 1;
        }

        info!(
            batches_computed = computed,
            batches_restored = restored,
            "Edge enrichment finished"
        );
        let report = EnrichReport {
            batches_computed: computed,
            batches_restored: restored,
            ..EnrichReport::default()
        };
        Ok((results, report))
    }

    /// A checkpoint is reused only when it decodes and covers exactly the
    /// edges of this batch, in order.
    fn restore_checkpoint(
        &self,
        path: &Path,
        offset: usize,
        batch: &[&StreetEdgeData],
    ) -> Option<EnrichmentCheckpoint> {
        let checkpoint: EnrichmentCheckpoint = match read_artifact(path) {
            Ok(c) => c,
            Err(Error::MissingArtifact { .. }) => return None,
            Err(e) => {
                warn!("{e}, recomputing batch");
                return None;
            }
        };

        let matches = checkpoint.offset == offset
            && checkpoint.scores.len() == batch.len()
            && checkpoint
                .scores
                .iter()
                .zip(batch)
                .all(|(s, e)| s.edge == EdgeRef::from(*e));
        if !matches {
            warn!(
                "Checkpoint {} does not match the current network, recomputing batch",
                path.display()
            );
            return None;
        }
        Some(checkpoint)
    }
}

/// First geometry vertex when the edge has geometry, otherwise the midpoint
/// of its endpoints.
pub fn representative_point(network: &RoadNetwork, edge: &StreetEdgeData) -> Option<LatLng> {
    if let Some(first) = edge.geometry.as_ref().and_then(|g| g.first()) {
        if first.is_finite() {
            return Some(*first);
        }
    }

    let from = network.get_node(edge.origin)?.loc();
    let to = network.get_node(edge.destination)?.loc();
    let mid = from.midpoint(to);
    mid.is_finite().then_some(mid)
}

fn score_edge(network: &RoadNetwork, scorer: &SafetyScorer, edge: &StreetEdgeData) -> EdgeScore {
    let point = representative_point(network, edge);

    EdgeScore {
        edge: EdgeRef::from(edge),
        safety_cost: point.map_or(0.0, |p| scorer.point_cost(p.latitude, p.longitude)),
        derivable: point.is_some(),
    }
}

pub fn checkpoint_path(dir: &Path, offset: usize) -> PathBuf {
    dir.join(format!("{CHECKPOINT_PREFIX}{offset}{CHECKPOINT_SUFFIX}"))
}

/// Removes every batch checkpoint in `dir`. Returns how many were deleted.
pub fn clear_checkpoints(dir: &Path) -> Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(Error::io(dir, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let is_checkpoint = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(CHECKPOINT_PREFIX));
        if is_checkpoint {
            fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
            debug!("Deleted {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}

/// Removes every checkpoint and the annotated network, so the next run
/// starts from scratch. Returns the number of checkpoints removed and
/// whether an annotated network was deleted.
pub fn clean_enrichment(build: &BuildConfig) -> Result<(usize, bool)> {
    let removed = clear_checkpoints(Path::new(&build.checkpoint_dir))?;

    let output = Path::new(&build.output);
    let deleted_output = match fs::remove_file(output) {
        Ok(()) => {
            debug!("Deleted {}", output.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(Error::io(output, e)),
    };
    Ok((removed, deleted_output))
}

/// The full enrichment job: load inputs, score every edge, write the
/// annotated network.
pub fn run_enrichment(config: &Config) -> Result<EnrichReport> {
    let build = &config.build;
    let network_path = Path::new(&build.network);
    let crime_path = Path::new(&build.crime_data);

    for path in [network_path, crime_path] {
        if !path.exists() {
            return Err(Error::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
    }

    let before = Instant::now();
    let mut network: RoadNetwork = read_artifact(network_path)?;
    info!(
        nodes = network.node_count(),
        edges = network.edge_count(),
        "Road network loaded"
    );
    let crime_data = restore_crime_data(build)?;

    let scorer = SafetyScorer::from_config(CrimeIndex::build(crime_data), &config.scoring);
    let enricher = GraphEnricher::new(
        &scorer,
        EnrichOptions {
            batch_size: build.batch_size,
            workers: build.workers,
            checkpoint_dir: PathBuf::from(&build.checkpoint_dir),
        },
    )?;

    let report = enricher.enrich(&mut network)?;
    if report.underivable > 0 {
        warn!(
            edges = report.underivable,
            "Edges without a representative point were given safety cost 0"
        );
    }

    save_network(&network, Path::new(&build.output))?;
    info!(
        "All done. Total time: {:.2} seconds",
        before.elapsed().as_secs_f64()
    );
    Ok(report)
}
