use std::{fs, path::Path};

use saferoute::{
    Error,
    services::{
        enrich::{EdgeScore, EnrichmentCheckpoint, checkpoint_path, run_enrichment},
        persistence::{load_network, save_crime_data, save_network, write_artifact},
    },
    structures::{
        BuildConfig, Config, CrimeAccumulator, EdgeRef, GridPoint, LatLng, NodeData, NodeID,
        RoadNetwork,
    },
};

const BATCH_SIZE: usize = 4;

/// Six nodes along a street, linked both ways: ten edges, three batches.
fn street() -> RoadNetwork {
    let mut g = RoadNetwork::new();
    let ids: Vec<_> = (0..6)
        .map(|i| {
            g.add_node(NodeData {
                eid: 1000 + i,
                lat_lng: LatLng::new(51.5, -0.1 + 0.002 * i as f64),
            })
        })
        .collect();
    for pair in ids.windows(2) {
        let length = g.nodes_distance(pair[0], pair[1]).unwrap();
        g.add_edge(pair[0], pair[1], length, None).unwrap();
        g.add_edge(pair[1], pair[0], length, None).unwrap();
    }
    g
}

fn config(dir: &Path) -> Config {
    Config {
        build: BuildConfig {
            crime_data: dir.join("crime_data.bin").display().to_string(),
            network: dir.join("network.bin").display().to_string(),
            output: dir.join("network_safety.bin").display().to_string(),
            checkpoint_dir: dir.join("checkpoints").display().to_string(),
            batch_size: BATCH_SIZE,
            workers: Some(2),
            ..BuildConfig::default()
        },
        ..Config::default()
    }
}

fn prepare(dir: &Path, network: &RoadNetwork) -> Config {
    let config = config(dir);

    let mut acc = CrimeAccumulator::new();
    let hotspot = GridPoint::round(51.5, -0.1).unwrap();
    for _ in 0..20 {
        acc.add(hotspot, "Robbery");
    }
    acc.add(GridPoint::round(51.5005, -0.092).unwrap(), "Shoplifting");
    save_crime_data(&acc.finish(), Path::new(&config.build.crime_data)).unwrap();
    save_network(network, Path::new(&config.build.network)).unwrap();

    config
}

fn output(config: &Config) -> Vec<u8> {
    fs::read(&config.build.output).unwrap()
}

#[test]
fn every_edge_is_annotated() {
    let dir = tempfile::tempdir().unwrap();
    let config = prepare(dir.path(), &street());

    let report = run_enrichment(&config).unwrap();
    assert_eq!(report.edges, 10);
    assert_eq!(report.batches_computed, 3);
    assert_eq!(report.batches_restored, 0);
    assert_eq!(report.underivable, 0);

    let enriched = load_network(Path::new(&config.build.output)).unwrap();
    assert_eq!(enriched.annotated_edge_count(), 10);
    for edge in enriched.edges() {
        let cost = edge.safety_cost.unwrap();
        assert!(cost == 0.0 || (1.0..=10.0).contains(&cost), "{cost}");
    }

    // The first edge starts at the hotspot.
    assert!(enriched.edges().next().unwrap().safety() >= 1.0);
}

#[test]
fn resumed_run_matches_uninterrupted_run() {
    let network = street();

    let clean_dir = tempfile::tempdir().unwrap();
    let clean = prepare(clean_dir.path(), &network);
    run_enrichment(&clean).unwrap();

    let resumed_dir = tempfile::tempdir().unwrap();
    let resumed = prepare(resumed_dir.path(), &network);
    run_enrichment(&resumed).unwrap();

    // Simulate a crash before the last batch and the final write.
    let checkpoints = Path::new(&resumed.build.checkpoint_dir);
    fs::remove_file(checkpoint_path(checkpoints, 8)).unwrap();
    fs::remove_file(&resumed.build.output).unwrap();

    let report = run_enrichment(&resumed).unwrap();
    assert_eq!(report.batches_restored, 2);
    assert_eq!(report.batches_computed, 1);
    assert_eq!(output(&resumed), output(&clean));
}

#[test]
fn valid_checkpoints_are_reused() {
    let dir = tempfile::tempdir().unwrap();
    let network = street();
    let config = prepare(dir.path(), &network);

    let scores = network
        .edges()
        .take(BATCH_SIZE)
        .map(|e| EdgeScore {
            edge: EdgeRef::from(e),
            safety_cost: 7.25,
            derivable: true,
        })
        .collect();
    write_artifact(
        &EnrichmentCheckpoint { offset: 0, scores },
        &checkpoint_path(Path::new(&config.build.checkpoint_dir), 0),
        "checkpoint",
    )
    .unwrap();

    let report = run_enrichment(&config).unwrap();
    assert_eq!(report.batches_restored, 1);
    assert_eq!(report.batches_computed, 2);

    let enriched = load_network(Path::new(&config.build.output)).unwrap();
    let costs: Vec<_> = enriched.edges().map(|e| e.safety()).collect();
    assert!(costs[..BATCH_SIZE].iter().all(|&c| c == 7.25));
    assert!(costs[BATCH_SIZE..].iter().all(|&c| c != 7.25));
}

#[test]
fn corrupted_checkpoint_is_recomputed() {
    let network = street();

    let clean_dir = tempfile::tempdir().unwrap();
    let clean = prepare(clean_dir.path(), &network);
    run_enrichment(&clean).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let config = prepare(dir.path(), &network);
    let checkpoints = Path::new(&config.build.checkpoint_dir);
    fs::create_dir_all(checkpoints).unwrap();
    fs::write(checkpoint_path(checkpoints, 4), b"\xff\xff\xff").unwrap();

    let report = run_enrichment(&config).unwrap();
    assert_eq!(report.batches_computed, 3);
    assert_eq!(output(&config), output(&clean));
}

#[test]
fn checkpoint_from_another_network_is_recomputed() {
    let dir = tempfile::tempdir().unwrap();
    let config = prepare(dir.path(), &street());

    // Right offset, wrong edges.
    let scores = (0..BATCH_SIZE)
        .map(|i| EdgeScore {
            edge: EdgeRef {
                origin: NodeID(i + 40),
                destination: NodeID(i + 41),
                key: 0,
            },
            safety_cost: 9.0,
            derivable: true,
        })
        .collect();
    write_artifact(
        &EnrichmentCheckpoint { offset: 0, scores },
        &checkpoint_path(Path::new(&config.build.checkpoint_dir), 0),
        "checkpoint",
    )
    .unwrap();

    let report = run_enrichment(&config).unwrap();
    assert_eq!(report.batches_restored, 0);
    assert_eq!(report.batches_computed, 3);
}

#[test]
fn missing_inputs_fail_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    save_network(&street(), Path::new(&config.build.network)).unwrap();

    match run_enrichment(&config) {
        Err(Error::MissingArtifact { path }) => {
            assert_eq!(path, Path::new(&config.build.crime_data));
        }
        other => panic!("expected a missing artifact, got {other:?}"),
    }
    assert!(!Path::new(&config.build.checkpoint_dir).exists());
    assert!(!Path::new(&config.build.output).exists());
}

#[test]
fn edges_without_a_location_cost_nothing() {
    let mut network = street();
    let a = network.add_node(NodeData {
        eid: 9000,
        lat_lng: LatLng::new(f64::NAN, f64::NAN),
    });
    let b = network.add_node(NodeData {
        eid: 9001,
        lat_lng: LatLng::new(51.5, -0.1),
    });
    network.add_edge(a, b, 10.0, None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let config = prepare(dir.path(), &network);

    let report = run_enrichment(&config).unwrap();
    assert_eq!(report.edges, 11);
    assert_eq!(report.underivable, 1);

    let enriched = load_network(Path::new(&config.build.output)).unwrap();
    assert_eq!(enriched.edges_from(a)[0].safety_cost, Some(0.0));

    // The last batch holds the dangling edge; a resume restores its flag.
    fs::remove_file(&config.build.output).unwrap();
    let resumed = run_enrichment(&config).unwrap();
    assert_eq!(resumed.batches_restored, 3);
    assert_eq!(resumed.underivable, 1);
}
