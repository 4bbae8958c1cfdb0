use std::{path::Path, process::ExitCode, sync::Arc, time::Instant};

use clap::{Parser, Subcommand};
use saferoute::{
    Result,
    routing::RoutePlanner,
    safety::CrimeWeightTable,
    services::{
        build::{build_network, ingest_crimes},
        enrich::{clean_enrichment, clear_checkpoints, run_enrichment},
        persistence::{load_crime_data, load_network, save_crime_data, save_network},
    },
    structures::{Config, LatLng, RouteMode, plan::PlanOutcome},
    web,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "saferoute", about = "Crime-aware pedestrian routing")]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate the configured crime CSV sources into the crime artifact.
    IngestCrimes,
    /// List crime types found in the crime artifact with their totals.
    CrimeTypes,
    /// Build the walkable road network from the configured OSM extracts.
    ImportNetwork,
    /// Annotate every edge of the road network with a safety cost.
    Enrich {
        /// Discard existing checkpoints first.
        #[arg(long)]
        fresh: bool,
    },
    /// Delete enrichment checkpoints and the annotated network.
    Clean,
    /// Compute a route on the annotated network.
    Route {
        #[arg(allow_negative_numbers = true)]
        from_lat: f64,
        #[arg(allow_negative_numbers = true)]
        from_lng: f64,
        #[arg(allow_negative_numbers = true)]
        to_lat: f64,
        #[arg(allow_negative_numbers = true)]
        to_lng: f64,
        /// Every mode when omitted.
        #[arg(short, long, value_enum)]
        mode: Option<RouteMode>,
        /// Overrides the configured hybrid safety weight.
        #[arg(long)]
        safety_weight: Option<f64>,
    },
    /// Serve the GraphQL query endpoint over the annotated network.
    Serve,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        warn!("{} not found, using defaults", cli.config);
        Config::default()
    };

    match cli.command {
        Command::IngestCrimes => {
            let data = ingest_crimes(&config.build)?;
            save_crime_data(&data, Path::new(&config.build.crime_data))
        }
        Command::CrimeTypes => {
            let data = load_crime_data(Path::new(&config.build.crime_data))?;
            let weights = CrimeWeightTable::from_config(&config.scoring);
            for (crime_type, total) in data.type_totals() {
                println!("{total:>10}  {crime_type}");
                if !weights.contains(crime_type) {
                    warn!(crime_type, "No weight configured, defaulting to 1");
                }
            }
            Ok(())
        }
        Command::ImportNetwork => {
            let before = Instant::now();
            let network = build_network(&config.build)?;
            info!(
                nodes = network.node_count(),
                edges = network.edge_count(),
                "Network built in {}ms",
                before.elapsed().as_millis()
            );
            save_network(&network, Path::new(&config.build.network))
        }
        Command::Enrich { fresh } => {
            if fresh {
                let removed = clear_checkpoints(Path::new(&config.build.checkpoint_dir))?;
                info!("Removed {removed} checkpoints");
            }
            let report = run_enrichment(&config)?;
            info!(
                edges = report.edges,
                computed = report.batches_computed,
                restored = report.batches_restored,
                "Enrichment complete"
            );
            Ok(())
        }
        Command::Clean => {
            let (removed, deleted_output) = clean_enrichment(&config.build)?;
            info!("Removed {removed} checkpoints");
            if deleted_output {
                info!("Removed {}", config.build.output);
            }
            Ok(())
        }
        Command::Route {
            from_lat,
            from_lng,
            to_lat,
            to_lng,
            mode,
            safety_weight,
        } => {
            let mut params = config.default_routing;
            if let Some(w) = safety_weight {
                if !(0.0..=1.0).contains(&w) {
                    return Err(saferoute::Error::Config(
                        "--safety-weight must be within [0, 1]".into(),
                    ));
                }
                params.safety_weight = w;
            }

            let network = load_network(Path::new(&config.build.output))?;
            let planner = RoutePlanner::new(network, params);
            let from = LatLng::new(from_lat, from_lng);
            let to = LatLng::new(to_lat, to_lng);

            let modes = mode.map_or(RouteMode::ALL.to_vec(), |m| vec![m]);
            for mode in modes {
                let before = Instant::now();
                let outcome = PlanOutcome::from_result(
                    planner.network(),
                    mode,
                    planner.find_route(from, to, mode),
                );
                info!("Ran {mode} in {}ms", before.elapsed().as_millis());
                print_outcome(&outcome);
            }
            Ok(())
        }
        Command::Serve => {
            let network = load_network(Path::new(&config.build.output))?;
            let planner = Arc::new(RoutePlanner::new(network, config.default_routing));

            let bind = &config.server.bind;
            tokio::runtime::Runtime::new()
                .and_then(|runtime| runtime.block_on(web::app::server(planner, bind)))
                .map_err(|e| saferoute::Error::io(bind, e))
        }
    }
}

fn print_outcome(outcome: &PlanOutcome) {
    match (&outcome.plan, &outcome.error) {
        (Some(plan), _) => {
            println!(
                "{}: {} nodes, {:.1}m, safety {:.2}",
                outcome.mode,
                plan.nodes.len(),
                plan.total_distance,
                plan.total_safety
            );
            for place in &plan.places {
                println!("  {:.6}, {:.6}", place.lat, place.lon);
            }
        }
        (None, Some(e)) => println!("{}: {e}", outcome.mode),
        (None, None) => println!("{}: no result", outcome.mode),
    }
}
