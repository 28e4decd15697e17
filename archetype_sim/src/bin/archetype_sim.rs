use std::{fs, num::NonZeroUsize, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::SmallRng, SeedableRng};
use serde::Serialize;
use tracing::info;

use archetype_sim::{
    analysis::{DEFAULT_CURATED_SAMPLES, DEFAULT_SAMPLE_SIZE, DEFAULT_TOP_CONNECTIONS},
    analyze_aggregate_connections, find_curated_pair, load_archetype_catalog_from_env,
    load_run_config_from_env, top_connections, AggregateConnectionStats, ArchetypeCatalog,
    ConnectionParams, CuratedPair, MonteCarloRunner, RunConfig, RunSummary, TopConnection,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Monte Carlo archetype matching simulation", long_about = None)]
struct Args {
    /// Users generated per simulation
    #[arg(long)]
    users: Option<NonZeroUsize>,

    /// Matching rounds per simulation
    #[arg(long)]
    rounds: Option<NonZeroUsize>,

    /// Independent simulations to run
    #[arg(long)]
    simulations: Option<NonZeroUsize>,

    /// Interests drawn per user
    #[arg(long)]
    interests: Option<NonZeroUsize>,

    /// Base seed; omitted means a fresh seed every run
    #[arg(long)]
    seed: Option<u64>,

    /// Run simulations on the calling thread
    #[arg(long)]
    sequential: bool,

    /// Run config JSON (defaults to ARCHETYPE_RUN_CONFIG_PATH or the built-in)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Archetype catalog JSON (defaults to ARCHETYPE_CATALOG_PATH or the built-in)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Mixed pairs sampled for aggregate connection analysis [default: 100]
    #[arg(long)]
    sample_size: Option<NonZeroUsize>,

    /// Mixed pairs scanned for the curated synergy example [default: 500]
    #[arg(long)]
    curated_samples: Option<NonZeroUsize>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report {
    digest: u64,
    summary: RunSummary,
    aggregate: Option<AggregateConnectionStats>,
    curated: Option<CuratedReport>,
}

#[derive(Serialize)]
struct CuratedReport {
    index: usize,
    synergy: f64,
    first_top: Option<String>,
    second_top: Option<String>,
    pathways: Vec<PathwayReport>,
    top_a_to_b: Vec<NamedConnection>,
    top_b_to_a: Vec<NamedConnection>,
}

#[derive(Serialize)]
struct PathwayReport {
    a_to_b: String,
    b_to_a: String,
    gap_a_to_b: f64,
    gap_b_to_a: f64,
    diagnostic: &'static str,
}

#[derive(Serialize)]
struct NamedConnection {
    from: String,
    to: String,
    strength: f64,
    reverse: f64,
    one_sided: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let catalog = match &args.catalog {
        Some(path) => Arc::new(
            ArchetypeCatalog::from_file(path)
                .with_context(|| format!("Failed to load catalog at {}", path.display()))?,
        ),
        None => load_archetype_catalog_from_env(),
    };
    let config = resolve_config(&args)?;

    let runner = MonteCarloRunner::new(Arc::clone(&catalog), config)
        .with_context(|| "Run config does not fit the archetype catalog")?;
    info!(
        target: "archetype_sim::cli",
        seed = runner.seed(),
        total_events = runner.config().total_events(),
        "cli.run_configured"
    );

    let results = runner.run();
    let digest = results
        .digest()
        .with_context(|| "Failed to encode results for digest")?;
    let summary = RunSummary::from_results(&results, &catalog);

    let params = ConnectionParams::default();
    let mut rng = SmallRng::seed_from_u64(runner.seed());
    let aggregate = analyze_aggregate_connections(
        &results.mixed_pairs,
        args.sample_size.map_or(DEFAULT_SAMPLE_SIZE, NonZeroUsize::get),
        &catalog,
        &params,
        &mut rng,
    );
    let curated = find_curated_pair(
        &results.mixed_pairs,
        args.curated_samples.map_or(DEFAULT_CURATED_SAMPLES, NonZeroUsize::get),
        &catalog,
        &params,
    )
    .map(|curated| curated_report(&curated, &catalog));
    if curated.is_none() {
        info!(target: "archetype_sim::cli", "cli.no_mixed_pairs");
    }

    let report = Report {
        digest,
        summary,
        aggregate,
        curated,
    };
    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}

fn resolve_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("Failed to load run config at {}", path.display()))?,
        None => load_run_config_from_env(),
    };
    if let Some(users) = args.users {
        config.num_users = users.get();
    }
    if let Some(rounds) = args.rounds {
        config.num_rounds = rounds.get();
    }
    if let Some(simulations) = args.simulations {
        config.num_simulations = simulations.get();
    }
    if let Some(interests) = args.interests {
        config.interests_per_user = interests.get();
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.sequential {
        config.parallel = false;
    }
    Ok(config)
}

fn curated_report(curated: &CuratedPair, catalog: &ArchetypeCatalog) -> CuratedReport {
    let report = &curated.report;
    let named = |connections: Vec<TopConnection>| -> Vec<NamedConnection> {
        connections
            .into_iter()
            .map(|connection| NamedConnection {
                from: catalog.name(connection.from).to_string(),
                to: catalog.name(connection.to).to_string(),
                strength: connection.strength,
                reverse: connection.reverse,
                one_sided: connection.one_sided,
            })
            .collect()
    };

    CuratedReport {
        index: curated.index,
        synergy: report.synergy.score,
        first_top: report.first_top.map(|id| catalog.name(id).to_string()),
        second_top: report.second_top.map(|id| catalog.name(id).to_string()),
        pathways: report
            .synergy
            .diagnostics
            .iter()
            .take(3)
            .map(|diagnostic| PathwayReport {
                a_to_b: diagnostic.a_to_b.describe(catalog),
                b_to_a: diagnostic.b_to_a.describe(catalog),
                gap_a_to_b: diagnostic.gap_a_to_b,
                gap_b_to_a: diagnostic.gap_b_to_a,
                diagnostic: diagnostic.kind.label(),
            })
            .collect(),
        top_a_to_b: named(top_connections(
            &report.connections.a_to_b,
            &report.connections.b_to_a,
            DEFAULT_TOP_CONNECTIONS,
        )),
        top_b_to_a: named(top_connections(
            &report.connections.b_to_a,
            &report.connections.a_to_b,
            DEFAULT_TOP_CONNECTIONS,
        )),
    }
}
