//! Headless runner
//!
//! Runs one or more simulations and writes the recorded tables, the policy
//! history and a summary report into the output directory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vtown_core::instrument::{self, DataFrameLayer, ScopedRecorder};
use vtown_core::{BatchRunner, ConfigError, PolicyRecord, SimConfig, SummaryReport};

const RECORDED_TARGETS: [&str; 3] = ["model_metrics", "agent_data", "policy"];

/// Village-to-town development simulation
#[derive(Parser, Debug)]
#[command(name = "vtown")]
struct Args {
    /// YAML configuration file; defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ticks per run
    #[arg(long, default_value_t = 100)]
    steps: u64,

    /// Directory for CSV tables, policy history and the summary
    #[arg(long, default_value = "outputs")]
    output: PathBuf,

    /// Base seed; run `i` uses `seed + i`
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 1)]
    runs: u64,

    /// Only log errors and skip printing the summary
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize policy history: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write tables: {0}")]
    Polars(#[from] instrument::PolarsError),
}

fn main() {
    let args = Args::parse();
    init_tracing(args.quiet);

    if let Err(err) = run(&args) {
        tracing::error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "error" } else { "warn,vtown_core=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // The console filter applies to the fmt layer only; data rows always reach the recorder
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true).with_filter(filter))
        .with(DataFrameLayer::for_targets(RECORDED_TARGETS))
        .init();
}

fn run(args: &Args) -> Result<(), RunError> {
    let config = match &args.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    info!(
        config = ?args.config,
        width = config.grid_width,
        height = config.grid_height,
        population = config.initial_population,
        "configuration loaded"
    );

    let recorder = ScopedRecorder::new(args.output.clone());
    let outcomes = BatchRunner::from_config(&config)?
        .with_runs(args.runs)
        .with_steps(args.steps)
        .with_seed(args.seed)
        .run()?;

    let tables = recorder.finish()?;
    for path in &tables {
        info!(path = %path.display(), "table written");
    }

    std::fs::create_dir_all(&args.output)?;

    let histories: BTreeMap<u64, &[PolicyRecord]> = outcomes
        .iter()
        .map(|outcome| (outcome.run_id, outcome.history.as_slice()))
        .collect();
    let history_path = args.output.join("policy_history.json");
    std::fs::write(&history_path, serde_json::to_string_pretty(&histories)?)?;

    let report = SummaryReport::from_runs(&outcomes).render();
    let report_path = args.output.join("summary_report.txt");
    std::fs::write(&report_path, &report)?;
    info!(
        history = %history_path.display(),
        report = %report_path.display(),
        "outputs written"
    );

    if !args.quiet {
        println!("{report}");
    }
    Ok(())
}
