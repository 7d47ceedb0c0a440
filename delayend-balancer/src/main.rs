mod report;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use delayend_game::{
    EventCatalog, MonteCarloConfig, Parameters, RecordWeights, UniformPolicy, run_monte_carlo,
};
use report::ReportFormat;

#[derive(Debug, Parser)]
#[command(name = "delayend-balancer", version)]
#[command(about = "Monte Carlo balance simulator for Delay the End")]
struct Args {
    /// Path to the event catalog (JSON array)
    #[arg(long, default_value = "data/events.json")]
    events: PathBuf,

    /// Path to the game config; missing file falls back to defaults
    #[arg(long, default_value = "data/game-config.json")]
    config: PathBuf,

    /// Number of simulated playthroughs
    #[arg(long, default_value_t = 5000)]
    runs: usize,

    /// Random seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Record-phase weight: truthful archiving
    #[arg(long, default_value_t = 0.25)]
    truth: f64,

    /// Record-phase weight: polished archiving
    #[arg(long, default_value_t = 0.25)]
    polish: f64,

    /// Record-phase weight: blurred archiving
    #[arg(long, default_value_t = 0.25)]
    blur: f64,

    /// Record-phase weight: sealed archives
    #[arg(long, default_value_t = 0.25)]
    seal: f64,

    /// Report format written to stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to export the summary as JSON
    #[arg(long)]
    export: Option<PathBuf>,
}

fn load_parameters(path: &Path) -> Result<Parameters> {
    if !path.exists() {
        log::warn!("config file {} not found, using defaults", path.display());
        return Ok(Parameters::default());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let params = Parameters::from_json(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    params.validate()?;
    Ok(params)
}

fn load_catalog(path: &Path, rounds: u32) -> Result<EventCatalog> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read events {}", path.display()))?;
    let catalog = EventCatalog::from_json(&raw)
        .with_context(|| format!("failed to parse events {}", path.display()))?;
    catalog.validate(rounds)?;
    Ok(catalog)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let params = load_parameters(&args.config)?;
    let catalog = load_catalog(&args.events, params.rounds)?;

    let cfg = MonteCarloConfig::new(args.runs)
        .with_seed(args.seed)
        .with_weights(RecordWeights::new(
            args.truth,
            args.polish,
            args.blur,
            args.seal,
        ));

    let summary = run_monte_carlo(&catalog, &params, &cfg, &mut UniformPolicy)?;

    report::render(&summary, args.report)?;

    if let Some(export_path) = &args.export {
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(export_path, json)
            .with_context(|| format!("failed to write summary {}", export_path.display()))?;
        println!("\n[Saved] summary -> {}", export_path.display());
    }

    Ok(())
}
