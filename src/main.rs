use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use buoy_pipeline::clean::clean;
use buoy_pipeline::config::PipelineConfig;
use buoy_pipeline::evaluate::{evaluate_all, final_report};
use buoy_pipeline::ingest::read_observations;
use buoy_pipeline::report;
use buoy_pipeline::split::{make_folds, split};
use buoy_pipeline::strategies::default_strategies;

#[derive(Parser, Debug)]
#[command(name = "buoy_pipeline")]
#[command(about = "Cleans a year of buoy observations and compares regression models for daily sea-surface temperature", long_about = None)]
struct Args {
    /// Raw buoy observation table (whitespace- or comma-delimited)
    #[arg(long, env = "BUOY_DATA")]
    input: PathBuf,

    /// Optional JSON config overriding sentinels / units / harness knobs
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fraction of daily records used for training
    #[arg(long)]
    train_fraction: Option<f64>,

    /// Number of cross-validation folds
    #[arg(long)]
    folds: Option<usize>,

    /// Random seed for split, folds and strategy randomness
    #[arg(long)]
    seed: Option<u64>,

    /// Write the machine-readable run report here
    #[arg(long)]
    json_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("buoy_pipeline=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let started = Instant::now();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(fraction) = args.train_fraction {
        config.harness.train_fraction = fraction;
    }
    if let Some(folds) = args.folds {
        config.harness.folds = folds;
    }
    if let Some(seed) = args.seed {
        config.harness.seed = seed;
    }

    info!(input = %args.input.display(), seed = config.harness.seed, "starting run");

    let ingested = read_observations(&args.input)
        .with_context(|| format!("failed to ingest {}", args.input.display()))?;
    info!(
        rows = ingested.rows.len(),
        malformed = ingested.malformed,
        "ingest finished"
    );

    let mut outcome = clean(&ingested.rows, &config.clean);
    outcome.counts.malformed += ingested.malformed;

    let harness = &config.harness;
    let (train, test) = split(&outcome.days, harness.train_fraction, harness.seed)
        .context("train/test split failed")?;
    let folds = make_folds(&train, harness.folds, harness.seed)
        .context("fold assignment failed")?;
    info!(
        days = outcome.days.len(),
        train = train.len(),
        test = test.len(),
        folds = folds.len(),
        "partitioning finished"
    );

    let strategies = default_strategies();
    let ranking = evaluate_all(&strategies, &folds, harness.seed)
        .context("cross-validated comparison failed")?;

    let winner = &ranking[0];
    let winning_strategy = strategies
        .iter()
        .find(|s| s.name() == winner.strategy)
        .context("ranked strategy missing from roster")?;
    let test_metrics = final_report(
        winning_strategy.as_ref(),
        &winner.params,
        &train,
        &test,
        harness.seed,
    )
    .context("held-out test evaluation failed")?;

    report::print_audit(&outcome.counts);
    report::print_ranking(&ranking);
    report::print_final(winner, &test_metrics);

    if let Some(path) = &args.json_out {
        let run = report::RunReport {
            drop_counts: outcome.counts,
            daily_records: outcome.days.len(),
            train_records: train.len(),
            test_records: test.len(),
            ranking: ranking.clone(),
            winner: winner.strategy.clone(),
            test_metrics,
        };
        report::write_json(path, &run)?;
        info!(path = %path.display(), "wrote JSON report");
    }

    info!(elapsed = ?started.elapsed(), "run finished");
    Ok(())
}
