//! Final run output: the ranked comparison table, the held-out test report,
//! and the drop-count audit. Persistence is a decorator here, never part of
//! the pipeline stages themselves.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::evaluate::{Metrics, ModelResult};
use crate::models::DropCounts;

/// Machine-readable summary of one full run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub drop_counts: DropCounts,
    pub daily_records: usize,
    pub train_records: usize,
    pub test_records: usize,
    pub ranking: Vec<ModelResult>,
    pub winner: String,
    pub test_metrics: Metrics,
}

pub fn print_audit(counts: &DropCounts) {
    println!("\n========== Cleaning Audit ==========");
    println!("Raw rows read:        {}", counts.raw_total());
    println!("  kept:               {}", counts.kept);
    println!("  malformed:          {}", counts.malformed);
    println!("  invalid timestamp:  {}", counts.invalid_timestamp);
    println!("  missing cell:       {}", counts.missing);
    println!("  sentinel value:     {}", counts.sentinel);
    println!("====================================");
}

pub fn print_ranking(results: &[ModelResult]) {
    println!("\n================== Cross-Validated Ranking ==================");
    println!(
        "{:<4} {:<12} {:<14} {:>8} {:>7} {:>8} {:>7} {:>8} {:>7}",
        "#", "strategy", "params", "rmse", "±", "r2", "±", "mae", "±"
    );
    for (position, result) in results.iter().enumerate() {
        println!(
            "{:<4} {:<12} {:<14} {:>8.3} {:>7.3} {:>8.3} {:>7.3} {:>8.3} {:>7.3}",
            position + 1,
            result.strategy,
            result.params.to_string(),
            result.cv.rmse_mean,
            result.cv.rmse_std,
            result.cv.r2_mean,
            result.cv.r2_std,
            result.cv.mae_mean,
            result.cv.mae_std,
        );
        if result.cv.failed_folds > 0 {
            println!(
                "     (note: {} fold(s) failed to fit and were excluded)",
                result.cv.failed_folds
            );
        }
    }
    println!("=============================================================");
}

pub fn print_final(winner: &ModelResult, metrics: &Metrics) {
    println!("\n========== Held-Out Test Report ==========");
    println!("Winner: {} ({})", winner.strategy, winner.params);
    println!("RMSE: {:.3}", metrics.rmse);
    println!("R2:   {:.3}", metrics.r2);
    println!("MAE:  {:.3}", metrics.mae);
    println!("==========================================");
}

/// Write the machine-readable report next to the printed one.
pub fn write_json(path: &Path, report: &RunReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create report file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("failed to write report file {}", path.display()))?;
    Ok(())
}
