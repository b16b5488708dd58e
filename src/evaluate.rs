//! Model evaluation harness: k-fold cross-validation over a hyper-parameter
//! grid per strategy, ranking by mean RMSE, and the single held-out test
//! report for the winner.
//!
//! Fold cells are independent: each fold's trained model is discarded after
//! scoring, and a fit failure only removes that cell from the strategy's
//! aggregate. The grid evaluation is a pure map, so it runs under rayon
//! without affecting results.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::EvalError;
use crate::models::DailyRecord;
use crate::strategies::{HyperParams, RegressionStrategy};

/// Standard regression error metrics over one prediction pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub rmse: f64,
    pub r2: f64,
    pub mae: f64,
}

impl Metrics {
    /// Compute RMSE, R² and MAE of `predicted` against `actual`. With a
    /// zero-variance actual vector R² is undefined; this reports 0.0 there
    /// (no skill over the mean, which *is* the data).
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        assert_eq!(actual.len(), predicted.len());
        let n = actual.len() as f64;
        let mean = actual.iter().sum::<f64>() / n;

        let ss_res: f64 = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).powi(2))
            .sum();
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let mae = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / n;

        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };
        Metrics {
            rmse: (ss_res / n).sqrt(),
            r2,
            mae,
        }
    }
}

/// Cross-validated mean and spread of each metric, over the folds that fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CVResult {
    pub rmse_mean: f64,
    pub rmse_std: f64,
    pub r2_mean: f64,
    pub r2_std: f64,
    pub mae_mean: f64,
    pub mae_std: f64,
    pub failed_folds: usize,
}

impl CVResult {
    fn from_scores(scores: &[Metrics], failed_folds: usize) -> Self {
        let (rmse_mean, rmse_std) = mean_std(scores.iter().map(|m| m.rmse));
        let (r2_mean, r2_std) = mean_std(scores.iter().map(|m| m.r2));
        let (mae_mean, mae_std) = mean_std(scores.iter().map(|m| m.mae));
        Self {
            rmse_mean,
            rmse_std,
            r2_mean,
            r2_std,
            mae_mean,
            mae_std,
            failed_folds,
        }
    }
}

fn mean_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let values: Vec<f64> = values.collect();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// One strategy's representative result: its best grid point.
#[derive(Debug, Clone, Serialize)]
pub struct ModelResult {
    pub strategy: String,
    pub params: HyperParams,
    pub cv: CVResult,
}

/// k independent fit/predict cycles, one per fold, training on the union of
/// the remaining folds each time.
pub fn cross_validate(
    strategy: &dyn RegressionStrategy,
    folds: &[Vec<DailyRecord>],
    params: &HyperParams,
    seed: u64,
) -> Result<CVResult, EvalError> {
    let mut scores = Vec::with_capacity(folds.len());
    let mut failed_folds = 0;

    for held_out in 0..folds.len() {
        let train: Vec<DailyRecord> = folds
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != held_out)
            .flat_map(|(_, fold)| fold.iter().copied())
            .collect();

        match strategy.fit(&train, params, seed) {
            Ok(predictor) => {
                let actual: Vec<f64> = folds[held_out].iter().map(DailyRecord::target).collect();
                let predicted = predictor.predict(&folds[held_out]);
                scores.push(Metrics::compute(&actual, &predicted));
            }
            Err(err) => {
                warn!(
                    strategy = strategy.name(),
                    fold = held_out,
                    "fold excluded from aggregate: {}",
                    err
                );
                failed_folds += 1;
            }
        }
    }

    if scores.is_empty() {
        return Err(EvalError::AllFoldsFailed {
            strategy: strategy.name().to_string(),
            folds: folds.len(),
        });
    }
    Ok(CVResult::from_scores(&scores, failed_folds))
}

/// Cross-validate every grid point of one strategy and keep the point with
/// the lowest mean RMSE (earliest declared point on ties). Returns `None`
/// when no grid point produced a usable result.
pub fn evaluate_strategy(
    strategy: &dyn RegressionStrategy,
    folds: &[Vec<DailyRecord>],
    seed: u64,
) -> Option<ModelResult> {
    let grid = strategy.grid();
    let outcomes: Vec<(usize, HyperParams, Result<CVResult, EvalError>)> = grid
        .into_par_iter()
        .enumerate()
        .map(|(idx, params)| {
            let outcome = cross_validate(strategy, folds, &params, seed);
            (idx, params, outcome)
        })
        .collect();

    let mut best: Option<(usize, HyperParams, CVResult)> = None;
    for (idx, params, outcome) in outcomes {
        match outcome {
            Ok(cv) => {
                if !cv.rmse_mean.is_finite() {
                    warn!(
                        strategy = strategy.name(),
                        grid_point = idx,
                        "discarding grid point with non-finite RMSE"
                    );
                    continue;
                }
                let better = best
                    .as_ref()
                    .map_or(true, |(_, _, current)| cv.rmse_mean < current.rmse_mean);
                if better {
                    best = Some((idx, params, cv));
                }
            }
            Err(err) => warn!(strategy = strategy.name(), grid_point = idx, "{}", err),
        }
    }

    match best {
        Some((_, params, cv)) => {
            info!(
                strategy = strategy.name(),
                params = %params,
                rmse = cv.rmse_mean,
                "selected grid point"
            );
            Some(ModelResult {
                strategy: strategy.name().to_string(),
                params,
                cv,
            })
        }
        None => {
            warn!(
                strategy = strategy.name(),
                "excluded from ranking: every fold and grid point failed"
            );
            None
        }
    }
}

/// Evaluate and rank every strategy. Fails only when nothing at all fit.
pub fn evaluate_all(
    strategies: &[Box<dyn RegressionStrategy>],
    folds: &[Vec<DailyRecord>],
    seed: u64,
) -> Result<Vec<ModelResult>, EvalError> {
    let results: Vec<ModelResult> = strategies
        .iter()
        .filter_map(|s| evaluate_strategy(s.as_ref(), folds, seed))
        .collect();
    if results.is_empty() {
        return Err(EvalError::AllStrategiesFailed);
    }
    Ok(rank(results))
}

/// Stable ascending sort by mean RMSE; ties keep declaration order.
pub fn rank(mut results: Vec<ModelResult>) -> Vec<ModelResult> {
    results.sort_by(|a, b| {
        a.cv.rmse_mean
            .partial_cmp(&b.cv.rmse_mean)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results
}

/// Retrain the winner on the full training set and score the held-out test
/// set once. This is the only place the test set is ever used.
pub fn final_report(
    strategy: &dyn RegressionStrategy,
    params: &HyperParams,
    train: &[DailyRecord],
    test: &[DailyRecord],
    seed: u64,
) -> Result<Metrics, EvalError> {
    let predictor = strategy.fit(train, params, seed)?;
    let actual: Vec<f64> = test.iter().map(DailyRecord::target).collect();
    let predicted = predictor.predict(test);
    Ok(Metrics::compute(&actual, &predicted))
}
