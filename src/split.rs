//! Seeded, stratified partitioning of the daily table.
//!
//! Stratification works on the target variable (water temperature): records
//! are ordered by target, shuffled within small consecutive windows, and then
//! dealt out systematically. Both partitions therefore see the full range of
//! the target, and the same `(input, fraction, seed)` always produces the
//! same partition.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::errors::SplitError;
use crate::models::DailyRecord;

/// Width of the consecutive-target windows used for stratification. Within a
/// window, membership is decided by the seeded shuffle.
const STRATA_WINDOW: usize = 10;

fn stratified_order(records: &[DailyRecord], rng: &mut StdRng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        records[a]
            .target()
            .partial_cmp(&records[b].target())
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    for window in order.chunks_mut(STRATA_WINDOW) {
        window.shuffle(rng);
    }
    order
}

/// Stratified train/test partition. Disjoint, exhaustive, reproducible.
pub fn split(
    records: &[DailyRecord],
    train_fraction: f64,
    seed: u64,
) -> Result<(Vec<DailyRecord>, Vec<DailyRecord>), SplitError> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(train_fraction));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let order = stratified_order(records, &mut rng);

    let mut train = Vec::with_capacity((records.len() as f64 * train_fraction) as usize + 1);
    let mut test = Vec::new();
    // Systematic deal: position `p` goes to train when the train quota
    // `floor(p * fraction)` advances. The quotas telescope, so the train set
    // ends up with exactly `floor(n * fraction)` records, spread evenly
    // through every stratum window.
    for (position, &i) in order.iter().enumerate() {
        let before = (position as f64 * train_fraction).floor();
        let after = ((position + 1) as f64 * train_fraction).floor();
        if after > before {
            train.push(records[i]);
        } else {
            test.push(records[i]);
        }
    }
    Ok((train, test))
}

/// Stratified k-way partition of the training set for cross-validation.
/// Every record lands in exactly one fold and fold sizes differ by at most
/// one.
pub fn make_folds(
    train: &[DailyRecord],
    k: usize,
    seed: u64,
) -> Result<Vec<Vec<DailyRecord>>, SplitError> {
    if k < 2 || k > train.len() {
        return Err(SplitError::InvalidFoldCount { k, n: train.len() });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let order = stratified_order(train, &mut rng);

    let mut folds = vec![Vec::with_capacity(train.len() / k + 1); k];
    for (position, &i) in order.iter().enumerate() {
        folds[position % k].push(train[i]);
    }
    Ok(folds)
}
