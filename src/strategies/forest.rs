//! Random forest regression: bagged, depth-limited trees over random
//! feature subsets. All randomness (bootstrap draws, feature sampling) comes
//! from the run seed, so a fit is exactly reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{enumerate_grid, fit_error, HyperParams, Predictor, RegressionStrategy};
use crate::errors::EvalError;
use crate::models::{DailyRecord, NUM_FEATURES};

const TREE_COUNTS: [f64; 3] = [25.0, 50.0, 100.0];
const MAX_DEPTH: usize = 8;
const MIN_SPLIT: usize = 4;
/// Features sampled per split, roughly sqrt of the feature count.
const FEATURES_PER_SPLIT: usize = 3;

pub struct ForestStrategy;

impl RegressionStrategy for ForestStrategy {
    fn name(&self) -> &'static str {
        "forest"
    }

    fn grid(&self) -> Vec<HyperParams> {
        enumerate_grid("trees", &TREE_COUNTS)
    }

    fn fit(
        &self,
        train: &[DailyRecord],
        params: &HyperParams,
        seed: u64,
    ) -> Result<Box<dyn Predictor>, EvalError> {
        if train.is_empty() {
            return Err(fit_error(self.name(), "empty training set"));
        }
        let tree_count = params.get("trees").unwrap_or(50.0) as usize;
        if tree_count == 0 {
            return Err(fit_error(self.name(), "tree count must be at least 1"));
        }

        let features: Vec<[f64; NUM_FEATURES]> =
            train.iter().map(|row| row.features()).collect();
        let targets: Vec<f64> = train.iter().map(DailyRecord::target).collect();
        let n = targets.len();

        // One sequentially-threaded RNG keeps the whole ensemble a pure
        // function of (train, params, seed).
        let mut rng = StdRng::seed_from_u64(seed);
        let mut trees = Vec::with_capacity(tree_count);
        for _ in 0..tree_count {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(grow_tree(&features, &targets, &sample, 0, &mut rng));
        }
        Ok(Box::new(ForestPredictor { trees }))
    }
}

enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        match self {
            Node::Leaf(value) => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if features[*feature] <= *threshold {
                    left.predict(features)
                } else {
                    right.predict(features)
                }
            }
        }
    }
}

struct ForestPredictor {
    trees: Vec<Node>,
}

impl Predictor for ForestPredictor {
    fn predict(&self, rows: &[DailyRecord]) -> Vec<f64> {
        rows.iter()
            .map(|row| {
                let features = row.features();
                let sum: f64 = self.trees.iter().map(|t| t.predict(&features)).sum();
                sum / self.trees.len() as f64
            })
            .collect()
    }
}

fn mean_of(targets: &[f64], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
}

fn sse_of(targets: &[f64], indices: &[usize]) -> f64 {
    let mean = mean_of(targets, indices);
    indices.iter().map(|&i| (targets[i] - mean).powi(2)).sum()
}

fn grow_tree(
    features: &[[f64; NUM_FEATURES]],
    targets: &[f64],
    indices: &[usize],
    depth: usize,
    rng: &mut StdRng,
) -> Node {
    let node_mean = mean_of(targets, indices);
    if depth >= MAX_DEPTH || indices.len() < MIN_SPLIT {
        return Node::Leaf(node_mean);
    }
    let node_sse = sse_of(targets, indices);
    if node_sse <= f64::EPSILON {
        return Node::Leaf(node_mean);
    }

    let candidates = rand::seq::index::sample(rng, NUM_FEATURES, FEATURES_PER_SPLIT);
    let mut best: Option<(f64, usize, f64)> = None; // (sse, feature, threshold)

    for feature in candidates {
        let mut values: Vec<f64> = indices.iter().map(|&i| features[i][feature]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| features[i][feature] <= threshold);
            if left.is_empty() || right.is_empty() {
                continue;
            }
            let split_sse = sse_of(targets, &left) + sse_of(targets, &right);
            if best.map_or(true, |(sse, _, _)| split_sse < sse) {
                best = Some((split_sse, feature, threshold));
            }
        }
    }

    match best {
        Some((split_sse, feature, threshold)) if split_sse < node_sse => {
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&i| features[i][feature] <= threshold);
            Node::Split {
                feature,
                threshold,
                left: Box::new(grow_tree(features, targets, &left, depth + 1, rng)),
                right: Box::new(grow_tree(features, targets, &right, depth + 1, rng)),
            }
        }
        _ => Node::Leaf(node_mean),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn day(i: usize, air: f64, target: f64) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap() + chrono::Duration::days(i as i64),
            wind_dir: (i * 29 % 360) as f64,
            wind_spd: 4.0 + (i % 6) as f64,
            wave_height: 2.0 + (i % 3) as f64 * 0.5,
            dominant_period: 7.0 + (i % 5) as f64,
            wave_dir: (i * 53 % 360) as f64,
            air_temp: air,
            water_temp: target,
        }
    }

    #[test]
    fn constant_target_predicts_the_constant() {
        let train: Vec<DailyRecord> =
            (0..30).map(|i| day(i, 50.0 + i as f64, 65.0)).collect();
        let predictor = ForestStrategy
            .fit(&train, &HyperParams::single("trees", 25.0), 9)
            .unwrap();
        for value in predictor.predict(&train) {
            assert_relative_eq!(value, 65.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn same_seed_gives_identical_predictions() {
        let train: Vec<DailyRecord> = (0..50)
            .map(|i| day(i, 40.0 + (i % 21) as f64, 50.0 + (i % 13) as f64))
            .collect();
        let a = ForestStrategy
            .fit(&train, &HyperParams::single("trees", 25.0), 1112)
            .unwrap()
            .predict(&train);
        let b = ForestStrategy
            .fit(&train, &HyperParams::single("trees", 25.0), 1112)
            .unwrap()
            .predict(&train);
        assert_eq!(a, b);
    }

    #[test]
    fn separates_two_obvious_regimes() {
        // Cold half and warm half, split on air temperature.
        let mut train = Vec::new();
        for i in 0..25 {
            train.push(day(i, 40.0 + (i % 5) as f64, 45.0));
        }
        for i in 25..50 {
            train.push(day(i, 80.0 + (i % 5) as f64, 75.0));
        }
        let predictor = ForestStrategy
            .fit(&train, &HyperParams::single("trees", 50.0), 4)
            .unwrap();
        let cold = predictor.predict(&[day(100, 41.0, 0.0)])[0];
        let warm = predictor.predict(&[day(101, 82.0, 0.0)])[0];
        assert!(cold < 55.0, "cold regime predicted {}", cold);
        assert!(warm > 65.0, "warm regime predicted {}", warm);
    }
}
