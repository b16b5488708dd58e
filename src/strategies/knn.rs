//! k-nearest-neighbor regression on standardized features.
//!
//! Features are standardized with the training set's mean and spread so that
//! degree-scaled fields (wind direction) do not drown out the rest of the
//! distance. Prediction is the mean target of the k closest training rows.

use std::cmp::Ordering;

use super::{enumerate_grid, fit_error, HyperParams, Predictor, RegressionStrategy};
use crate::errors::EvalError;
use crate::models::{DailyRecord, NUM_FEATURES};

const NEIGHBOR_COUNTS: [f64; 6] = [3.0, 5.0, 7.0, 9.0, 11.0, 15.0];

pub struct KnnStrategy;

impl RegressionStrategy for KnnStrategy {
    fn name(&self) -> &'static str {
        "knn"
    }

    fn grid(&self) -> Vec<HyperParams> {
        enumerate_grid("k", &NEIGHBOR_COUNTS)
    }

    fn fit(
        &self,
        train: &[DailyRecord],
        params: &HyperParams,
        _seed: u64,
    ) -> Result<Box<dyn Predictor>, EvalError> {
        if train.is_empty() {
            return Err(fit_error(self.name(), "empty training set"));
        }
        let k = params.get("k").unwrap_or(5.0) as usize;
        if k == 0 {
            return Err(fit_error(self.name(), "neighbor count must be at least 1"));
        }

        let scaler = Scaler::from_rows(train);
        let features = train
            .iter()
            .map(|row| scaler.transform(&row.features()))
            .collect();
        let targets = train.iter().map(DailyRecord::target).collect();
        Ok(Box::new(KnnPredictor {
            k,
            scaler,
            features,
            targets,
        }))
    }
}

/// Per-feature mean and spread learned from the training set.
struct Scaler {
    means: [f64; NUM_FEATURES],
    spreads: [f64; NUM_FEATURES],
}

impl Scaler {
    fn from_rows(rows: &[DailyRecord]) -> Self {
        let n = rows.len() as f64;
        let mut means = [0.0; NUM_FEATURES];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row.features()) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        let mut spreads = [0.0; NUM_FEATURES];
        for row in rows {
            for ((spread, mean), value) in spreads.iter_mut().zip(&means).zip(row.features()) {
                *spread += (value - mean).powi(2);
            }
        }
        for spread in &mut spreads {
            *spread = (*spread / n).sqrt();
            // A constant column carries no distance information; leave it
            // untouched rather than dividing by zero.
            if *spread == 0.0 {
                *spread = 1.0;
            }
        }
        Self { means, spreads }
    }

    fn transform(&self, features: &[f64; NUM_FEATURES]) -> [f64; NUM_FEATURES] {
        let mut out = [0.0; NUM_FEATURES];
        for i in 0..NUM_FEATURES {
            out[i] = (features[i] - self.means[i]) / self.spreads[i];
        }
        out
    }
}

struct KnnPredictor {
    k: usize,
    scaler: Scaler,
    features: Vec<[f64; NUM_FEATURES]>,
    targets: Vec<f64>,
}

impl Predictor for KnnPredictor {
    fn predict(&self, rows: &[DailyRecord]) -> Vec<f64> {
        let k = self.k.min(self.targets.len());
        rows.iter()
            .map(|row| {
                let query = self.scaler.transform(&row.features());
                let mut distances: Vec<(f64, f64)> = self
                    .features
                    .iter()
                    .zip(&self.targets)
                    .map(|(stored, &target)| {
                        let d2 = stored
                            .iter()
                            .zip(query)
                            .map(|(a, b)| (a - b).powi(2))
                            .sum::<f64>();
                        (d2, target)
                    })
                    .collect();
                distances
                    .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
                distances.iter().take(k).map(|&(_, t)| t).sum::<f64>() / k as f64
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn day(i: usize, air: f64, target: f64) -> DailyRecord {
        DailyRecord {
            date: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap() + chrono::Duration::days(i as i64),
            wind_dir: 180.0,
            wind_spd: 6.0,
            wave_height: 2.5,
            dominant_period: 8.0,
            wave_dir: 190.0,
            air_temp: air,
            water_temp: target,
        }
    }

    #[test]
    fn prediction_is_mean_of_nearest_targets() {
        // Two tight clusters in air temperature; querying inside one cluster
        // must average only that cluster's targets.
        let train = vec![
            day(0, 50.0, 48.0),
            day(1, 50.5, 50.0),
            day(2, 51.0, 52.0),
            day(3, 80.0, 70.0),
            day(4, 80.5, 72.0),
            day(5, 81.0, 74.0),
        ];
        let predictor = KnnStrategy
            .fit(&train, &HyperParams::single("k", 3.0), 0)
            .unwrap();

        let cold = predictor.predict(&[day(10, 50.4, 0.0)]);
        assert_relative_eq!(cold[0], 50.0);
        let warm = predictor.predict(&[day(11, 80.6, 0.0)]);
        assert_relative_eq!(warm[0], 72.0);
    }

    #[test]
    fn neighbor_count_is_clamped_to_training_size() {
        let train = vec![day(0, 50.0, 40.0), day(1, 60.0, 60.0)];
        let predictor = KnnStrategy
            .fit(&train, &HyperParams::single("k", 15.0), 0)
            .unwrap();
        let out = predictor.predict(&[day(2, 55.0, 0.0)]);
        assert_relative_eq!(out[0], 50.0);
    }
}
