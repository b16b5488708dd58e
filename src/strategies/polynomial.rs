//! Per-feature polynomial expansion followed by the least-squares solver.
//! No cross terms: degree d turns each feature into d power columns.

use ndarray::{Array1, Array2};

use super::linear::solve_least_squares;
use super::{enumerate_grid, fit_error, HyperParams, Predictor, RegressionStrategy};
use crate::errors::EvalError;
use crate::models::{DailyRecord, NUM_FEATURES};

const DEGREES: [f64; 4] = [1.0, 2.0, 3.0, 4.0];

pub struct PolynomialStrategy;

impl RegressionStrategy for PolynomialStrategy {
    fn name(&self) -> &'static str {
        "polynomial"
    }

    fn grid(&self) -> Vec<HyperParams> {
        enumerate_grid("degree", &DEGREES)
    }

    fn fit(
        &self,
        train: &[DailyRecord],
        params: &HyperParams,
        _seed: u64,
    ) -> Result<Box<dyn Predictor>, EvalError> {
        let degree = params.get("degree").unwrap_or(2.0) as usize;
        if degree == 0 {
            return Err(fit_error(self.name(), "degree must be at least 1"));
        }
        let x = expanded_matrix(train, degree);
        let y = Array1::from_iter(train.iter().map(DailyRecord::target));
        let coef = solve_least_squares(&x, &y, self.name())?;
        Ok(Box::new(PolynomialPredictor { degree, coef }))
    }
}

struct PolynomialPredictor {
    degree: usize,
    coef: Array1<f64>,
}

impl Predictor for PolynomialPredictor {
    fn predict(&self, rows: &[DailyRecord]) -> Vec<f64> {
        rows.iter()
            .map(|row| {
                let expanded = expand_row(&row.features(), self.degree);
                self.coef[0]
                    + expanded
                        .iter()
                        .enumerate()
                        .map(|(j, v)| self.coef[j + 1] * v)
                        .sum::<f64>()
            })
            .collect()
    }
}

fn expand_row(features: &[f64; NUM_FEATURES], degree: usize) -> Vec<f64> {
    let mut expanded = Vec::with_capacity(NUM_FEATURES * degree);
    for &feature in features {
        let mut power = 1.0;
        for _ in 0..degree {
            power *= feature;
            expanded.push(power);
        }
    }
    expanded
}

fn expanded_matrix(rows: &[DailyRecord], degree: usize) -> Array2<f64> {
    let width = NUM_FEATURES * degree + 1;
    let mut x = Array2::zeros((rows.len(), width));
    for (i, row) in rows.iter().enumerate() {
        x[[i, 0]] = 1.0;
        for (j, value) in expand_row(&row.features(), degree).into_iter().enumerate() {
            x[[i, j + 1]] = value;
        }
    }
    x
}
