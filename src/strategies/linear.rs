//! Ordinary least squares on the six daily features plus an intercept.

use ndarray::{Array1, Array2};

use super::{fit_error, HyperParams, Predictor, RegressionStrategy};
use crate::errors::EvalError;
use crate::models::{DailyRecord, NUM_FEATURES};

pub struct LinearStrategy;

impl RegressionStrategy for LinearStrategy {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn grid(&self) -> Vec<HyperParams> {
        vec![HyperParams::default()]
    }

    fn fit(
        &self,
        train: &[DailyRecord],
        _params: &HyperParams,
        _seed: u64,
    ) -> Result<Box<dyn Predictor>, EvalError> {
        let x = design_matrix(train);
        let y = Array1::from_iter(train.iter().map(DailyRecord::target));
        let coef = solve_least_squares(&x, &y, self.name())?;
        Ok(Box::new(LinearPredictor { coef }))
    }
}

struct LinearPredictor {
    coef: Array1<f64>,
}

impl Predictor for LinearPredictor {
    fn predict(&self, rows: &[DailyRecord]) -> Vec<f64> {
        rows.iter()
            .map(|row| {
                let mut value = self.coef[0];
                for (j, feature) in row.features().iter().enumerate() {
                    value += self.coef[j + 1] * feature;
                }
                value
            })
            .collect()
    }
}

fn design_matrix(rows: &[DailyRecord]) -> Array2<f64> {
    let mut x = Array2::zeros((rows.len(), NUM_FEATURES + 1));
    for (i, row) in rows.iter().enumerate() {
        x[[i, 0]] = 1.0;
        for (j, feature) in row.features().iter().enumerate() {
            x[[i, j + 1]] = *feature;
        }
    }
    x
}

/// Solve the normal equations `XtX b = Xt y` by Gaussian elimination with
/// partial pivoting. The system is tiny (at most a few dozen columns), so no
/// factorization library is needed. A vanishing pivot means the design is
/// singular and the fit fails for this cell.
pub(crate) fn solve_least_squares(
    x: &Array2<f64>,
    y: &Array1<f64>,
    strategy: &str,
) -> Result<Array1<f64>, EvalError> {
    if x.nrows() == 0 {
        return Err(fit_error(strategy, "empty training set"));
    }
    if x.nrows() < x.ncols() {
        return Err(fit_error(
            strategy,
            format!("underdetermined system: {} rows, {} columns", x.nrows(), x.ncols()),
        ));
    }

    let xt = x.t();
    let mut a = xt.dot(x);
    let mut b = xt.dot(y);
    let n = a.nrows();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&p, &q| {
                a[[p, col]]
                    .abs()
                    .partial_cmp(&a[[q, col]].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if a[[pivot_row, col]].abs() < 1e-10 {
            return Err(fit_error(strategy, "singular normal equations"));
        }
        if pivot_row != col {
            for j in 0..n {
                let tmp = a[[col, j]];
                a[[col, j]] = a[[pivot_row, j]];
                a[[pivot_row, j]] = tmp;
            }
            b.swap(col, pivot_row);
        }
        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            for j in col..n {
                a[[row, j]] -= factor * a[[col, j]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut coef = Array1::zeros(n);
    for row in (0..n).rev() {
        let mut value = b[row];
        for j in (row + 1)..n {
            value -= a[[row, j]] * coef[j];
        }
        coef[row] = value / a[[row, row]];
    }
    Ok(coef)
}
