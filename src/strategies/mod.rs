//! Interchangeable regression strategies.
//!
//! The harness is written once against [`RegressionStrategy`] and
//! [`Predictor`]; it never names a concrete algorithm. Each strategy
//! declares its hyper-parameter grid as a plain enumeration of candidate
//! settings, and the harness cross-validates every grid point.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::errors::EvalError;
use crate::models::DailyRecord;

mod forest;
mod knn;
mod linear;
mod polynomial;

pub use forest::ForestStrategy;
pub use knn::KnnStrategy;
pub use linear::LinearStrategy;
pub use polynomial::PolynomialStrategy;

/// One candidate hyper-parameter setting: `{parameter_name: value}`.
/// Strategies without tunables use the empty set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HyperParams(BTreeMap<String, f64>);

impl HyperParams {
    pub fn single(name: &str, value: f64) -> Self {
        let mut map = BTreeMap::new();
        map.insert(name.to_string(), value);
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "-");
        }
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Expand one declared parameter range into grid points, one setting per
/// candidate value.
pub fn enumerate_grid(name: &str, values: &[f64]) -> Vec<HyperParams> {
    values
        .iter()
        .map(|&v| HyperParams::single(name, v))
        .collect()
}

pub trait Predictor {
    fn predict(&self, rows: &[DailyRecord]) -> Vec<f64>;
}

pub trait RegressionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidate settings to cross-validate. Must contain at least one
    /// entry; strategies without tunables return a single empty setting.
    fn grid(&self) -> Vec<HyperParams>;

    /// Train on `train` under `params`. `seed` feeds any internal
    /// randomness so repeated fits are identical.
    fn fit(
        &self,
        train: &[DailyRecord],
        params: &HyperParams,
        seed: u64,
    ) -> Result<Box<dyn Predictor>, EvalError>;
}

/// The strategy roster compared by the binary, in declaration order (which
/// is also the ranking tie-break order).
pub fn default_strategies() -> Vec<Box<dyn RegressionStrategy>> {
    vec![
        Box::new(LinearStrategy),
        Box::new(KnnStrategy),
        Box::new(PolynomialStrategy),
        Box::new(ForestStrategy),
    ]
}

pub(crate) fn fit_error(strategy: &str, reason: impl Into<String>) -> EvalError {
    EvalError::StrategyFit {
        strategy: strategy.to_string(),
        reason: reason.into(),
    }
}
