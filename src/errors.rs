use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error reading data file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Data file {path} contains no observation rows")]
    Empty { path: PathBuf },
}

/// Row-level cleaning failures. These are diagnostic only: the offending row
/// is dropped and counted, the run continues.
#[derive(Error, Debug)]
pub enum CleanError {
    #[error("malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },
    #[error(
        "invalid timestamp at row {row}: {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}"
    )]
    InvalidTimestamp {
        row: usize,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
    },
}

/// Partition configuration errors. These are fatal: the caller supplied an
/// out-of-range fraction or fold count and there is nothing to recover.
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("train fraction must be strictly between 0 and 1, got {0}")]
    InvalidFraction(f64),
    #[error("fold count {k} is invalid for a training set of {n} records")]
    InvalidFoldCount { k: usize, n: usize },
}

#[derive(Error, Debug)]
pub enum EvalError {
    /// A strategy failed to fit one fold or grid cell. Non-fatal: the cell is
    /// excluded from that strategy's aggregate.
    #[error("strategy '{strategy}' failed to fit: {reason}")]
    StrategyFit { strategy: String, reason: String },
    /// Every fold failed for this strategy, so it has no cross-validated
    /// result at all.
    #[error("strategy '{strategy}' failed on all {folds} folds")]
    AllFoldsFailed { strategy: String, folds: usize },
    #[error("no strategy produced a usable cross-validated result")]
    AllStrategiesFailed,
}
