//! Reads the raw buoy observation table into memory.
//!
//! The source format is positional: 18 columns in a fixed order, either
//! whitespace- or comma-delimited, with optional `#`-prefixed header lines.
//! Structurally unreadable rows are dropped and counted, never fatal.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::errors::{CleanError, IngestError};
use crate::models::RawObservation;

/// Fixed column layout of the source table:
/// YY MM DD hh mm WDIR WSPD GST WVHT DPD APD MWD PRES ATMP WTMP DEWP VIS TIDE
pub const FIELD_COUNT: usize = 18;

#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub rows: Vec<RawObservation>,
    /// Rows that were structurally unreadable (wrong column count).
    pub malformed: usize,
}

/// Read every observation row from `path`. Header lines (leading `#`, or a
/// first line whose leading token is not numeric) are skipped. The delimiter
/// is sniffed from the first data line.
pub fn read_observations(path: &Path) -> Result<IngestOutcome, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        lines.push(line);
    }

    let comma_delimited = lines
        .iter()
        .find(|l| is_data_line(l))
        .map(|l| l.contains(','))
        .ok_or_else(|| IngestError::Empty {
            path: path.to_path_buf(),
        })?;

    let outcome = if comma_delimited {
        read_delimited(path)?
    } else {
        read_whitespace(&lines)
    };

    debug!(
        rows = outcome.rows.len(),
        malformed = outcome.malformed,
        "finished reading {}",
        path.display()
    );

    if outcome.rows.is_empty() && outcome.malformed == 0 {
        return Err(IngestError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(outcome)
}

/// A line carries data if it is non-empty, not a `#` comment, and its first
/// token starts with a digit (header rows start with column names).
fn is_data_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return false;
    }
    trimmed
        .split([',', ' ', '\t'])
        .next()
        .map(|tok| tok.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

fn read_whitespace(lines: &[String]) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    for (idx, line) in lines.iter().enumerate() {
        if !is_data_line(line) {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        push_row(&mut outcome, &tokens, idx + 1);
    }
    outcome
}

fn read_delimited(path: &Path) -> Result<IngestOutcome, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(file);

    let mut outcome = IngestOutcome::default();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                let joined = record.iter().collect::<Vec<_>>().join(",");
                if !is_data_line(&joined) {
                    continue;
                }
                let tokens: Vec<&str> = record.iter().map(str::trim).collect();
                push_row(&mut outcome, &tokens, idx + 1);
            }
            Err(err) => {
                warn!(row = idx + 1, "unreadable CSV record: {}", err);
                outcome.malformed += 1;
            }
        }
    }
    Ok(outcome)
}

fn push_row(outcome: &mut IngestOutcome, tokens: &[&str], row: usize) {
    match RawObservation::from_tokens(tokens) {
        Ok(obs) => outcome.rows.push(obs),
        Err(reason) => {
            warn!("dropping {}", CleanError::MalformedRecord { row, reason });
            outcome.malformed += 1;
        }
    }
}

impl RawObservation {
    /// Build a raw observation from one row of positional tokens. Cells that
    /// fail numeric coercion become `None`; only a wrong column count makes
    /// the row itself malformed.
    pub fn from_tokens(tokens: &[&str]) -> Result<Self, String> {
        if tokens.len() != FIELD_COUNT {
            return Err(format!(
                "expected {} columns, found {}",
                FIELD_COUNT,
                tokens.len()
            ));
        }
        let num = |i: usize| tokens[i].parse::<f64>().ok();
        Ok(Self {
            year: num(0),
            month: num(1),
            day: num(2),
            hour: num(3),
            minute: num(4),
            wind_dir: num(5),
            wind_spd: num(6),
            gust: num(7),
            wave_height: num(8),
            dominant_period: num(9),
            average_period: num(10),
            wave_dir: num(11),
            pressure: num(12),
            air_temp: num(13),
            water_temp: num(14),
            dewpoint: num(15),
            visibility: num(16),
            tide: num(17),
        })
    }
}
