use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Number of predictor fields on a [`DailyRecord`] (everything except the
/// water temperature target).
pub const NUM_FEATURES: usize = 6;

/// One buoy reading as it appears in the source table, after numeric
/// coercion. Every cell is optional: a token that did not parse as a number
/// becomes `None` and the cleaning stage decides what to do with the row.
///
/// Fields the projection drops (visibility, tide, dewpoint, pressure, gust,
/// average period) are still carried here so that drop accounting sees the
/// row exactly as it was read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawObservation {
    pub year: Option<f64>,
    pub month: Option<f64>,
    pub day: Option<f64>,
    pub hour: Option<f64>,
    pub minute: Option<f64>,
    pub wind_dir: Option<f64>,
    pub wind_spd: Option<f64>,
    pub gust: Option<f64>,
    pub wave_height: Option<f64>,
    pub dominant_period: Option<f64>,
    pub average_period: Option<f64>,
    pub wave_dir: Option<f64>,
    pub pressure: Option<f64>,
    pub air_temp: Option<f64>,
    pub water_temp: Option<f64>,
    pub dewpoint: Option<f64>,
    pub visibility: Option<f64>,
    pub tide: Option<f64>,
}

/// A validated observation: projected down to the retained columns, with the
/// time components combined into one timestamp. No sentinel value survives
/// into this type.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanObservation {
    pub timestamp: NaiveDateTime,
    pub wind_dir: f64,
    pub wind_spd: f64,
    pub wave_height: f64,
    pub dominant_period: f64,
    pub wave_dir: f64,
    pub air_temp: f64,
    pub water_temp: f64,
}

/// One calendar day: the arithmetic mean of each retained field across the
/// day's surviving observations. Produced first in raw source units, then
/// unit-converted in place (wave height m -> ft, wind speed m/s -> kt,
/// temperatures C -> F).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub wind_dir: f64,
    pub wind_spd: f64,
    pub wave_height: f64,
    pub dominant_period: f64,
    pub wave_dir: f64,
    pub air_temp: f64,
    pub water_temp: f64,
}

impl DailyRecord {
    /// Predictor vector for the regression strategies, in declaration order.
    pub fn features(&self) -> [f64; NUM_FEATURES] {
        [
            self.wind_dir,
            self.wind_spd,
            self.wave_height,
            self.dominant_period,
            self.wave_dir,
            self.air_temp,
        ]
    }

    /// Regression target: daily mean water temperature.
    pub fn target(&self) -> f64 {
        self.water_temp
    }
}

/// Audit trail of rows removed during ingest + cleaning. A row is counted
/// exactly once, under the first rule that removed it, so the counts always
/// satisfy `raw_rows = kept + dropped_total()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    /// Structurally unreadable rows (wrong column count, unparseable line).
    pub malformed: usize,
    /// Time components present but not a valid calendar date/time.
    pub invalid_timestamp: usize,
    /// A retained cell was absent or failed numeric coercion.
    pub missing: usize,
    /// A retained cell matched its configured sentinel value.
    pub sentinel: usize,
    /// Rows that survived every filter.
    pub kept: usize,
}

impl DropCounts {
    pub fn dropped_total(&self) -> usize {
        self.malformed + self.invalid_timestamp + self.missing + self.sentinel
    }

    pub fn raw_total(&self) -> usize {
        self.kept + self.dropped_total()
    }
}
