//! Preprocessing pipeline: raw observations -> clean daily records.
//!
//! The stages run in a fixed order per row: timestamp synthesis, missing-cell
//! elimination, sentinel elimination; then the survivors are aggregated to
//! one record per calendar day and unit-converted. Every stage is a pure
//! function of its input plus the declared [`CleanConfig`]; nothing here
//! touches the filesystem.
//!
//! Drop-once semantics: a row removed by one rule is not re-examined by later
//! rules, so each dropped row is counted exactly once and the final kept set
//! is the same regardless of rule order (it is the complement of a union of
//! drop conditions).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::{celsius_to_fahrenheit, CleanConfig, SentinelTable, UnitTable};
use crate::errors::CleanError;
use crate::models::{CleanObservation, DailyRecord, DropCounts, RawObservation};

#[derive(Debug)]
pub struct CleanOutcome {
    pub days: Vec<DailyRecord>,
    pub counts: DropCounts,
}

/// Run the full pipeline over already-ingested rows. Malformed rows never
/// reach this function (ingest counts them); the caller folds that count into
/// the outcome for the final audit.
pub fn clean(rows: &[RawObservation], cfg: &CleanConfig) -> CleanOutcome {
    let (observations, counts) = validate(rows, &cfg.sentinels);
    let mut days = daily_means(&observations);
    convert_units(&mut days, &cfg.units);
    info!(
        raw = rows.len(),
        kept = counts.kept,
        invalid_timestamp = counts.invalid_timestamp,
        missing = counts.missing,
        sentinel = counts.sentinel,
        days = days.len(),
        "cleaning finished"
    );
    CleanOutcome { days, counts }
}

/// Per-row validation: timestamp synthesis, missing-cell check, sentinel
/// check. Returns the surviving observations (still in source units) and the
/// drop accounting for this stage.
pub fn validate(
    rows: &[RawObservation],
    sentinels: &SentinelTable,
) -> (Vec<CleanObservation>, DropCounts) {
    let mut kept = Vec::with_capacity(rows.len());
    let mut counts = DropCounts::default();

    for (idx, obs) in rows.iter().enumerate() {
        let row = idx + 1;

        // Timestamp components must all be present before synthesis; an
        // absent component is a missing cell, not an invalid date.
        let components = (obs.year, obs.month, obs.day, obs.hour, obs.minute);
        let (year, month, day, hour, minute) = match components {
            (Some(y), Some(mo), Some(d), Some(h), Some(mi)) => (y, mo, d, h, mi),
            _ => {
                counts.missing += 1;
                continue;
            }
        };
        let timestamp = match synthesize_timestamp(year, month, day, hour, minute) {
            Some(ts) => ts,
            None => {
                counts.invalid_timestamp += 1;
                warn!(
                    "{}",
                    CleanError::InvalidTimestamp {
                        row,
                        year: year as i32,
                        month: month as u32,
                        day: day as u32,
                        hour: hour as u32,
                        minute: minute as u32,
                    }
                );
                continue;
            }
        };

        // Column projection happens here: only the retained fields are
        // checked and carried forward.
        let retained = [
            obs.wind_dir,
            obs.wind_spd,
            obs.wave_height,
            obs.dominant_period,
            obs.wave_dir,
            obs.air_temp,
            obs.water_temp,
        ];
        let [wind_dir, wind_spd, wave_height, dominant_period, wave_dir, air_temp, water_temp] =
            match retained {
                [Some(a), Some(b), Some(c), Some(d), Some(e), Some(f), Some(g)] => {
                    [a, b, c, d, e, f, g]
                }
                _ => {
                    counts.missing += 1;
                    continue;
                }
            };

        // Exact-match sentinel comparison on the raw numeric value. The
        // checks are logically independent; the first hit drops the row.
        let sentinel_hit = [
            (wave_height, sentinels.wave_height),
            (wind_dir, sentinels.wind_dir),
            (wave_dir, sentinels.wave_dir),
            (wind_spd, sentinels.wind_spd),
            (air_temp, sentinels.air_temp),
            (water_temp, sentinels.water_temp),
        ]
        .iter()
        .any(|&(value, code)| value == code);
        if sentinel_hit {
            counts.sentinel += 1;
            continue;
        }

        kept.push(CleanObservation {
            timestamp,
            wind_dir,
            wind_spd,
            wave_height,
            dominant_period,
            wave_dir,
            air_temp,
            water_temp,
        });
    }

    counts.kept = kept.len();
    (kept, counts)
}

fn synthesize_timestamp(
    year: f64,
    month: f64,
    day: f64,
    hour: f64,
    minute: f64,
) -> Option<chrono::NaiveDateTime> {
    // Components must be whole numbers in representable range before chrono
    // gets to judge the calendar.
    for v in [year, month, day, hour, minute] {
        if !v.is_finite() || v.fract() != 0.0 || v < 0.0 {
            return None;
        }
    }
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, 0))
}

/// Group surviving observations by calendar day and take the arithmetic mean
/// of each retained field. Values are still in source units here. A day with
/// zero survivors contributes nothing.
pub fn daily_means(observations: &[CleanObservation]) -> Vec<DailyRecord> {
    #[derive(Default)]
    struct Accumulator {
        sums: [f64; 7],
        n: usize,
    }

    let mut by_day: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();
    for obs in observations {
        let acc = by_day.entry(obs.timestamp.date()).or_default();
        let values = [
            obs.wind_dir,
            obs.wind_spd,
            obs.wave_height,
            obs.dominant_period,
            obs.wave_dir,
            obs.air_temp,
            obs.water_temp,
        ];
        for (sum, value) in acc.sums.iter_mut().zip(values) {
            *sum += value;
        }
        acc.n += 1;
    }

    by_day
        .into_iter()
        .map(|(date, acc)| {
            let n = acc.n as f64;
            DailyRecord {
                date,
                wind_dir: acc.sums[0] / n,
                wind_spd: acc.sums[1] / n,
                wave_height: acc.sums[2] / n,
                dominant_period: acc.sums[3] / n,
                wave_dir: acc.sums[4] / n,
                air_temp: acc.sums[5] / n,
                water_temp: acc.sums[6] / n,
            }
        })
        .collect()
}

/// Apply the fixed conversion table in place: wave height m -> ft, wind
/// speed m/s -> kt, temperatures C -> F.
pub fn convert_units(days: &mut [DailyRecord], units: &UnitTable) {
    for day in days {
        day.wave_height *= units.meters_to_feet;
        day.wind_spd *= units.ms_to_knots;
        day.air_temp = celsius_to_fahrenheit(day.air_temp);
        day.water_temp = celsius_to_fahrenheit(day.water_temp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw(month: f64, day: f64, hour: f64) -> RawObservation {
        RawObservation {
            year: Some(2023.0),
            month: Some(month),
            day: Some(day),
            hour: Some(hour),
            minute: Some(0.0),
            wind_dir: Some(180.0),
            wind_spd: Some(5.0),
            gust: Some(7.0),
            wave_height: Some(1.5),
            dominant_period: Some(9.0),
            average_period: Some(6.0),
            wave_dir: Some(200.0),
            pressure: Some(1013.0),
            air_temp: Some(20.0),
            water_temp: Some(18.0),
            dewpoint: Some(15.0),
            visibility: Some(10.0),
            tide: Some(1.0),
        }
    }

    #[test]
    fn no_sentinel_survives_validation() {
        let sentinels = SentinelTable::default();
        let mut rows = vec![raw(6.0, 1.0, 0.0), raw(6.0, 1.0, 6.0)];
        rows[0].wave_height = Some(99.0);
        rows.push({
            let mut r = raw(6.0, 2.0, 0.0);
            r.wind_dir = Some(999.0);
            r
        });

        let (kept, counts) = validate(&rows, &sentinels);
        assert_eq!(counts.sentinel, 2);
        assert_eq!(counts.kept, 1);
        for obs in &kept {
            assert_ne!(obs.wave_height, sentinels.wave_height);
            assert_ne!(obs.wind_dir, sentinels.wind_dir);
            assert_ne!(obs.wind_spd, sentinels.wind_spd);
            assert_ne!(obs.air_temp, sentinels.air_temp);
            assert_ne!(obs.water_temp, sentinels.water_temp);
        }
    }

    #[test]
    fn drop_accounting_is_exact() {
        let mut rows = vec![raw(6.0, 1.0, 0.0), raw(6.0, 1.0, 1.0), raw(6.0, 2.0, 0.0)];
        rows.push(raw(13.0, 1.0, 0.0)); // month 13 is not a date
        rows.push({
            let mut r = raw(6.0, 3.0, 0.0);
            r.air_temp = None;
            r
        });
        rows.push({
            let mut r = raw(6.0, 4.0, 0.0);
            r.water_temp = Some(999.0);
            r
        });

        let (_, counts) = validate(&rows, &SentinelTable::default());
        assert_eq!(counts.invalid_timestamp, 1);
        assert_eq!(counts.missing, 1);
        assert_eq!(counts.sentinel, 1);
        assert_eq!(counts.kept, 3);
        assert_eq!(counts.raw_total(), rows.len());
    }

    #[test]
    fn row_matching_two_sentinels_is_dropped_once() {
        let mut row = raw(6.0, 1.0, 0.0);
        row.wave_height = Some(99.0);
        row.wind_dir = Some(999.0);

        let (_, counts) = validate(&[row], &SentinelTable::default());
        assert_eq!(counts.sentinel, 1);
        assert_eq!(counts.dropped_total(), 1);
    }

    #[test]
    fn missing_time_component_counts_as_missing() {
        let mut row = raw(6.0, 1.0, 0.0);
        row.minute = None;
        let (_, counts) = validate(&[row], &SentinelTable::default());
        assert_eq!(counts.missing, 1);
        assert_eq!(counts.invalid_timestamp, 0);
    }

    #[test]
    fn daily_means_average_each_field_per_day() {
        let mut a = raw(6.0, 1.0, 0.0);
        a.air_temp = Some(10.0);
        a.water_temp = Some(12.0);
        let mut b = raw(6.0, 1.0, 12.0);
        b.air_temp = Some(20.0);
        b.water_temp = Some(18.0);
        let c = raw(6.0, 2.0, 0.0);

        let (kept, _) = validate(&[a, b, c], &SentinelTable::default());
        let days = daily_means(&kept);
        assert_eq!(days.len(), 2);
        assert_relative_eq!(days[0].air_temp, 15.0);
        assert_relative_eq!(days[0].water_temp, 15.0);
        assert_relative_eq!(days[1].air_temp, 20.0);
    }

    #[test]
    fn day_with_no_survivors_produces_no_record() {
        let mut a = raw(6.0, 1.0, 0.0);
        a.wave_height = Some(99.0);
        let b = raw(6.0, 2.0, 0.0);

        let outcome = clean(&[a, b], &CleanConfig::default());
        assert_eq!(outcome.days.len(), 1);
        assert_eq!(
            outcome.days[0].date,
            NaiveDate::from_ymd_opt(2023, 6, 2).unwrap()
        );
    }

    #[test]
    fn unit_conversion_round_trips() {
        let units = UnitTable::default();
        let (kept, _) = validate(&[raw(6.0, 1.0, 0.0)], &SentinelTable::default());
        let raw_days = daily_means(&kept);
        let mut converted = raw_days.clone();
        convert_units(&mut converted, &units);

        assert_relative_eq!(
            converted[0].wave_height / units.meters_to_feet,
            raw_days[0].wave_height,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            converted[0].wind_spd / units.ms_to_knots,
            raw_days[0].wind_spd,
            epsilon = 1e-9
        );
        assert_relative_eq!(converted[0].air_temp, 20.0 * 9.0 / 5.0 + 32.0);
    }
}
