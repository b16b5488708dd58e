//! End-to-end runs over synthetic raw observation files.

use std::fs;
use std::path::PathBuf;

use buoy_pipeline::clean::clean;
use buoy_pipeline::config::{CleanConfig, PipelineConfig};
use buoy_pipeline::evaluate::{evaluate_all, final_report};
use buoy_pipeline::ingest::read_observations;
use buoy_pipeline::models::DailyRecord;
use buoy_pipeline::split::{make_folds, split};
use buoy_pipeline::strategies::default_strategies;

fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("buoy_pipeline_{}", name))
}

/// One observation row in the fixed 18-column layout:
/// YY MM DD hh mm WDIR WSPD GST WVHT DPD APD MWD PRES ATMP WTMP DEWP VIS TIDE
fn row(month: u32, day: u32, wave_height: f64, water_temp_c: f64) -> String {
    format!(
        "2023 {:02} {:02} 12 00 210 6.5 8.0 {} 9.0 6.2 195 1014.0 {} {} 15.0 99.0 99.00",
        month,
        day,
        wave_height,
        water_temp_c + 2.0, // air runs a couple degrees above water here
        water_temp_c,
    )
}

#[test]
fn ten_day_file_with_sentinels_and_bad_month_yields_seven_days() {
    let mut lines = vec![
        "#YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP  VIS  TIDE".to_string(),
        "#yr  mo dy hr mn degT m/s  m/s     m   sec   sec degT   hPa  degC  degC  degC  nmi    ft".to_string(),
    ];
    for day in 1..=7 {
        lines.push(row(6, day, 1.4, 10.0 + day as f64 * 2.0));
    }
    lines.push(row(6, 8, 99.0, 20.0)); // wave-height sentinel
    lines.push(row(6, 9, 99.0, 21.0)); // wave-height sentinel
    lines.push(row(13, 10, 1.2, 22.0)); // month 13 is no calendar date

    let path = scratch_file("ten_day.txt");
    fs::write(&path, lines.join("\n")).unwrap();

    let ingested = read_observations(&path).unwrap();
    fs::remove_file(&path).ok();
    assert_eq!(ingested.rows.len(), 10);
    assert_eq!(ingested.malformed, 0);

    let outcome = clean(&ingested.rows, &CleanConfig::default());
    assert_eq!(outcome.days.len(), 7);
    assert_eq!(outcome.counts.sentinel, 2);
    assert_eq!(outcome.counts.invalid_timestamp, 1);
    assert_eq!(outcome.counts.kept, 7);
    assert_eq!(outcome.counts.raw_total(), 10);

    // Celsius inputs in [0, 27) must land in [32, 80) Fahrenheit.
    for record in &outcome.days {
        assert!(
            record.water_temp >= 32.0 && record.water_temp < 80.0,
            "water temp {} out of range on {}",
            record.water_temp,
            record.date
        );
    }
}

#[test]
fn comma_delimited_input_parses_the_same_rows() {
    let mut lines = vec!["#YY,MM,DD,hh,mm,WDIR,WSPD,GST,WVHT,DPD,APD,MWD,PRES,ATMP,WTMP,DEWP,VIS,TIDE".to_string()];
    for day in 1..=5 {
        lines.push(row(7, day, 1.1, 18.0).split_whitespace().collect::<Vec<_>>().join(","));
    }
    lines.push("2023,07,06,12".to_string()); // truncated row

    let path = scratch_file("comma.csv");
    fs::write(&path, lines.join("\n")).unwrap();
    let ingested = read_observations(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(ingested.rows.len(), 5);
    assert_eq!(ingested.malformed, 1);
}

fn synthetic_year() -> Vec<DailyRecord> {
    // A year of plausible daily aggregates where water temperature follows
    // the air temperature with some deterministic wobble.
    (0..120)
        .map(|i| {
            let x = i as f64;
            let air = 55.0 + 18.0 * (x / 120.0 * std::f64::consts::PI).sin() + (x * 0.7).sin();
            DailyRecord {
                date: chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                    + chrono::Duration::days(i),
                wind_dir: (x * 13.7) % 360.0,
                wind_spd: 8.0 + 4.0 * (x * 0.3).sin(),
                wave_height: 3.5 + 1.5 * (x * 0.21).cos(),
                dominant_period: 8.0 + 2.0 * (x * 0.11).sin(),
                wave_dir: (x * 23.9) % 360.0,
                air_temp: air,
                water_temp: 0.85 * air + 6.0 + 0.5 * (x * 0.5).cos(),
            }
        })
        .collect()
}

#[test]
fn harness_ranks_strategies_and_reports_on_the_held_out_set() {
    let config = PipelineConfig::default();
    let days = synthetic_year();

    let (train, test) = split(&days, config.harness.train_fraction, config.harness.seed).unwrap();
    let folds = make_folds(&train, config.harness.folds, config.harness.seed).unwrap();

    let strategies = default_strategies();
    let ranking = evaluate_all(&strategies, &folds, config.harness.seed).unwrap();
    assert!(!ranking.is_empty());
    assert!(ranking
        .windows(2)
        .all(|w| w[0].cv.rmse_mean <= w[1].cv.rmse_mean));

    let winner = &ranking[0];
    let strategy = strategies
        .iter()
        .find(|s| s.name() == winner.strategy)
        .unwrap();
    let metrics = final_report(
        strategy.as_ref(),
        &winner.params,
        &train,
        &test,
        config.harness.seed,
    )
    .unwrap();

    assert!(metrics.rmse.is_finite() && metrics.rmse >= 0.0);
    assert!(metrics.mae.is_finite() && metrics.mae >= 0.0);
    // The target is nearly a linear function of air temperature, so the
    // winner should explain most of the held-out variance.
    assert!(metrics.r2 > 0.5, "winner R2 was {}", metrics.r2);
}

#[test]
fn whole_run_is_reproducible_for_a_fixed_seed() {
    let days = synthetic_year();
    let strategies = default_strategies();

    let run = |seed: u64| {
        let (train, _) = split(&days, 0.7, seed).unwrap();
        let folds = make_folds(&train, 5, seed).unwrap();
        evaluate_all(&strategies, &folds, seed)
            .unwrap()
            .into_iter()
            .map(|r| (r.strategy, r.cv.rmse_mean))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(1112), run(1112));
}
