/// Integration tests for the calibration pipeline
///
/// Tests verify:
/// 1. Scale, sum, resample, climatology and normalization on synthetic traces
/// 2. Weibull recovery by both estimators on a seeded sample
/// 3. Failures halt the run and name the stage that raised them
///
/// Run with: cargo test --test pipeline_integration

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use wind_model::analysis::aggregate::{hourly_mean, sum_traces};
use wind_model::analysis::climatology::{ClimatologyTable, classify, normalize};
use wind_model::analysis::fitting::{FitSettings, fit_mle, fit_regression};
use wind_model::analysis::scaling::scale_trace;
use wind_model::model::{Cell, FitMethod, ModelError, Season, Stage, TimeSeries, WeibullParams};
use wind_model::pipeline::{CalibrationSettings, SiteInput, WindModel};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2006, 7, 1, 0, 0, 0).unwrap()
}

fn constant_hourly(value: f64, hours: i64) -> TimeSeries {
    (0..hours).map(|h| (start() + Duration::hours(h), value)).collect()
}

fn site(name: &str, trace: TimeSeries) -> SiteInput {
    SiteInput {
        name: name.to_string(),
        trace,
        current_mw: 30.0,
        target_mw: 30.0,
    }
}

// ---------------------------------------------------------------------------
// Stage by stage
// ---------------------------------------------------------------------------

#[test]
fn test_three_constant_sites_normalize_to_one() {
    let a = constant_hourly(10.0, 48);
    let b = constant_hourly(20.0, 48);
    let c = constant_hourly(30.0, 48);

    let total = sum_traces(&[&a, &b, &c]).unwrap();
    assert_eq!(total.len(), 48);
    assert!(total.iter().all(|s| s.value == 60.0), "summed trace is constant 60");

    let hourly = hourly_mean(&total).unwrap();
    assert_eq!(hourly, total, "already hourly, resample is the identity");

    let table = ClimatologyTable::estimate(&hourly).unwrap();
    for hour in 0..24 {
        let cell = Cell { season: Season::Summer, hour };
        assert_eq!(table.count(cell), 2, "two days per hour");
        assert_eq!(table.mean(cell), Some(60.0));
    }
    assert_eq!(table.mean(Cell { season: Season::Winter, hour: 0 }), None);

    let normalized = normalize(&hourly, &table).unwrap();
    assert_eq!(normalized.len(), 48);
    assert!(normalized.iter().all(|s| s.value == 1.0), "normalized trace is all 1.0");
}

#[test]
fn test_scaled_sites_sum_like_capacity() {
    let raw = constant_hourly(12.0, 24);
    let tehachapi = scale_trace(&raw, 30.0, 722.0).unwrap();
    let monterey = scale_trace(&raw, 30.0, 0.0).unwrap();

    let total = sum_traces(&[&tehachapi, &monterey]).unwrap();
    let expected = 12.0 * 722.0 / 30.0;
    assert!(total.iter().all(|s| (s.value - expected).abs() < 1e-9));
}

#[test]
fn test_ten_minute_trace_resamples_to_hours() {
    let trace: TimeSeries = (0..6 * 24)
        .map(|i| (start() + Duration::minutes(10 * i), (i % 6) as f64))
        .collect();

    let hourly = hourly_mean(&trace).unwrap();
    assert_eq!(hourly.len(), 24);
    assert!(hourly.iter().all(|s| s.value == 2.5), "mean of 0..=5");
    assert_eq!(classify(hourly.time(13).unwrap()).hour, 13);
}

// ---------------------------------------------------------------------------
// Distribution fitting
// ---------------------------------------------------------------------------

#[test]
fn test_both_estimators_recover_known_weibull() {
    let truth = WeibullParams::new(2.0, 1.0);
    let mut rng = StdRng::seed_from_u64(42);
    let sample = truth.sample_n(&mut rng, 10_000);
    let settings = FitSettings::default();

    let mle = fit_mle(&sample, &settings).unwrap();
    let regression = fit_regression(&sample, &settings).unwrap();

    for (name, fit) in [("mle", mle), ("regression", regression)] {
        assert!((fit.shape - 2.0).abs() < 0.2, "{} shape {}", name, fit.shape);
        assert!((fit.scale - 1.0).abs() < 0.1, "{} scale {}", name, fit.scale);
    }
}

#[test]
fn test_constant_normalized_trace_halts_at_mle() {
    let sites = vec![
        site("tehachapi", constant_hourly(10.0, 48)),
        site("solano", constant_hourly(20.0, 48)),
        site("altamont", constant_hourly(30.0, 48)),
    ];
    let settings = CalibrationSettings {
        require_full_coverage: false,
        ..CalibrationSettings::default()
    };

    let err = WindModel::calibrate("now", &sites, &settings).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::FitMle));
    assert!(matches!(
        err,
        ModelError::FitConvergenceFailure { method: FitMethod::MaximumLikelihood, .. }
    ));
}

// ---------------------------------------------------------------------------
// Failure reporting
// ---------------------------------------------------------------------------

#[test]
fn test_misaligned_site_is_reported_at_sum() {
    let shifted: TimeSeries = constant_hourly(5.0, 48)
        .iter()
        .map(|s| (s.time + Duration::minutes(10), s.value))
        .collect();
    let sites = vec![
        site("tehachapi", constant_hourly(5.0, 48)),
        site("clark", shifted),
    ];

    let err = WindModel::calibrate("deep", &sites, &CalibrationSettings::default()).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Sum));
    assert_eq!(
        err,
        ModelError::MisalignedInput {
            series: 1,
            position: 0,
            expected: start(),
            found: start() + Duration::minutes(10),
        }
    );
}

#[test]
fn test_short_record_halts_at_climatology() {
    let sites = vec![site("humboldt", constant_hourly(5.0, 48))];
    let err = WindModel::calibrate("deep", &sites, &CalibrationSettings::default()).unwrap_err();
    assert_eq!(
        err,
        ModelError::EmptyBucket { stage: Stage::Climatology, season: Season::Spring, hour: 0 }
    );
}

// ---------------------------------------------------------------------------
// Calm hours and megawatt-scale output
// ---------------------------------------------------------------------------

/// A year of 10-minute output from 2006-01-01 with a diurnal cycle and
/// Weibull noise, with every sample in the hour starting at `calm` set to 0.
fn year_with_calm_hour(seed: u64, calm: DateTime<Utc>) -> TimeSeries {
    let noise = WeibullParams::new(2.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let first = Utc.with_ymd_and_hms(2006, 1, 1, 0, 0, 0).unwrap();
    (0..365 * 24 * 6)
        .map(|i| {
            let t = first + Duration::minutes(10 * i);
            let diurnal = 1.0 + 0.5 * ((i / 6 % 24) as f64 / 24.0);
            let value = noise.sample(&mut rng).max(1e-3) * 20.0 * diurnal;
            let in_calm = t >= calm && t < calm + Duration::hours(1);
            (t, if in_calm { 0.0 } else { value })
        })
        .collect()
}

#[test]
fn test_calm_hour_does_not_halt_calibration() {
    let calm = Utc.with_ymd_and_hms(2006, 2, 1, 0, 0, 0).unwrap();
    let sites = vec![SiteInput {
        name: "tehachapi".to_string(),
        trace: year_with_calm_hour(21, calm),
        current_mw: 30.0,
        target_mw: 6459.0,
    }];

    let model = WindModel::calibrate("deep", &sites, &CalibrationSettings::default()).unwrap();
    let calm_index = 31 * 24;
    assert_eq!(model.hourly.time(calm_index).unwrap(), calm);
    assert_eq!(model.hourly.value(calm_index).unwrap(), 0.0);
    assert_eq!(model.normalized.value(calm_index).unwrap(), 0.0);
    assert!(model.mle.shape > 0.0 && model.mle.scale > 0.0);
    assert!(model.regression.shape > 0.0 && model.regression.scale > 0.0);
}

#[test]
fn test_estimators_accept_megawatt_scale_samples() {
    let truth = WeibullParams::new(2.0, 50_000.0);
    let sample = truth.sample_n(&mut StdRng::seed_from_u64(42), 10_000);
    let settings = FitSettings::default();

    let regression = fit_regression(&sample, &settings).unwrap();
    let mle = fit_mle(&sample, &settings).unwrap();
    for (name, fit) in [("mle", mle), ("regression", regression)] {
        assert!((fit.shape - 2.0).abs() < 0.2, "{} shape {}", name, fit.shape);
        assert!((fit.scale - 50_000.0).abs() < 5_000.0, "{} scale {}", name, fit.scale);
    }
}
