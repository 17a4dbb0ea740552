/// Core data types for the regional wind model.
///
/// This module defines the shared domain model imported by all other modules:
/// samples and time series, the season/hour cell used by the climatology,
/// fitted Weibull parameters and the crate-wide error type.
/// It contains no logic beyond accessors, and no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Table dimensions
// ---------------------------------------------------------------------------

/// Number of seasons in the climatology table.
pub const SEASON_COUNT: usize = 4;

/// Number of hour-of-day slots in the climatology table.
pub const HOURS_PER_DAY: usize = 24;

// ---------------------------------------------------------------------------
// Samples and series
// ---------------------------------------------------------------------------

/// A single measurement. Timestamps are UTC from ingestion onwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(time: DateTime<Utc>, value: f64) -> Self {
        Self { time, value }
    }
}

/// Append-only, ordered sequence of samples.
///
/// Insertion order is treated as chronological order. Nothing here checks
/// that timestamps are non-decreasing; the hourly resample relies on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    samples: Vec<Sample>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, time: DateTime<Utc>, value: f64) {
        self.samples.push(Sample::new(time, value));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp at `index`, or `IndexOutOfRange`.
    pub fn time(&self, index: usize) -> Result<DateTime<Utc>, ModelError> {
        self.sample(index).map(|s| s.time)
    }

    /// Value at `index`, or `IndexOutOfRange`.
    pub fn value(&self, index: usize) -> Result<f64, ModelError> {
        self.sample(index).map(|s| s.value)
    }

    pub fn sample(&self, index: usize) -> Result<Sample, ModelError> {
        self.samples
            .get(index)
            .copied()
            .ok_or(ModelError::IndexOutOfRange {
                index,
                len: self.samples.len(),
            })
    }

    /// Dense copy of the values in series order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }
}

impl FromIterator<Sample> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<(DateTime<Utc>, f64)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, f64)>>(iter: I) -> Self {
        iter.into_iter().map(|(t, v)| Sample::new(t, v)).collect()
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

// ---------------------------------------------------------------------------
// Climatology cells
// ---------------------------------------------------------------------------

/// Astronomical-ish seasons, evaluated on UTC calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; SEASON_COUNT] =
        [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    /// Row of this season in the climatology table.
    pub fn index(self) -> usize {
        match self {
            Season::Spring => 0,
            Season::Summer => 1,
            Season::Fall => 2,
            Season::Winter => 3,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Spring => write!(f, "spring"),
            Season::Summer => write!(f, "summer"),
            Season::Fall => write!(f, "fall"),
            Season::Winter => write!(f, "winter"),
        }
    }
}

/// One (season, hour-of-day) cell of the climatology table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub season: Season,
    /// Hour of day, 0..=23.
    pub hour: u32,
}

// ---------------------------------------------------------------------------
// Fitted distribution
// ---------------------------------------------------------------------------

/// Two-parameter Weibull distribution, shape `k` and scale `lambda`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeibullParams {
    pub shape: f64,
    pub scale: f64,
}

/// The two independent estimators exposed by the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMethod {
    MaximumLikelihood,
    LogLogRegression,
}

impl fmt::Display for FitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitMethod::MaximumLikelihood => write!(f, "maximum likelihood"),
            FitMethod::LogLogRegression => write!(f, "log-log regression"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// Pipeline stage, used to tag log lines and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Ingest,
    Scale,
    Sum,
    Resample,
    Climatology,
    Normalize,
    FitMle,
    FitRegression,
    Simulate,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ingest => write!(f, "INGEST"),
            Stage::Scale => write!(f, "SCALE"),
            Stage::Sum => write!(f, "SUM"),
            Stage::Resample => write!(f, "HOURLY"),
            Stage::Climatology => write!(f, "CLIM"),
            Stage::Normalize => write!(f, "NORM"),
            Stage::FitMle => write!(f, "MLE"),
            Stage::FitRegression => write!(f, "REGR"),
            Stage::Simulate => write!(f, "SIM"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

impl From<FitMethod> for Stage {
    fn from(method: FitMethod) -> Self {
        match method {
            FitMethod::MaximumLikelihood => Stage::FitMle,
            FitMethod::LogLogRegression => Stage::FitRegression,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by any stage of the calibration pipeline.
///
/// None of these are recovered with a default value; a failed stage halts
/// the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("index {index} out of range for series of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid capacity: current {current} MW, target {target} MW")]
    InvalidCapacity { current: f64, target: f64 },

    #[error("series {series} has {found} samples, expected {expected}")]
    LengthMismatch {
        series: usize,
        expected: usize,
        found: usize,
    },

    #[error("series {series} misaligned at position {position}: expected {expected}, found {found}")]
    MisalignedInput {
        series: usize,
        position: usize,
        expected: DateTime<Utc>,
        found: DateTime<Utc>,
    },

    #[error("no input samples for stage {stage}")]
    EmptyInput { stage: Stage },

    #[error("{stage}: no samples in climatology cell {season} hour {hour}")]
    EmptyBucket {
        stage: Stage,
        season: Season,
        hour: u32,
    },

    #[error("climatology mean is zero for {season} hour {hour}")]
    ZeroClimatology { season: Season, hour: u32 },

    #[error("{method}: sample {index} = {value} outside [0, {upper}]")]
    OutOfRangeValue {
        method: FitMethod,
        index: usize,
        value: f64,
        upper: f64,
    },

    #[error("{method}: need at least {needed} usable points, found {found}")]
    InsufficientData {
        method: FitMethod,
        needed: usize,
        found: usize,
    },

    #[error("{method} did not converge after {iterations} iterations: {reason}")]
    FitConvergenceFailure {
        method: FitMethod,
        iterations: usize,
        reason: String,
    },

    #[error("malformed record in {file} line {line}: {reason}")]
    MalformedRecord {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl ModelError {
    /// The pipeline stage that produced this error, if it belongs to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ModelError::IndexOutOfRange { .. } => None,
            ModelError::InvalidCapacity { .. } => Some(Stage::Scale),
            ModelError::LengthMismatch { .. } | ModelError::MisalignedInput { .. } => {
                Some(Stage::Sum)
            }
            ModelError::EmptyInput { stage } | ModelError::EmptyBucket { stage, .. } => {
                Some(*stage)
            }
            ModelError::ZeroClimatology { .. } => Some(Stage::Normalize),
            ModelError::OutOfRangeValue { method, .. }
            | ModelError::InsufficientData { method, .. }
            | ModelError::FitConvergenceFailure { method, .. } => Some(Stage::from(*method)),
            ModelError::MalformedRecord { .. } | ModelError::Io { .. } => Some(Stage::Ingest),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_series_preserves_insertion_order() {
        let mut series = TimeSeries::new();
        series.push(t(0), 1.5);
        series.push(t(1), 2.5);
        series.push(t(2), 0.5);

        assert_eq!(series.len(), 3);
        assert_eq!(series.values(), vec![1.5, 2.5, 0.5]);
        assert_eq!(series.time(1).unwrap(), t(1));
        assert_eq!(series.value(2).unwrap(), 0.5);
    }

    #[test]
    fn test_index_past_end_is_out_of_range() {
        let series: TimeSeries = vec![(t(0), 1.0)].into_iter().collect();
        assert_eq!(
            series.value(1),
            Err(ModelError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert!(TimeSeries::new().time(0).is_err(), "empty series has no index 0");
    }

    #[test]
    fn test_season_indices_cover_table_rows() {
        let rows: Vec<usize> = Season::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(rows, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_errors_report_their_stage() {
        let misaligned = ModelError::MisalignedInput {
            series: 2,
            position: 7,
            expected: t(7),
            found: t(8),
        };
        assert_eq!(misaligned.stage(), Some(Stage::Sum));

        let diverged = ModelError::FitConvergenceFailure {
            method: FitMethod::MaximumLikelihood,
            iterations: 10,
            reason: "flat likelihood".to_string(),
        };
        assert_eq!(diverged.stage(), Some(Stage::FitMle));

        let empty = ModelError::EmptyBucket {
            stage: Stage::Normalize,
            season: Season::Winter,
            hour: 3,
        };
        assert_eq!(empty.stage(), Some(Stage::Normalize));
        assert!(empty.to_string().contains("winter hour 3"));
    }
}
