/// Structured logging for the wind model pipeline
///
/// Every line is tagged with the pipeline stage that emitted it and, where
/// relevant, the site or scenario it concerns. Output goes to the console
/// and, optionally, to an append-only log file for batch runs.

use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt as subscriber_fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::model::{ModelError, Stage};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl LogLevel {
    /// Parses `debug`, `info`, `warn`/`warning` or `error`, any case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Input traces or files violate a precondition (alignment, coverage, format)
    InputData,
    /// Input was accepted but an estimator could not produce a usable result
    Numerical,
    /// Programming error inside the crate, e.g. an index past the end of a series
    Internal,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::InputData => write!(f, "INPUT"),
            FailureType::Numerical => write!(f, "NUMERICAL"),
            FailureType::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Classify a pipeline failure
pub fn classify_failure(err: &ModelError) -> FailureType {
    match err {
        ModelError::IndexOutOfRange { .. } => FailureType::Internal,
        ModelError::ZeroClimatology { .. }
        | ModelError::InsufficientData { .. }
        | ModelError::FitConvergenceFailure { .. } => FailureType::Numerical,
        ModelError::InvalidCapacity { .. }
        | ModelError::LengthMismatch { .. }
        | ModelError::MisalignedInput { .. }
        | ModelError::EmptyInput { .. }
        | ModelError::EmptyBucket { .. }
        | ModelError::OutOfRangeValue { .. }
        | ModelError::MalformedRecord { .. }
        | ModelError::Io { .. } => FailureType::InputData,
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Initialize the global logger
///
/// Console output goes to stderr. With `log_file` set, the same events are
/// appended there without ANSI colours. Calling this a second time keeps
/// the first subscriber and logs a warning through it.
pub fn init_logger(
    min_level: LogLevel,
    log_file: Option<&str>,
    console_timestamps: bool,
) -> std::io::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                subscriber_fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let timed_console = console_timestamps.then(|| {
        subscriber_fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let plain_console = (!console_timestamps).then(|| {
        subscriber_fmt::layer()
            .without_time()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let installed = tracing_subscriber::registry()
        .with(LevelFilter::from(min_level))
        .with(timed_console)
        .with(plain_console)
        .with(file_layer)
        .try_init();
    if let Err(e) = installed {
        warn(
            Stage::System,
            None,
            &format!("logger already initialized, keeping existing subscriber: {}", e),
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(stage: Stage, subject: Option<&str>, message: &str) {
    tracing::info!(stage = %stage, subject = subject.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(stage: Stage, subject: Option<&str>, message: &str) {
    tracing::warn!(stage = %stage, subject = subject.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(stage: Stage, subject: Option<&str>, message: &str) {
    tracing::error!(stage = %stage, subject = subject.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(stage: Stage, subject: Option<&str>, message: &str) {
    tracing::debug!(stage = %stage, subject = subject.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a pipeline failure with its stage and classification
pub fn log_stage_failure(subject: Option<&str>, err: &ModelError) {
    let stage = err.stage().unwrap_or(Stage::System);
    let failure_type = classify_failure(err);
    let message = format!("stage failed [{}]: {}", failure_type, err);

    match failure_type {
        FailureType::Numerical => warn(stage, subject, &message),
        FailureType::InputData | FailureType::Internal => error(stage, subject, &message),
    }
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of scenario runs
pub fn log_run_summary(total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Calibration complete: {}/{} scenarios successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(Stage::System, None, &message);
    } else if successful == 0 {
        error(Stage::System, None, &message);
    } else {
        warn(Stage::System, None, &message);
    }
}
