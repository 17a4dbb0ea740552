/// NREL wind measurement file reader.
///
/// Each measurement file holds one site's 10-minute trace as comma
/// separated rows:
///
/// `timestamp, wind speed, rated power, score (light), corrected score`
///
/// Timestamps look like `2006-01-01 00:10:00` and are taken as UTC. The
/// first line is a header; any further line starting with `D` is a repeated
/// header or footer and is skipped, as are blank lines. Any other row that
/// cannot be parsed stops the read with `MalformedRecord`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::model::{ModelError, TimeSeries};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FIELD_COUNT: usize = 5;

// ============================================================================
// Records
// ============================================================================

/// Numeric column to keep as the trace value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NrelField {
    WindSpeed,
    RatedPower,
    ScoreLight,
    #[default]
    CorrectedScore,
}

/// One parsed row of an NREL measurement file.
#[derive(Debug, Clone, PartialEq)]
pub struct NrelRecord {
    pub timestamp: DateTime<Utc>,
    pub wind_speed: f64,
    pub rated_power: f64,
    pub score_light: f64,
    pub corrected_score: f64,
}

impl NrelRecord {
    pub fn field(&self, field: NrelField) -> f64 {
        match field {
            NrelField::WindSpeed => self.wind_speed,
            NrelField::RatedPower => self.rated_power,
            NrelField::ScoreLight => self.score_light,
            NrelField::CorrectedScore => self.corrected_score,
        }
    }
}

// ============================================================================
// Reading
// ============================================================================

/// Reads a measurement file and returns the designated column as a trace.
pub fn read_trace(path: &Path, field: NrelField) -> Result<TimeSeries, ModelError> {
    let text = fs::read_to_string(path).map_err(|e| ModelError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_csv(&text, &path.display().to_string(), field)
}

/// Parses the text of a measurement file. `file` is only used in errors.
pub fn parse_csv(text: &str, file: &str, field: NrelField) -> Result<TimeSeries, ModelError> {
    let mut trace = TimeSeries::new();

    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if i == 0 || trimmed.is_empty() || trimmed.starts_with('D') {
            continue; // Skip header, footer or empty lines
        }

        let record = parse_record(trimmed).map_err(|reason| ModelError::MalformedRecord {
            file: file.to_string(),
            line: i + 1,
            reason,
        })?;
        trace.push(record.timestamp, record.field(field));
    }

    Ok(trace)
}

/// Parses one data row.
pub fn parse_record(line: &str) -> Result<NrelRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < FIELD_COUNT {
        return Err(format!(
            "expected {} fields, found {}",
            FIELD_COUNT,
            fields.len()
        ));
    }

    let timestamp = NaiveDateTime::parse_from_str(fields[0], TIMESTAMP_FORMAT)
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
        .map_err(|e| format!("bad timestamp '{}': {}", fields[0], e))?;

    let number = |index: usize, name: &str| -> Result<f64, String> {
        fields[index]
            .parse::<f64>()
            .map_err(|_| format!("bad {} '{}'", name, fields[index]))
    };

    Ok(NrelRecord {
        timestamp,
        wind_speed: number(1, "wind speed")?,
        rated_power: number(2, "rated power")?,
        score_light: number(3, "score light")?,
        corrected_score: number(4, "corrected score")?,
    })
}

// ============================================================================
// Tests
// ============================================================================
