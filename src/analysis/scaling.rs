/// Capacity scaling of a single site's measurement trace.
///
/// A measurement trace describes what a fixed amount of installed capacity
/// produced. Scaling it by `target / current` gives the output a
/// hypothetical installed capacity would have produced at that site.

use crate::model::{ModelError, TimeSeries};

/// A site's trace scaled to a target installed capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteTrace {
    pub name: String,
    /// Installed capacity the trace now represents, in MW.
    pub capacity_mw: f64,
    pub trace: TimeSeries,
}

impl SiteTrace {
    /// Scales `source` from `current_mw` to `target_mw` and tags the result.
    pub fn scaled(
        name: &str,
        source: &TimeSeries,
        current_mw: f64,
        target_mw: f64,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            name: name.to_string(),
            capacity_mw: target_mw,
            trace: scale_trace(source, current_mw, target_mw)?,
        })
    }
}

/// Returns a new series with the same timestamps and every value multiplied
/// by `target / current`. The input is left untouched.
///
/// A current capacity of zero is only accepted for an empty trace, where the
/// factor is never applied. Negative or non-finite capacities are rejected.
pub fn scale_trace(
    source: &TimeSeries,
    current_mw: f64,
    target_mw: f64,
) -> Result<TimeSeries, ModelError> {
    let invalid = ModelError::InvalidCapacity {
        current: current_mw,
        target: target_mw,
    };
    if !current_mw.is_finite() || !target_mw.is_finite() || current_mw < 0.0 || target_mw < 0.0 {
        return Err(invalid);
    }
    if source.is_empty() {
        return Ok(TimeSeries::new());
    }
    if current_mw == 0.0 {
        return Err(invalid);
    }

    let factor = target_mw / current_mw;
    Ok(source
        .iter()
        .map(|s| (s.time, s.value * factor))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
