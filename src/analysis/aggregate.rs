/// Aggregation of site traces into one regional trace.
///
/// Two steps, always in this order:
/// - `sum_traces` adds co-sampled site traces position by position.
/// - `hourly_mean` averages the summed trace over one-hour buckets.
///
/// Neither step resamples or interpolates to repair its input.

use chrono::{DateTime, Duration, Utc};

use crate::model::{ModelError, Stage, TimeSeries};

// ---------------------------------------------------------------------------
// Sum across sites
// ---------------------------------------------------------------------------

/// Sums co-sampled traces into one trace.
///
/// The first trace is the reference: every other trace must have the same
/// length and exactly the same timestamp at every position. The first
/// difference found is reported as `LengthMismatch` or `MisalignedInput`.
pub fn sum_traces(traces: &[&TimeSeries]) -> Result<TimeSeries, ModelError> {
    let (reference, rest) = traces
        .split_first()
        .ok_or(ModelError::EmptyInput { stage: Stage::Sum })?;

    for (offset, trace) in rest.iter().enumerate() {
        if trace.len() != reference.len() {
            return Err(ModelError::LengthMismatch {
                series: offset + 1,
                expected: reference.len(),
                found: trace.len(),
            });
        }
    }

    let mut total = TimeSeries::with_capacity(reference.len());
    for (position, anchor) in reference.iter().enumerate() {
        let mut sum = anchor.value;
        for (offset, trace) in rest.iter().enumerate() {
            let sample = trace.sample(position)?;
            if sample.time != anchor.time {
                return Err(ModelError::MisalignedInput {
                    series: offset + 1,
                    position,
                    expected: anchor.time,
                    found: sample.time,
                });
            }
            sum += sample.value;
        }
        total.push(anchor.time, sum);
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Hourly resample
// ---------------------------------------------------------------------------

/// Capacity hint for the hourly output: NREL traces are 10-minute samples.
const SAMPLES_PER_HOUR_HINT: usize = 6;

/// Averages an irregularly sampled trace over one-hour buckets.
///
/// Buckets are anchored at the first sample's timestamp, not at clock
/// hours. A sample at or past the end of the current bucket closes it and
/// moves the bucket forward by exactly one hour, so the input is assumed to
/// have at least one sample per hour. After a gap of two hours or more the
/// bucket start lags behind the samples it collects; that behaviour is kept
/// as-is. Empty buckets are never emitted.
pub fn hourly_mean(trace: &TimeSeries) -> Result<TimeSeries, ModelError> {
    let first = trace
        .samples()
        .first()
        .ok_or(ModelError::EmptyInput { stage: Stage::Resample })?;

    let hour = Duration::hours(1);
    let mut hourly = TimeSeries::with_capacity(trace.len() / SAMPLES_PER_HOUR_HINT + 1);
    let mut bucket = Bucket::starting_at(first.time);

    for sample in trace {
        let bucket_end = bucket.start + hour;
        if sample.time >= bucket_end {
            hourly.push(bucket.start, bucket.mean());
            bucket = Bucket::starting_at(bucket_end);
        }
        bucket.add(sample.value);
    }
    hourly.push(bucket.start, bucket.mean());

    Ok(hourly)
}

/// Running sum over one resample bucket. Never empty when emitted.
struct Bucket {
    start: DateTime<Utc>,
    sum: f64,
    count: usize,
}

impl Bucket {
    fn starting_at(start: DateTime<Utc>) -> Self {
        Self { start, sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
