/// Weibull fitting of the normalized regional trace.
///
/// Two independent estimators are exposed and never reconciled:
/// - `fit_mle` maximizes the Weibull log-likelihood.
/// - `fit_regression` regresses the log-log transformed empirical CDF.
///
/// Both report bad input and numerical failure as errors instead of
/// returning a default fit.

use serde::Deserialize;

use crate::model::{FitMethod, ModelError, Stage, WeibullParams};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub const DEFAULT_BINS: usize = 100;
pub const DEFAULT_BIN_TOLERANCE: f64 = 1e-11;
pub const DEFAULT_MLE_MAX_ITERATIONS: usize = 200;
pub const DEFAULT_MLE_TOLERANCE: f64 = 1e-10;

/// Numerical settings shared by both estimators.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    /// Number of equal-width CDF bins between 0 and the sample maximum.
    pub bins: usize,
    /// Slack added to a bin's upper edge when assigning values to bins.
    pub bin_tolerance: f64,
    pub mle_max_iterations: usize,
    /// Relative change in shape below which the MLE solver stops.
    pub mle_tolerance: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            bin_tolerance: DEFAULT_BIN_TOLERANCE,
            mle_max_iterations: DEFAULT_MLE_MAX_ITERATIONS,
            mle_tolerance: DEFAULT_MLE_TOLERANCE,
        }
    }
}

// ---------------------------------------------------------------------------
// Binning and empirical CDF
// ---------------------------------------------------------------------------

/// Smallest bin `i` with `value < (i + 1) * width + tolerance`.
///
/// A value sitting exactly on an edge goes to the lower bin. Returns `None`
/// if the value lies beyond the last bin (or is NaN).
pub fn bin_index(value: f64, width: f64, bins: usize, tolerance: f64) -> Option<usize> {
    (0..bins).find(|&i| value < (i + 1) as f64 * width + tolerance)
}

/// Step-wise CDF over `bins` equal-width bins from 0 to the sample maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalCdf {
    width: f64,
    max: f64,
    cdf: Vec<f64>,
}

impl EmpiricalCdf {
    /// Bins `values` and accumulates the fraction of samples at or below each
    /// bin's upper edge. The last entry is set to exactly 1.0.
    pub fn build(values: &[f64], bins: usize, tolerance: f64) -> Result<Self, ModelError> {
        let method = FitMethod::LogLogRegression;
        if values.is_empty() {
            return Err(ModelError::EmptyInput { stage: Stage::FitRegression });
        }
        if bins == 0 {
            return Err(ModelError::InsufficientData { method, needed: 1, found: 0 });
        }

        let mut max = 0.0f64;
        for (index, &value) in values.iter().enumerate() {
            if value.is_nan() || value < 0.0 || value.is_infinite() {
                return Err(ModelError::OutOfRangeValue {
                    method,
                    index,
                    value,
                    upper: f64::INFINITY,
                });
            }
            max = max.max(value);
        }
        if max == 0.0 {
            return Err(ModelError::InsufficientData { method, needed: 1, found: 0 });
        }

        let width = max / bins as f64;
        let mut counts = vec![0usize; bins];
        for (index, &value) in values.iter().enumerate() {
            // The last edge is the maximum itself; `bins * width` can round below it.
            let bin = bin_index(value, width, bins, tolerance)
                .or_else(|| (value <= max).then_some(bins - 1))
                .ok_or(ModelError::OutOfRangeValue {
                    method,
                    index,
                    value,
                    upper: max,
                })?;
            counts[bin] += 1;
        }

        let n = values.len() as f64;
        let mut below = 0usize;
        let mut cdf: Vec<f64> = counts
            .iter()
            .map(|c| {
                below += c;
                below as f64 / n
            })
            .collect();
        if let Some(last) = cdf.last_mut() {
            *last = 1.0;
        }

        Ok(Self { width, max, cdf })
    }

    pub fn bin_width(&self) -> f64 {
        self.width
    }

    pub fn len(&self) -> usize {
        self.cdf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cdf.is_empty()
    }

    /// Upper edge of bin `i`. The last bin ends at the sample maximum.
    pub fn upper_edge(&self, i: usize) -> f64 {
        if i + 1 >= self.cdf.len() {
            self.max
        } else {
            (i + 1) as f64 * self.width
        }
    }

    /// CDF values, one per bin, non-decreasing.
    pub fn values(&self) -> &[f64] {
        &self.cdf
    }

    /// Regression points `(ln x, ln ln 1/(1 - F))` for interior bins.
    ///
    /// The first and last bins are always skipped, as is any interior bin
    /// whose CDF is 0 or 1, where the transform is singular.
    pub fn log_log_points(&self) -> Vec<(f64, f64)> {
        let bins = self.cdf.len();
        if bins < 3 {
            return Vec::new();
        }
        (1..bins - 1)
            .filter(|&i| self.cdf[i] > 0.0 && self.cdf[i] < 1.0)
            .map(|i| {
                let z = self.upper_edge(i).ln();
                let y = (1.0 / (1.0 - self.cdf[i])).ln().ln();
                (z, y)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Log-log regression
// ---------------------------------------------------------------------------

/// Ordinary least squares fit of `y = b0 + b1 * z`. Returns `(b0, b1)`.
pub fn least_squares(points: &[(f64, f64)]) -> Result<(f64, f64), ModelError> {
    let method = FitMethod::LogLogRegression;
    if points.len() < 2 {
        return Err(ModelError::InsufficientData { method, needed: 2, found: points.len() });
    }

    let n = points.len() as f64;
    let mean_z = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (z, y) in points {
        sxy += (z - mean_z) * (y - mean_y);
        sxx += (z - mean_z) * (z - mean_z);
    }
    if sxx == 0.0 {
        return Err(ModelError::InsufficientData { method, needed: 2, found: 1 });
    }

    let b1 = sxy / sxx;
    Ok((mean_y - b1 * mean_z, b1))
}

/// Fits a Weibull by regressing the log-log transformed empirical CDF.
///
/// With `F(x) = 1 - exp(-(x / lambda)^k)`, `ln ln 1/(1 - F) = k ln x - k ln lambda`,
/// so `k = b1` and `lambda = exp(-b0 / b1)`.
pub fn fit_regression(values: &[f64], settings: &FitSettings) -> Result<WeibullParams, ModelError> {
    let cdf = EmpiricalCdf::build(values, settings.bins, settings.bin_tolerance)?;
    let points = cdf.log_log_points();
    let (b0, b1) = least_squares(&points)?;

    if !(b1 > 0.0) || !b0.is_finite() {
        return Err(ModelError::FitConvergenceFailure {
            method: FitMethod::LogLogRegression,
            iterations: 1,
            reason: format!("regression slope {} does not give a valid shape", b1),
        });
    }
    Ok(WeibullParams::new(b1, (-b0 / b1).exp()))
}

// ---------------------------------------------------------------------------
// Maximum likelihood
// ---------------------------------------------------------------------------

/// Largest shape the solver will bracket before giving up.
const MAX_SHAPE: f64 = 1e6;
/// Smallest shape the solver will bracket before giving up.
const MIN_SHAPE: f64 = 1e-8;
/// Log of a zero sample.
const LN_EPS: f64 = -36.043_653_389_117_15;

/// Fits a Weibull by maximum likelihood.
///
/// The scale is profiled out, leaving one equation in the shape `k`:
///
/// `g(k) = sum(x^k ln x) / sum(x^k) - 1/k - mean(ln x) = 0`
///
/// `g` is increasing in `k`, so the root is bracketed first and then
/// refined with Newton steps that fall back to bisection whenever a step
/// leaves the bracket. Samples are divided by their maximum beforehand so
/// `x^k` cannot overflow; the scale is multiplied back at the end.
///
/// Every sample must be finite and non-negative. `ln 0` is taken as
/// `ln(f64::EPSILON)`, so calm hours stay in the fit instead of being
/// dropped. A sample with no spread (all values equal) has no finite
/// maximum and is reported as a convergence failure.
pub fn fit_mle(values: &[f64], settings: &FitSettings) -> Result<WeibullParams, ModelError> {
    let method = FitMethod::MaximumLikelihood;
    if values.is_empty() {
        return Err(ModelError::EmptyInput { stage: Stage::FitMle });
    }
    if values.len() < 2 {
        return Err(ModelError::InsufficientData { method, needed: 2, found: values.len() });
    }

    let mut max = 0.0f64;
    for (index, &value) in values.iter().enumerate() {
        if value.is_nan() || value < 0.0 || value.is_infinite() {
            return Err(ModelError::OutOfRangeValue {
                method,
                index,
                value,
                upper: f64::INFINITY,
            });
        }
        max = max.max(value);
    }
    if max == 0.0 {
        return Err(ModelError::InsufficientData { method, needed: 1, found: 0 });
    }

    let ln_max = max.ln();
    let ln_y: Vec<f64> = values
        .iter()
        .map(|&v| if v > 0.0 { v.ln() - ln_max } else { LN_EPS - ln_max })
        .collect();
    let mean_ln = ln_y.iter().sum::<f64>() / ln_y.len() as f64;
    let failure = |iterations: usize, reason: String| ModelError::FitConvergenceFailure {
        method,
        iterations,
        reason,
    };

    let (mut lo, mut hi) = bracket_shape(&ln_y, mean_ln).ok_or_else(|| {
        failure(0, "likelihood has no interior maximum (sample has no spread)".to_string())
    })?;

    let mut k = 0.5 * (lo + hi);
    for iteration in 1..=settings.mle_max_iterations {
        let (g, dg) = profile_score(&ln_y, mean_ln, k);
        if !g.is_finite() || !dg.is_finite() {
            return Err(failure(iteration, format!("non-finite score at k = {}", k)));
        }
        if g < 0.0 {
            lo = k;
        } else {
            hi = k;
        }

        let newton = k - g / dg;
        let next = if g == 0.0 {
            k
        } else if dg > 0.0 && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };

        let converged = (next - k).abs() <= settings.mle_tolerance * k;
        k = next;
        if converged {
            let sum_yk: f64 = ln_y.iter().map(|l| (k * l).exp()).sum();
            let scale = max * (sum_yk / ln_y.len() as f64).powf(1.0 / k);
            if !scale.is_finite() || scale <= 0.0 {
                return Err(failure(iteration, format!("invalid scale {} at k = {}", scale, k)));
            }
            return Ok(WeibullParams::new(k, scale));
        }
    }

    Err(failure(
        settings.mle_max_iterations,
        format!("shape still moving at k = {} (bracket [{}, {}])", k, lo, hi),
    ))
}

/// Profile score `g(k)` and its derivative, with `ln_y` the logs of the
/// max-scaled samples.
fn profile_score(ln_y: &[f64], mean_ln: f64, k: f64) -> (f64, f64) {
    let (mut s0, mut s1, mut s2) = (0.0, 0.0, 0.0);
    for &l in ln_y {
        let yk = (k * l).exp();
        s0 += yk;
        s1 += yk * l;
        s2 += yk * l * l;
    }
    let ratio = s1 / s0;
    let g = ratio - 1.0 / k - mean_ln;
    let dg = s2 / s0 - ratio * ratio + 1.0 / (k * k);
    (g, dg)
}

/// Finds `[lo, hi]` with `g(lo) < 0 <= g(hi)`, starting from `k = 1`.
fn bracket_shape(ln_y: &[f64], mean_ln: f64) -> Option<(f64, f64)> {
    let score = |k: f64| profile_score(ln_y, mean_ln, k).0;

    let (mut lo, mut hi) = (1.0, 1.0);
    if score(1.0) < 0.0 {
        while score(hi) < 0.0 {
            lo = hi;
            hi *= 2.0;
            if hi > MAX_SHAPE {
                return None;
            }
        }
    } else {
        while score(lo) >= 0.0 {
            hi = lo;
            lo *= 0.5;
            if lo < MIN_SHAPE {
                return None;
            }
        }
    }
    Some((lo, hi))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
