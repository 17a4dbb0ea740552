/// Two-parameter Weibull distribution helpers.
///
/// Support is `[0, inf)`; `F(x) = 1 - exp(-(x / lambda)^k)`. The numerics
/// are `statrs::distribution::Weibull`; `WeibullParams` only carries the
/// fitted pair. Parameters that do not describe a distribution (non-positive
/// or non-finite shape or scale) evaluate to NaN.

use rand::Rng;
use rand::distributions::Distribution as Sampler;
use statrs::distribution::{Continuous, ContinuousCDF, Weibull};
use statrs::statistics::Distribution as Moments;

use crate::model::WeibullParams;

impl WeibullParams {
    pub fn new(shape: f64, scale: f64) -> Self {
        Self { shape, scale }
    }

    /// The `statrs` distribution, or `None` for invalid parameters.
    pub fn distribution(&self) -> Option<Weibull> {
        Weibull::new(self.shape, self.scale).ok()
    }

    pub fn cdf(&self, x: f64) -> f64 {
        self.distribution().map_or(f64::NAN, |d| d.cdf(x))
    }

    pub fn pdf(&self, x: f64) -> f64 {
        self.distribution().map_or(f64::NAN, |d| d.pdf(x))
    }

    /// Inverse CDF for `p` in `[0, 1]`.
    pub fn quantile(&self, p: f64) -> f64 {
        if !(0.0..=1.0).contains(&p) {
            return f64::NAN;
        }
        self.distribution().map_or(f64::NAN, |d| d.inverse_cdf(p))
    }

    /// `lambda * Gamma(1 + 1/k)`.
    pub fn mean(&self) -> f64 {
        self.distribution().and_then(|d| d.mean()).unwrap_or(f64::NAN)
    }

    /// Draws one value.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.distribution().map_or(f64::NAN, |d| d.sample(rng))
    }

    /// Draws `n` independent values.
    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        match self.distribution() {
            Some(d) => (0..n).map(|_| d.sample(rng)).collect(),
            None => vec![f64::NAN; n],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
