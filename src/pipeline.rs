/// Calibration pipeline for the regional wind model.
///
/// Stages run strictly in order, each consuming the complete output of the
/// previous one:
///
///   scale (per site) -> sum -> hourly resample -> climatology -> normalize
///   -> maximum likelihood fit, log-log regression fit
///
/// The first failing stage halts the run. The failure is logged with its
/// stage and subject before being returned, and nothing downstream runs on
/// partial data.

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::analysis::aggregate::{hourly_mean, sum_traces};
use crate::analysis::climatology::{ClimatologyTable, classify, normalize};
use crate::analysis::fitting::{FitSettings, fit_mle, fit_regression};
use crate::analysis::scaling::SiteTrace;
use crate::logging;
use crate::model::{FitMethod, ModelError, Stage, TimeSeries, WeibullParams};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One site's raw measurement trace and the capacities to scale it between.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteInput {
    pub name: String,
    pub trace: TimeSeries,
    /// Capacity the raw trace represents, in MW.
    pub current_mw: f64,
    /// Capacity the site is modelled at, in MW.
    pub target_mw: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSettings {
    pub fitting: FitSettings,
    /// Fail with `EmptyBucket` unless every season/hour cell has samples.
    pub require_full_coverage: bool,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            fitting: FitSettings::default(),
            require_full_coverage: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Calibrated model
// ---------------------------------------------------------------------------

/// Everything a successful calibration produces.
#[derive(Debug, Clone, PartialEq)]
pub struct WindModel {
    pub scenario: String,
    /// Sum of the sites' target capacities, in MW.
    pub capacity_mw: f64,
    pub site_count: usize,
    pub hourly: TimeSeries,
    pub climatology: ClimatologyTable,
    pub normalized: TimeSeries,
    pub mle: WeibullParams,
    pub regression: WeibullParams,
}

/// Passes a stage result through, logging the failure if there is one.
fn checked<T>(subject: Option<&str>, result: Result<T, ModelError>) -> Result<T, ModelError> {
    if let Err(e) = &result {
        logging::log_stage_failure(subject, e);
    }
    result
}

impl WindModel {
    /// Runs every stage for one scenario.
    pub fn calibrate(
        scenario: &str,
        sites: &[SiteInput],
        settings: &CalibrationSettings,
    ) -> Result<Self, ModelError> {
        let subject = Some(scenario);
        logging::info(
            Stage::System,
            subject,
            &format!("Calibrating {} sites", sites.len()),
        );

        // --- Scale ---
        let mut scaled = Vec::with_capacity(sites.len());
        for site in sites {
            let trace = checked(
                Some(site.name.as_str()),
                SiteTrace::scaled(&site.name, &site.trace, site.current_mw, site.target_mw),
            )?;
            logging::debug(
                Stage::Scale,
                Some(site.name.as_str()),
                &format!(
                    "{} samples scaled from {} MW to {} MW",
                    trace.trace.len(),
                    site.current_mw,
                    site.target_mw
                ),
            );
            scaled.push(trace);
        }
        let capacity_mw: f64 = scaled.iter().map(|s| s.capacity_mw).sum();

        // --- Sum ---
        let traces: Vec<&TimeSeries> = scaled.iter().map(|s| &s.trace).collect();
        let total = checked(subject, sum_traces(&traces))?;
        logging::info(
            Stage::Sum,
            subject,
            &format!("{} aligned samples, {:.2} MW installed", total.len(), capacity_mw),
        );

        // --- Hourly resample ---
        let hourly = checked(subject, hourly_mean(&total))?;
        logging::info(Stage::Resample, subject, &format!("{} hourly samples", hourly.len()));

        // --- Climatology ---
        let climatology = checked(subject, ClimatologyTable::estimate(&hourly))?;
        if settings.require_full_coverage {
            checked(subject, climatology.require_complete())?;
        } else if !climatology.is_complete() {
            logging::warn(
                Stage::Climatology,
                subject,
                "climatology has empty cells; samples in them cannot be normalized",
            );
        }

        // --- Normalize ---
        let normalized = checked(subject, normalize(&hourly, &climatology))?;
        let values = normalized.values();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        logging::info(
            Stage::Normalize,
            subject,
            &format!("normalized trace mean {:.4}", mean),
        );

        // --- Fit ---
        let mle = checked(subject, fit_mle(&values, &settings.fitting))?;
        logging::info(
            Stage::FitMle,
            subject,
            &format!("shape {:.4}, scale {:.4}", mle.shape, mle.scale),
        );
        let regression = checked(subject, fit_regression(&values, &settings.fitting))?;
        logging::info(
            Stage::FitRegression,
            subject,
            &format!("shape {:.4}, scale {:.4}", regression.shape, regression.scale),
        );

        Ok(Self {
            scenario: scenario.to_string(),
            capacity_mw,
            site_count: sites.len(),
            hourly,
            climatology,
            normalized,
            mle,
            regression,
        })
    }

    /// Parameters of the fit made with `method`.
    pub fn fit(&self, method: FitMethod) -> WeibullParams {
        match method {
            FitMethod::MaximumLikelihood => self.mle,
            FitMethod::LogLogRegression => self.regression,
        }
    }

    /// The hour after the last calibrated hour.
    pub fn next_hour(&self) -> Option<DateTime<Utc>> {
        self.hourly
            .samples()
            .last()
            .map(|s| s.time + Duration::hours(1))
    }

    /// Generates a synthetic hourly trace of `hours` samples from `start`.
    ///
    /// Each value is the climatology mean of its cell times a draw from the
    /// fitted Weibull. The same seed always yields the same trace.
    pub fn simulate(
        &self,
        start: DateTime<Utc>,
        hours: usize,
        method: FitMethod,
        seed: u64,
    ) -> Result<TimeSeries, ModelError> {
        let params = self.fit(method);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut synthetic = TimeSeries::with_capacity(hours);

        for h in 0..hours {
            let time = start + Duration::hours(h as i64);
            let cell = classify(time);
            let mean = checked(
                Some(self.scenario.as_str()),
                self.climatology.mean(cell).ok_or(ModelError::EmptyBucket {
                    stage: Stage::Simulate,
                    season: cell.season,
                    hour: cell.hour,
                }),
            )?;
            synthetic.push(time, mean * params.sample(&mut rng));
        }

        logging::info(
            Stage::Simulate,
            Some(self.scenario.as_str()),
            &format!("{} synthetic hours from the {} fit", synthetic.len(), method),
        );
        Ok(synthetic)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
