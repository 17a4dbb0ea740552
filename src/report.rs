/// Run report for calibrated scenarios.
///
/// Collects the climatology table, both Weibull fits and a CDF comparison
/// of the normalized trace into a serializable structure. Formatting is
/// left to the caller; the binary prints it as JSON.

use serde::Serialize;

use crate::analysis::fitting::EmpiricalCdf;
use crate::model::{FitMethod, ModelError, Season, WeibullParams};
use crate::pipeline::WindModel;

/// Evaluation points in the CDF comparison table.
pub const DEFAULT_CDF_POINTS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub scenarios: Vec<ScenarioReport>,
    /// Scenarios that failed, with the error that stopped them.
    pub failures: Vec<ScenarioFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioFailure {
    pub scenario: String,
    pub stage: Option<String>,
    pub error: String,
}

impl ScenarioFailure {
    pub fn new(scenario: &str, err: &ModelError) -> Self {
        Self {
            scenario: scenario.to_string(),
            stage: err.stage().map(|s| s.to_string()),
            error: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub sites: usize,
    pub capacity_mw: f64,
    pub hourly_samples: usize,
    pub climatology: Vec<ClimatologyRow>,
    pub fits: Vec<FitSummary>,
    pub cdf_comparison: Vec<CdfPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationSummary>,
}

/// One season's hourly means, hour 0 first. Empty cells are `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimatologyRow {
    pub season: Season,
    pub hourly_mean: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSummary {
    pub method: FitMethod,
    pub shape: f64,
    pub scale: f64,
    /// Mean of the fitted distribution; close to 1 for a good fit of a
    /// normalized trace.
    pub mean: f64,
}

impl FitSummary {
    fn new(method: FitMethod, params: WeibullParams) -> Self {
        Self {
            method,
            shape: params.shape,
            scale: params.scale,
            mean: params.mean(),
        }
    }
}

/// Empirical and fitted CDFs at one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdfPoint {
    pub x: f64,
    pub empirical: f64,
    pub mle: f64,
    pub regression: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub method: FitMethod,
    pub seed: u64,
    pub hours: usize,
    pub mean: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Empirical CDF of `values` next to both fitted CDFs.
///
/// The empirical side uses the regression binning: `points` equal-width
/// bins up to the sample maximum, evaluated at each bin's upper edge, with
/// the same edge tolerance.
pub fn cdf_comparison(
    values: &[f64],
    mle: WeibullParams,
    regression: WeibullParams,
    points: usize,
    tolerance: f64,
) -> Result<Vec<CdfPoint>, ModelError> {
    let empirical = EmpiricalCdf::build(values, points, tolerance)?;
    Ok(empirical
        .values()
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            let x = empirical.upper_edge(i);
            CdfPoint {
                x,
                empirical: f,
                mle: mle.cdf(x),
                regression: regression.cdf(x),
            }
        })
        .collect())
}

impl ScenarioReport {
    pub fn from_model(model: &WindModel, cdf_points: usize, tolerance: f64) -> Result<Self, ModelError> {
        let climatology = Season::ALL
            .iter()
            .map(|&season| ClimatologyRow {
                season,
                hourly_mean: model.climatology.season_means(season).to_vec(),
            })
            .collect();

        let fits = vec![
            FitSummary::new(FitMethod::MaximumLikelihood, model.mle),
            FitSummary::new(FitMethod::LogLogRegression, model.regression),
        ];

        let cdf_comparison = cdf_comparison(
            &model.normalized.values(),
            model.mle,
            model.regression,
            cdf_points,
            tolerance,
        )?;

        Ok(Self {
            scenario: model.scenario.clone(),
            sites: model.site_count,
            capacity_mw: model.capacity_mw,
            hourly_samples: model.hourly.len(),
            climatology,
            fits,
            cdf_comparison,
            simulation: None,
        })
    }

    pub fn with_simulation(mut self, summary: SimulationSummary) -> Self {
        self.simulation = Some(summary);
        self
    }
}

impl SimulationSummary {
    pub fn new(method: FitMethod, seed: u64, values: &[f64]) -> Self {
        let mean = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };
        Self {
            method,
            seed,
            hours: values.len(),
            mean,
            max: values.iter().copied().fold(0.0, f64::max),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
