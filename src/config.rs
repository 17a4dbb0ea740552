/// Run configuration.
///
/// Loaded from a TOML file (default `wind_model.toml`, or the path in
/// `WIND_MODEL_CONFIG`). A `.env` file in the working directory is read
/// first, so the override variables can live there too:
///
/// - `WIND_MODEL_CONFIG`  : path of the TOML file
/// - `WIND_MODEL_DATA_DIR`: overrides `[data] directory`
/// - `WIND_MODEL_LOG`     : overrides `[logging] level`
///
/// Every section is optional. Sites default to the full registry in
/// `sites`, and each site's target capacity defaults to the registry value
/// for the scenario being run.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analysis::fitting::FitSettings;
use crate::ingest::nrel::NrelField;
use crate::logging::LogLevel;
use crate::model::FitMethod;
use crate::sites::{self, CAPACITY_PER_MEASUREMENT_MW, SCENARIO_DEEP, SCENARIO_NOW};

pub const DEFAULT_CONFIG_PATH: &str = "wind_model.toml";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("site '{0}' is not in the registry and has no file configured")]
    UnknownSite(String),

    #[error("site '{site}' has no capacity for scenario '{scenario}'")]
    UnknownScenario { site: String, scenario: String },
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    /// Sites to aggregate. Empty means every registered site.
    pub sites: Vec<SiteConfig>,
    /// Scenarios to calibrate, each from the same raw traces.
    pub scenarios: Vec<String>,
    pub fitting: FitSettings,
    pub climatology: ClimatologyConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            sites: Vec::new(),
            scenarios: vec![SCENARIO_NOW.to_string(), SCENARIO_DEEP.to_string()],
            fitting: FitSettings::default(),
            climatology: ClimatologyConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding the measurement files.
    pub directory: PathBuf,
    /// Installed capacity one raw measurement trace stands for, in MW.
    pub capacity_per_measurement_mw: f64,
    /// Column of the measurement file used as the trace value.
    pub field: NrelField,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("wind data"),
            capacity_per_measurement_mw: CAPACITY_PER_MEASUREMENT_MW,
            field: NrelField::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    /// Measurement file relative to `data.directory`; registry file if unset.
    pub file: Option<String>,
    /// Capacity the raw trace represents; `data.capacity_per_measurement_mw` if unset.
    pub current_capacity_mw: Option<f64>,
    /// Target capacity per scenario name, in MW.
    #[serde(default)]
    pub targets: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClimatologyConfig {
    /// Fail the run if any season/hour cell has no samples.
    pub require_full_coverage: bool,
}

impl Default for ClimatologyConfig {
    fn default() -> Self {
        Self {
            require_full_coverage: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Hours of synthetic output per scenario; 0 disables simulation.
    pub hours: usize,
    pub seed: u64,
    /// Which fit drives the synthetic trace.
    pub method: FitMethod,
    /// First synthetic hour; the hour after the last observation if unset.
    pub start: Option<DateTime<Utc>>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            hours: 0,
            seed: 1,
            method: FitMethod::MaximumLikelihood,
            start: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            timestamps: true,
        }
    }
}

// ============================================================================
// Resolved site plan
// ============================================================================

/// One site as it will be loaded and scaled for a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct SitePlan {
    pub name: String,
    pub path: PathBuf,
    pub current_mw: f64,
    pub target_mw: f64,
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads `.env`, then the config file, then applies env overrides.
    ///
    /// A missing default config file is not an error; an explicitly named
    /// one is.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match env::var("WIND_MODEL_CONFIG") {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_PATH))?
            }
            Err(_) => Config::default(),
        };

        if let Ok(dir) = env::var("WIND_MODEL_DATA_DIR") {
            config.data.directory = PathBuf::from(dir);
        }
        if let Ok(level) = env::var("WIND_MODEL_LOG") {
            config.logging.level = LogLevel::parse(&level)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown log level '{}'", level)))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fit = &self.fitting;
        if fit.bins < 3 {
            return Err(ConfigError::Invalid(format!(
                "fitting.bins must be at least 3, got {}",
                fit.bins
            )));
        }
        if !(fit.bin_tolerance > 0.0) || !(fit.mle_tolerance > 0.0) {
            return Err(ConfigError::Invalid(
                "fitting tolerances must be positive".to_string(),
            ));
        }
        if fit.mle_max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "fitting.mle_max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.data.capacity_per_measurement_mw > 0.0) {
            return Err(ConfigError::Invalid(
                "data.capacity_per_measurement_mw must be positive".to_string(),
            ));
        }
        if self.scenarios.is_empty() {
            return Err(ConfigError::Invalid("no scenarios configured".to_string()));
        }

        let mut seen = HashSet::new();
        for site in &self.sites {
            if !seen.insert(site.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate site '{}'", site.name)));
            }
            let negative_current = site.current_capacity_mw.is_some_and(|mw| !(mw >= 0.0));
            let negative_target = site.targets.values().any(|mw| !(*mw >= 0.0));
            if negative_current || negative_target {
                return Err(ConfigError::Invalid(format!(
                    "site '{}' has a negative capacity",
                    site.name
                )));
            }
        }
        Ok(())
    }

    /// Resolves file paths and capacities of every site for `scenario`.
    pub fn site_plan(&self, scenario: &str) -> Result<Vec<SitePlan>, ConfigError> {
        let configured: Vec<SiteConfig> = if self.sites.is_empty() {
            sites::SITE_REGISTRY
                .iter()
                .map(|s| SiteConfig {
                    name: s.name.to_string(),
                    file: None,
                    current_capacity_mw: None,
                    targets: BTreeMap::new(),
                })
                .collect()
        } else {
            self.sites.clone()
        };

        configured
            .iter()
            .map(|site| {
                let registered = sites::find_site(&site.name);
                let file = match (&site.file, registered) {
                    (Some(file), _) => file.clone(),
                    (None, Some(r)) => r.file.to_string(),
                    (None, None) => return Err(ConfigError::UnknownSite(site.name.clone())),
                };
                let target_mw = site
                    .targets
                    .get(scenario)
                    .copied()
                    .or_else(|| registered.and_then(|r| r.capacity_for(scenario)))
                    .ok_or_else(|| ConfigError::UnknownScenario {
                        site: site.name.clone(),
                        scenario: scenario.to_string(),
                    })?;

                Ok(SitePlan {
                    name: site.name.clone(),
                    path: self.data.directory.join(file),
                    current_mw: site
                        .current_capacity_mw
                        .unwrap_or(self.data.capacity_per_measurement_mw),
                    target_mw,
                })
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
