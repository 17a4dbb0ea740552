/// wind_model: calibrate the regional wind model for each configured scenario
/// and print the run report as JSON on stdout.

use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;

use wind_model::config::Config;
use wind_model::ingest::nrel;
use wind_model::logging;
use wind_model::model::{ModelError, Stage, TimeSeries};
use wind_model::pipeline::{CalibrationSettings, SiteInput, WindModel};
use wind_model::report::{
    DEFAULT_CDF_POINTS, RunReport, ScenarioFailure, ScenarioReport, SimulationSummary,
};

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    )?;
    logging::info(
        Stage::System,
        None,
        &format!(
            "Data directory {}, scenarios: {}",
            config.data.directory.display(),
            config.scenarios.join(", ")
        ),
    );

    let settings = CalibrationSettings {
        fitting: config.fitting.clone(),
        require_full_coverage: config.climatology.require_full_coverage,
    };

    // Raw traces are shared by every scenario; read each file once.
    let mut traces: HashMap<PathBuf, TimeSeries> = HashMap::new();
    let mut report = RunReport {
        scenarios: Vec::new(),
        failures: Vec::new(),
    };

    for scenario in &config.scenarios {
        let plan = config.site_plan(scenario)?;

        let mut sites = Vec::with_capacity(plan.len());
        let mut ingest_error = None;
        for site in &plan {
            if !traces.contains_key(&site.path) {
                match nrel::read_trace(&site.path, config.data.field) {
                    Ok(trace) => {
                        logging::info(
                            Stage::Ingest,
                            Some(site.name.as_str()),
                            &format!("{} samples from {}", trace.len(), site.path.display()),
                        );
                        traces.insert(site.path.clone(), trace);
                    }
                    Err(e) => {
                        logging::log_stage_failure(Some(site.name.as_str()), &e);
                        ingest_error = Some(e);
                        break;
                    }
                }
            }
            if let Some(trace) = traces.get(&site.path) {
                sites.push(SiteInput {
                    name: site.name.clone(),
                    trace: trace.clone(),
                    current_mw: site.current_mw,
                    target_mw: site.target_mw,
                });
            }
        }
        if let Some(e) = ingest_error {
            report.failures.push(ScenarioFailure::new(scenario, &e));
            continue;
        }

        match run_scenario(scenario, &sites, &settings, &config) {
            Ok(scenario_report) => report.scenarios.push(scenario_report),
            Err(e) => report.failures.push(ScenarioFailure::new(scenario, &e)),
        }
    }

    let total = config.scenarios.len();
    let failed = report.failures.len();
    logging::log_run_summary(total, total - failed, failed);

    println!("{}", serde_json::to_string_pretty(&report)?);

    if failed > 0 {
        return Err(format!("{} of {} scenarios failed", failed, total).into());
    }
    Ok(())
}

fn run_scenario(
    scenario: &str,
    sites: &[SiteInput],
    settings: &CalibrationSettings,
    config: &Config,
) -> Result<ScenarioReport, ModelError> {
    let model = WindModel::calibrate(scenario, sites, settings)?;
    let scenario_report =
        ScenarioReport::from_model(&model, DEFAULT_CDF_POINTS, settings.fitting.bin_tolerance)?;

    let sim = &config.simulation;
    if sim.hours == 0 {
        return Ok(scenario_report);
    }
    let start = match sim.start.or_else(|| model.next_hour()) {
        Some(start) => start,
        None => return Ok(scenario_report),
    };
    let synthetic = model.simulate(start, sim.hours, sim.method, sim.seed)?;
    Ok(scenario_report.with_simulation(SimulationSummary::new(
        sim.method,
        sim.seed,
        &synthetic.values(),
    )))
}
