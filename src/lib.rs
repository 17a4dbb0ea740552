//! Regional wind power model.
//!
//! Calibrates a statistical model of aggregate wind output from per-site
//! measurement traces: sites are scaled to a capacity scenario, summed,
//! resampled to hourly means and deseasonalized against a season/hour
//! climatology, and the normalized trace is fitted with a Weibull
//! distribution by two independent estimators.

pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod sites;
