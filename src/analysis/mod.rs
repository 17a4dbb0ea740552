/// Time-series processing and distribution fitting for the wind model.
///
/// Submodules, in pipeline order:
/// - `scaling`    : rescales one site's trace to a target installed capacity.
/// - `aggregate`  : sums co-sampled site traces and resamples to hourly means.
/// - `climatology`: season/hour classification, climatology table, normalization.
/// - `fitting`    : Weibull fits of the normalized trace (MLE and log-log regression).
/// - `weibull`    : distribution helpers shared by fitting, reporting and simulation.

pub mod aggregate;
pub mod climatology;
pub mod fitting;
pub mod scaling;
pub mod weibull;
