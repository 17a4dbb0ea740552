/// Measurement file readers.
///
/// Submodules:
/// - `nrel`: NREL 10-minute wind measurement CSV files.

pub mod nrel;
