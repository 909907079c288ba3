//! Configuration and reporting types.

mod config;
mod report;

pub use config::{ConfigError, EvolutionSettings, NetworkTopology, Thresholds};
pub use report::GenerationReport;
