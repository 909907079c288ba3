//! Per-generation progress reporting.

use serde::{Deserialize, Serialize};

/// Summary of one completed generation, delivered to the progress handler
/// before the generation counter advances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Index of the generation this report covers, starting at 0.
    pub generation: u64,
    /// Best score in this generation.
    pub best_score: f64,
    /// Mean score across this generation.
    pub mean_score: f64,
    /// Best score observed across all generations so far.
    pub all_time_best: f64,
}
