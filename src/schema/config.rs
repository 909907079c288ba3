//! Configuration types for the evolution engine.

use serde::{Deserialize, Serialize};

/// Optional activation cutoffs, one per non-input layer. When a cutoff is
/// present, that layer's sigmoid output is binarized against it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Thresholds {
    /// Cutoff for the first hidden layer.
    #[serde(default)]
    pub hidden: Option<f64>,
    /// Cutoff for the second hidden layer (meaningful only for the
    /// double-hidden-layer shape).
    #[serde(default)]
    pub second_hidden: Option<f64>,
    /// Cutoff for the output layer.
    #[serde(default)]
    pub output: Option<f64>,
}

impl Thresholds {
    fn values(&self) -> [Option<f64>; 3] {
        [self.hidden, self.second_hidden, self.output]
    }
}

/// Shape shared by every network in a population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkTopology {
    /// Input layer size.
    pub inputs: usize,
    /// Output layer size.
    pub outputs: usize,
    /// First hidden layer size.
    pub hidden: usize,
    /// Second hidden layer size. `None` selects the single-hidden-layer
    /// shape; `Some(0)` is rejected by validation.
    #[serde(default)]
    pub second_hidden: Option<usize>,
    /// Activation cutoffs.
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl NetworkTopology {
    /// Validate layer sizes and threshold ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs == 0 {
            return Err(ConfigError::InvalidInputSize);
        }
        if self.outputs == 0 {
            return Err(ConfigError::InvalidOutputSize);
        }
        if self.hidden == 0 {
            return Err(ConfigError::InvalidHiddenSize);
        }
        if self.second_hidden == Some(0) {
            return Err(ConfigError::InvalidSecondHiddenSize);
        }
        for threshold in self.thresholds.values().into_iter().flatten() {
            // NaN fails both comparisons and is rejected with the rest.
            if !(threshold > 0.0 && threshold < 1.0) {
                return Err(ConfigError::InvalidThreshold(threshold));
            }
        }
        Ok(())
    }
}

/// Hyperparameters for one evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionSettings {
    /// Shape of every network in the population.
    pub topology: NetworkTopology,
    /// Number of networks per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Per-weight mutation probability as an integer percent (1..=99).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: u8,
    /// Number of top-ranked networks copied unchanged into the next
    /// generation before mutation.
    #[serde(default = "default_elite_count")]
    pub elite_count: usize,
    /// Seed for reproducible runs. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_population_size() -> usize {
    50
}
fn default_mutation_rate() -> u8 {
    5
}
fn default_elite_count() -> usize {
    2
}

impl EvolutionSettings {
    /// Settings for `topology` with default hyperparameters.
    pub fn new(topology: NetworkTopology) -> Self {
        Self {
            topology,
            population_size: default_population_size(),
            mutation_rate: default_mutation_rate(),
            elite_count: default_elite_count(),
            seed: None,
        }
    }

    /// Validate the topology and every hyperparameter. No engine or runner
    /// is ever constructed from settings that fail here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.topology.validate()?;
        if self.population_size == 0 {
            return Err(ConfigError::InvalidPopulationSize);
        }
        if self.mutation_rate == 0 || self.mutation_rate > 99 {
            return Err(ConfigError::InvalidMutationRate(self.mutation_rate));
        }
        if self.elite_count >= self.population_size {
            return Err(ConfigError::InvalidEliteCount {
                elite: self.elite_count,
                population: self.population_size,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("input layer size must be non-zero")]
    InvalidInputSize,
    #[error("output layer size must be non-zero")]
    InvalidOutputSize,
    #[error("hidden layer size must be non-zero")]
    InvalidHiddenSize,
    #[error("second hidden layer size must be non-zero when present")]
    InvalidSecondHiddenSize,
    #[error("activation threshold {0} must lie strictly between 0 and 1")]
    InvalidThreshold(f64),
    #[error("population size must be at least 1")]
    InvalidPopulationSize,
    #[error("mutation rate {0}% must lie in 1..=99")]
    InvalidMutationRate(u8),
    #[error("elite count {elite} must be less than population size {population}")]
    InvalidEliteCount { elite: usize, population: usize },
    #[error("settings topology does not match the seed network's topology")]
    TopologyMismatch,
}
