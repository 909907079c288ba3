//! Genetic-algorithm neuroevolution of feed-forward networks.
//!
//! This crate evolves a population of fixed-topology feed-forward
//! networks toward maximizing a caller-supplied fitness function, using
//! selection, crossover, and mutation instead of gradient descent. It is
//! aimed at callers with a black-box scoring function (a game, a
//! simulation) who want a network whose behavior improves over
//! successive generations.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: settings and report types, with validation
//! - `network`: the network unit (weight matrices, forward pass,
//!   crossover, mutation, binary snapshots)
//! - `evolve`: the genetic-algorithm engine and its run lifecycle
//!
//! # Example
//!
//! ```rust,no_run
//! use neuroevo::{
//!     EvolutionRunner, EvolutionSettings, FitnessError, NetworkTopology, Thresholds,
//! };
//!
//! // Reward networks whose output for (1, 0) is close to 1.
//! fn score(
//!     _identity: usize,
//!     forward: &dyn Fn(&[f64]) -> Vec<f64>,
//! ) -> Result<f64, FitnessError> {
//!     Ok(1.0 - (forward(&[1.0, 0.0])[0] - 1.0).abs())
//! }
//!
//! let topology = NetworkTopology {
//!     inputs: 2,
//!     outputs: 1,
//!     hidden: 4,
//!     second_hidden: None,
//!     thresholds: Thresholds::default(),
//! };
//! let runner = EvolutionRunner::new(EvolutionSettings::new(topology), score).unwrap();
//! runner.on_progress(|report| {
//!     println!(
//!         "generation {}: best {:.3}, mean {:.3}",
//!         report.generation, report.best_score, report.mean_score
//!     );
//! });
//!
//! assert!(runner.start());
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! assert!(runner.stop());
//! println!("best fitness: {:?}", runner.best_fitness());
//! ```

pub mod evolve;
pub mod network;
pub mod schema;

// Re-export commonly used types
pub use evolve::{
    BestNetworkHandler, EngineError, EvolutionEngine, EvolutionRunner, FitnessError,
    FitnessFunction, ProgressHandler, ScoredNetwork,
};
pub use network::{Network, SnapshotError, WeightMatrix};
pub use schema::{
    ConfigError, EvolutionSettings, GenerationReport, NetworkTopology, Thresholds,
};
