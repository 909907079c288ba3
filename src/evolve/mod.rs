//! Genetic-algorithm core: population lifecycle, concurrent fitness
//! evaluation, tournament selection, crossover, mutation, and run
//! control.
//!
//! [`EvolutionEngine`] is the synchronous heart, advancing one
//! generation per [`step`]. [`EvolutionRunner`] wraps it with a
//! start/stop lifecycle on a supervised background thread.
//!
//! [`step`]: EvolutionEngine::step

mod engine;
mod evaluate;
mod population;
mod runner;

pub use engine::{BestNetworkHandler, EngineError, EvolutionEngine, ProgressHandler};
pub use evaluate::{FitnessError, FitnessFunction, ScoredNetwork};
pub use runner::EvolutionRunner;
