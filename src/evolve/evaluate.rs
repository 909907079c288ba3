//! Concurrent fitness evaluation.

use rayon::prelude::*;

use crate::network::Network;

use super::engine::EngineError;

/// Error type a fitness function may surface.
pub type FitnessError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The caller-supplied scoring contract.
///
/// `identity` is the candidate's position in the population for this
/// generation; `forward` feeds an input vector through that candidate.
/// Implementations are invoked concurrently and repeatedly, so they must
/// not rely on shared mutable state, and they must terminate: the engine
/// applies no per-call timeout.
pub trait FitnessFunction: Send + Sync {
    fn score(
        &self,
        identity: usize,
        forward: &dyn Fn(&[f64]) -> Vec<f64>,
    ) -> Result<f64, FitnessError>;
}

impl<F> FitnessFunction for F
where
    F: Fn(usize, &dyn Fn(&[f64]) -> Vec<f64>) -> Result<f64, FitnessError> + Send + Sync,
{
    fn score(
        &self,
        identity: usize,
        forward: &dyn Fn(&[f64]) -> Vec<f64>,
    ) -> Result<f64, FitnessError> {
        self(identity, forward)
    }
}

/// A network paired with its score for one generation. Higher is better.
#[derive(Debug, Clone)]
pub struct ScoredNetwork {
    pub network: Network,
    pub score: f64,
}

/// Score every unit concurrently.
///
/// Results are positionally aligned with `population`; tournament
/// selection indexes them by position. A fitness failure aborts the whole
/// evaluation; an empty population is an internal invariant violation
/// (settings guarantee at least one unit).
pub(crate) fn evaluate(
    population: &[Network],
    fitness: &dyn FitnessFunction,
) -> Result<Vec<ScoredNetwork>, EngineError> {
    if population.is_empty() {
        return Err(EngineError::EmptyEvaluation);
    }
    population
        .par_iter()
        .enumerate()
        .map(|(identity, network)| {
            let score = fitness
                .score(identity, &|input| network.forward(input))
                .map_err(|source| EngineError::Fitness { identity, source })?;
            Ok(ScoredNetwork {
                network: network.clone(),
                score,
            })
        })
        .collect()
}
