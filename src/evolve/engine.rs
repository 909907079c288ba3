//! The generation loop: evaluate, select, cross over, mutate, replace.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::network::Network;
use crate::schema::{ConfigError, EvolutionSettings, GenerationReport};

use super::evaluate::{self, FitnessError, FitnessFunction, ScoredNetwork};
use super::population;

/// Called once per completed generation, fire-and-forget.
pub type ProgressHandler = Box<dyn Fn(&GenerationReport) + Send + Sync>;

/// Called whenever the all-time best network is replaced, with the new
/// network and its score.
pub type BestNetworkHandler = Box<dyn Fn(&Network, f64) + Send + Sync>;

/// Notification handlers, shared with the lifecycle runner so callers can
/// register them after construction.
#[derive(Default)]
pub(crate) struct Handlers {
    pub progress: Mutex<Option<ProgressHandler>>,
    pub best_network: Mutex<Option<BestNetworkHandler>>,
}

/// State readable by callers while a run is in flight. The engine is the
/// only writer; readers go through the runner's accessors.
pub(crate) struct SharedState {
    /// Completed-generation counter.
    pub generation: AtomicU64,
    /// Highest-scoring network seen across all generations.
    pub best: Mutex<Option<ScoredNetwork>>,
}

impl SharedState {
    fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            best: Mutex::new(None),
        }
    }
}

/// Run-time failures of the generation loop. All of these abort the run;
/// none are retried.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Evaluation produced no results for a non-empty population. This is
    /// a defect in the engine, not caller misuse.
    #[error("fitness evaluation returned no results")]
    EmptyEvaluation,
    /// The assembled next generation has the wrong number of children.
    #[error("next generation holds {actual} children, expected {expected}")]
    ChildCountMismatch { expected: usize, actual: usize },
    /// The caller's fitness function failed for one candidate.
    #[error("fitness function failed for candidate {identity}")]
    Fitness {
        identity: usize,
        #[source]
        source: FitnessError,
    },
}

/// Evolves one population generation by generation.
///
/// The engine is the synchronous core: [`step`](Self::step) runs exactly
/// one generation and [`run`](Self::run) loops until cancelled. The
/// [`EvolutionRunner`](super::EvolutionRunner) wraps it with a
/// start/stop lifecycle on a background thread.
pub struct EvolutionEngine {
    settings: EvolutionSettings,
    fitness: Arc<dyn FitnessFunction>,
    population: Vec<Network>,
    rng: StdRng,
    shared: Arc<SharedState>,
    handlers: Arc<Handlers>,
}

impl EvolutionEngine {
    /// Engine with a fresh random population. Fails on invalid settings;
    /// no engine exists until they pass.
    pub fn new(
        settings: EvolutionSettings,
        fitness: impl FitnessFunction + 'static,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let mut rng = seeded_rng(settings.seed);
        let population = population::initialize(&settings, &mut rng);
        Ok(Self::from_parts(settings, Arc::new(fitness), population, rng))
    }

    /// Engine whose population is rebuilt around one existing network.
    /// The settings topology must match the network's own; everything is
    /// validated before any population is built.
    pub fn from_network(
        network: Network,
        settings: EvolutionSettings,
        fitness: impl FitnessFunction + 'static,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        if settings.topology != network.topology() {
            return Err(ConfigError::TopologyMismatch);
        }
        let mut rng = seeded_rng(settings.seed);
        let base_seed = rng.r#gen();
        let population = population::reconstruct(network, &settings, base_seed);
        Ok(Self::from_parts(settings, Arc::new(fitness), population, rng))
    }

    fn from_parts(
        settings: EvolutionSettings,
        fitness: Arc<dyn FitnessFunction>,
        population: Vec<Network>,
        rng: StdRng,
    ) -> Self {
        Self {
            settings,
            fitness,
            population,
            rng,
            shared: Arc::new(SharedState::new()),
            handlers: Arc::new(Handlers::default()),
        }
    }

    pub(crate) fn shared_state(&self) -> Arc<SharedState> {
        Arc::clone(&self.shared)
    }

    pub(crate) fn handler_slots(&self) -> Arc<Handlers> {
        Arc::clone(&self.handlers)
    }

    /// Number of completed generations.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Relaxed)
    }

    /// Best score seen so far, `None` before the first generation.
    pub fn best_score(&self) -> Option<f64> {
        self.shared
            .best
            .lock()
            .expect("best record lock poisoned")
            .as_ref()
            .map(|b| b.score)
    }

    /// Clone of the best network seen so far.
    pub fn best_network(&self) -> Option<Network> {
        self.shared
            .best
            .lock()
            .expect("best record lock poisoned")
            .as_ref()
            .map(|b| b.network.clone())
    }

    /// The current generation's networks.
    pub fn population(&self) -> &[Network] {
        &self.population
    }

    /// Run exactly one generation and return its report.
    pub fn step(&mut self) -> Result<GenerationReport, EngineError> {
        let scored = evaluate::evaluate(&self.population, self.fitness.as_ref())?;
        let n = scored.len();

        // Single scan: generation best (first occurrence wins ties) and
        // the score sum for the mean.
        let mut best_index = 0;
        let mut sum = 0.0;
        for (i, s) in scored.iter().enumerate() {
            sum += s.score;
            if s.score > scored[best_index].score {
                best_index = i;
            }
        }
        let generation_best = &scored[best_index];

        // All-time best advances only on strict improvement, so its score
        // never decreases over the engine's lifetime.
        let previous_best = self
            .shared
            .best
            .lock()
            .expect("best record lock poisoned")
            .as_ref()
            .map(|b| b.score)
            .unwrap_or(f64::MIN);
        let improved = generation_best.score > previous_best;
        if improved {
            *self.shared.best.lock().expect("best record lock poisoned") =
                Some(generation_best.clone());
            info!(
                "new best score {:.6} at generation {}",
                generation_best.score,
                self.generation()
            );
            if let Some(handler) = self
                .handlers
                .best_network
                .lock()
                .expect("handler lock poisoned")
                .as_ref()
            {
                handler(&generation_best.network, generation_best.score);
            }
        }
        let all_time_best = if improved {
            generation_best.score
        } else {
            previous_best
        };

        let report = GenerationReport {
            generation: self.generation(),
            best_score: generation_best.score,
            mean_score: sum / n as f64,
            all_time_best,
        };
        debug!(
            "generation {}: best {:.6}, mean {:.6}, all-time {:.6}",
            report.generation, report.best_score, report.mean_score, report.all_time_best
        );
        if let Some(handler) = self
            .handlers
            .progress
            .lock()
            .expect("handler lock poisoned")
            .as_ref()
        {
            handler(&report);
        }
        self.shared.generation.fetch_add(1, Ordering::Relaxed);

        let pool = tournament_pool(&scored, &mut self.rng);

        let elite = self.settings.elite_count;
        let mut children = elite_children(&pool, elite);

        let breeding = breeding_pool(pool, elite);
        for _ in 0..n - elite {
            children.push(breed(&breeding, &mut self.rng));
        }

        if children.len() != n {
            return Err(EngineError::ChildCountMismatch {
                expected: n,
                actual: children.len(),
            });
        }

        // Every child mutates, elites included, each on its own RNG.
        let rate = self.settings.mutation_rate;
        let seeds: Vec<u64> = (0..children.len()).map(|_| self.rng.r#gen()).collect();
        children
            .par_iter_mut()
            .zip(seeds.into_par_iter())
            .for_each(|(child, seed)| {
                child.mutate(rate, &mut StdRng::seed_from_u64(seed));
            });

        self.population = children;
        Ok(report)
    }

    /// Run generations until `cancel` is observed. The flag is checked
    /// only at the top of the loop; a generation in progress always runs
    /// to completion.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<(), EngineError> {
        while !cancel.load(Ordering::Relaxed) {
            self.step()?;
        }
        Ok(())
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Uniform index in `0..len` other than `exclude`. With a single
/// candidate no distinct draw exists and `exclude` itself is returned.
fn distinct_index(rng: &mut StdRng, len: usize, exclude: usize) -> usize {
    if len <= 1 {
        return exclude;
    }
    let mut index = rng.gen_range(0..len - 1);
    if index >= exclude {
        index += 1;
    }
    index
}

/// Tournament selection: each slot `i` is paired against one distinct
/// random rival and the higher-scoring of the two advances. Ties keep the
/// slot's own candidate.
fn tournament_pool(scored: &[ScoredNetwork], rng: &mut StdRng) -> Vec<ScoredNetwork> {
    let n = scored.len();
    (0..n)
        .map(|i| {
            let rival = distinct_index(rng, n, i);
            if scored[rival].score > scored[i].score {
                scored[rival].clone()
            } else {
                scored[i].clone()
            }
        })
        .collect()
}

/// The top `elite` networks of the pool by descending score, copied
/// unchanged.
fn elite_children(pool: &[ScoredNetwork], elite: usize) -> Vec<Network> {
    let mut ranked: Vec<&ScoredNetwork> = pool.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
        .into_iter()
        .take(elite)
        .map(|s| s.network.clone())
        .collect()
}

/// The pool used for parent pairing: sorted ascending by score with the
/// lowest `elite` entries dropped. This ordering is computed independently
/// of the elite ranking, so with tied scores at the boundary the two
/// discarded sets need not be complements.
fn breeding_pool(pool: Vec<ScoredNetwork>, elite: usize) -> Vec<ScoredNetwork> {
    let mut ascending = pool;
    ascending.sort_by(|a, b| a.score.total_cmp(&b.score));
    ascending.drain(..elite);
    ascending
}

/// One crossover child from two distinct random parents. A pool of one
/// degenerates to cloning the lone candidate.
fn breed(pool: &[ScoredNetwork], rng: &mut StdRng) -> Network {
    let a = rng.gen_range(0..pool.len());
    let b = distinct_index(rng, pool.len(), a);
    if a == b {
        pool[a].network.clone()
    } else {
        pool[a].network.crossover(&pool[b].network, rng)
    }
}
