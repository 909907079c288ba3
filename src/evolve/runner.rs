//! Start/stop lifecycle around the evolution engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{error, info};

use crate::network::{Network, SnapshotError};
use crate::schema::{ConfigError, EvolutionSettings, GenerationReport};

use super::engine::{BestNetworkHandler, EvolutionEngine, Handlers, ProgressHandler, SharedState};
use super::evaluate::FitnessFunction;

/// Book-keeping for the active run. One mutex guards all of it, so
/// `start` and `stop` serialize against each other and themselves.
struct Lifecycle {
    running: bool,
    run_id: u64,
    cancel: Option<Arc<AtomicBool>>,
    handle: Option<JoinHandle<()>>,
}

/// Owns an [`EvolutionEngine`] and runs it on a supervised background
/// thread.
///
/// `start` and `stop` are idempotent no-op booleans, never errors. The
/// read accessors are safe to call concurrently with an active run. A
/// stopped runner can be started again; the new run resumes the same
/// population, and the best-ever record persists for the runner's
/// lifetime.
pub struct EvolutionRunner {
    engine: Arc<Mutex<EvolutionEngine>>,
    shared: Arc<SharedState>,
    handlers: Arc<Handlers>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl EvolutionRunner {
    /// Runner over a fresh random population. Fails on invalid settings.
    pub fn new(
        settings: EvolutionSettings,
        fitness: impl FitnessFunction + 'static,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_engine(EvolutionEngine::new(settings, fitness)?))
    }

    /// Runner whose population is rebuilt around one existing network,
    /// e.g. a deserialized snapshot. The settings topology must match the
    /// network's own.
    pub fn from_network(
        network: Network,
        settings: EvolutionSettings,
        fitness: impl FitnessFunction + 'static,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_engine(EvolutionEngine::from_network(
            network, settings, fitness,
        )?))
    }

    /// Runner rebuilt from a network snapshot byte stream. A malformed
    /// stream yields an error; no runner is constructed.
    pub fn from_bytes(
        bytes: &[u8],
        settings: EvolutionSettings,
        fitness: impl FitnessFunction + 'static,
    ) -> Result<Self, SnapshotError> {
        let network = Network::from_bytes(bytes)?;
        Ok(Self::from_network(network, settings, fitness)?)
    }

    fn from_engine(engine: EvolutionEngine) -> Self {
        let shared = engine.shared_state();
        let handlers = engine.handler_slots();
        Self {
            engine: Arc::new(Mutex::new(engine)),
            shared,
            handlers,
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                running: false,
                run_id: 0,
                cancel: None,
                handle: None,
            })),
        }
    }

    /// Register the once-per-generation progress handler.
    pub fn on_progress(&self, handler: impl Fn(&GenerationReport) + Send + Sync + 'static) {
        let boxed: ProgressHandler = Box::new(handler);
        *self
            .handlers
            .progress
            .lock()
            .expect("handler lock poisoned") = Some(boxed);
    }

    /// Register the handler invoked whenever the all-time best network is
    /// replaced.
    pub fn on_best_network(&self, handler: impl Fn(&Network, f64) + Send + Sync + 'static) {
        let boxed: BestNetworkHandler = Box::new(handler);
        *self
            .handlers
            .best_network
            .lock()
            .expect("handler lock poisoned") = Some(boxed);
    }

    /// Launch the background generation loop.
    ///
    /// Returns `false` without side effects when a run is already active.
    /// A new run after `stop` waits (on its own thread) for the previous
    /// run's in-flight generation to finish, then continues from the
    /// population it left behind.
    pub fn start(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        if lifecycle.running {
            return false;
        }

        let cancel = Arc::new(AtomicBool::new(false));
        lifecycle.run_id += 1;
        let run_id = lifecycle.run_id;
        lifecycle.running = true;
        lifecycle.cancel = Some(Arc::clone(&cancel));

        let engine = Arc::clone(&self.engine);
        let state = Arc::clone(&self.lifecycle);
        let handle = thread::spawn(move || {
            // The engine lock is held for the whole run, so a run started
            // while the previous one is finishing its last generation
            // simply queues behind it.
            let result = engine
                .lock()
                .expect("engine lock poisoned")
                .run(&cancel);
            if let Err(err) = result {
                error!("evolution run aborted: {err}");
            }
            let mut lifecycle = state.lock().expect("lifecycle lock poisoned");
            if lifecycle.run_id == run_id {
                lifecycle.running = false;
                lifecycle.cancel = None;
            }
        });
        lifecycle.handle = Some(handle);
        info!("evolution run {run_id} started");
        true
    }

    /// Signal the active run to stop and clear the running flag
    /// immediately, without waiting for the in-flight generation.
    ///
    /// Returns `false` when no run is active.
    pub fn stop(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
        if !lifecycle.running {
            return false;
        }
        if let Some(cancel) = lifecycle.cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
        lifecycle.running = false;
        info!("evolution run {} stopping", lifecycle.run_id);
        true
    }

    /// Block until the most recently started run's thread has exited.
    ///
    /// `stop` never waits for the in-flight generation; callers that need
    /// a quiescent engine (e.g. before process exit) can stop and then
    /// wait.
    pub fn wait(&self) {
        let handle = {
            let mut lifecycle = self.lifecycle.lock().expect("lifecycle lock poisoned");
            lifecycle.handle.take()
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Whether a run is currently active.
    pub fn is_running(&self) -> bool {
        self.lifecycle
            .lock()
            .expect("lifecycle lock poisoned")
            .running
    }

    /// Number of completed generations.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Relaxed)
    }

    /// Best score seen so far, `None` before the first generation.
    pub fn best_fitness(&self) -> Option<f64> {
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
}
