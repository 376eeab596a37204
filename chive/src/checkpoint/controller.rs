//! Recompute policy controller.
//!
//! Decides, per checkpointed step and run instance, whether the step's value comes from the
//! store or from its function, and wires the save that follows a fresh computation.
//!
//! ```text
//! Fresh ── always / forced ─────────────► ForcedRecompute ──┐
//!   └── load ok ────────────────────────► CacheHit          ├─► Computed ─► Persisted
//!   └── load err, error-on-miss ────────► Fatal             │
//!   └── load err ───────────────────────► CacheMissRecompute┘
//! every tracked step ── teardown ───────► Restored
//! ```
//!
//! The host calls [`begin_instance`](RecomputeController::begin_instance), then
//! [`before_evaluate`](RecomputeController::before_evaluate) for each step it sets up, and
//! [`after_teardown`](RecomputeController::after_teardown) once the instance is done.

use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use super::key::{DependencySource, KeyBuilder};
use super::policy::{PolicyDescriptor, Recompute};
use super::store::{CheckpointStore, RecordId, StoreError};
use crate::error::NodeError;
use crate::lazy::LazyNode;
use crate::logging;
use crate::session::{ParamBinding, SessionContext};

/// Position of one checkpointed step in the per-instance state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckpointState {
    Fresh,
    ForcedRecompute,
    CacheHit,
    CacheMissRecompute,
    Computed,
    Persisted,
    Fatal,
    Restored,
}

/// How a step is evaluated in the current instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Serve this loaded value; the step's function and its upstream steps are not run.
    UseCache(Value),
    /// Run the real function; when `save_to` is set, persist the result there.
    Compute { save_to: Option<RecordId> },
}

/// Failure while setting up a run instance. No node of the output has been evaluated yet.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Policy is error-on-miss and the checkpoint could not be loaded.
    #[error("checkpoint `{record}` of `{node}` is required but could not be loaded: {source}")]
    MissingCheckpoint {
        node: String,
        record: RecordId,
        #[source]
        source: StoreError,
    },

    /// An eagerly evaluated input step failed.
    #[error("input `{node}` failed during setup: {source}")]
    Input {
        node: String,
        #[source]
        source: NodeError,
    },
}

type States = Arc<Mutex<IndexMap<String, CheckpointState>>>;

/// Per-step cache-hit / recompute decisions backed by a [`CheckpointStore`].
pub struct RecomputeController {
    store: Arc<dyn CheckpointStore>,
    states: States,
}

impl RecomputeController {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            store,
            states: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Resets every step to `Fresh` for a new run instance.
    pub fn begin_instance(&self) {
        lock(&self.states).clear();
    }

    /// Decides how `step` is evaluated for `binding`.
    ///
    /// Steps without a policy are always computed and never saved. For checkpointed steps the
    /// store is consulted unless the policy or `session` forces recomputation. Load failures
    /// turn into a recompute, except under [`Recompute::ErrorOnMiss`].
    pub fn before_evaluate<D>(
        &self,
        step: &str,
        policy: Option<&PolicyDescriptor>,
        binding: &ParamBinding,
        deps: &D,
        session: &SessionContext,
    ) -> Result<Evaluation, SetupError>
    where
        D: DependencySource + ?Sized,
    {
        let Some(policy) = policy else {
            return Ok(Evaluation::Compute { save_to: None });
        };
        self.set_state(step, CheckpointState::Fresh);
        if policy.replicate.is_some() {
            logging::log_replicate_ignored(step);
        }

        let key = KeyBuilder::new(deps).key_for(step, binding);
        let record = RecordId::new(key, policy.record_name(step));

        if policy.recompute == Recompute::Always || session.force_recompute() {
            logging::log_forced_recompute(step, &record.key);
            self.set_state(step, CheckpointState::ForcedRecompute);
            return Ok(Evaluation::Compute {
                save_to: Some(record),
            });
        }

        match self.store.load(&record) {
            Ok(value) => {
                logging::log_checkpoint_loaded(step, &record.key);
                self.set_state(step, CheckpointState::CacheHit);
                Ok(Evaluation::UseCache(value))
            }
            Err(source) if policy.recompute == Recompute::ErrorOnMiss => {
                self.set_state(step, CheckpointState::Fatal);
                Err(SetupError::MissingCheckpoint {
                    node: step.to_string(),
                    record,
                    source,
                })
            }
            Err(e) => {
                logging::log_checkpoint_miss(step, &record.key, &e);
                self.set_state(step, CheckpointState::CacheMissRecompute);
                Ok(Evaluation::Compute {
                    save_to: Some(record),
                })
            }
        }
    }

    /// Attaches the save callback that persists `node`'s value to `record` after it computes.
    pub fn attach_save(&self, node: &LazyNode, record: RecordId) {
        let store = self.store.clone();
        let states = self.states.clone();
        let step = node.name().to_string();
        node.set_save_callback(Box::new(move |value| {
            lock(&states).insert(step.clone(), CheckpointState::Computed);
            store.save(&record, value)?;
            logging::log_checkpoint_saved(&step, &record.key);
            lock(&states).insert(step.clone(), CheckpointState::Persisted);
            Ok(())
        }));
    }

    /// Marks `step` as restored; its per-instance decision no longer applies.
    pub fn after_teardown(&self, step: &str) {
        let mut states = lock(&self.states);
        if let Some(state) = states.get_mut(step) {
            *state = CheckpointState::Restored;
        }
    }

    /// Current state of a checkpointed step, if it was set up in this instance.
    pub fn state(&self, step: &str) -> Option<CheckpointState> {
        lock(&self.states).get(step).copied()
    }

    /// Snapshot of all tracked steps in setup order.
    pub fn states(&self) -> Vec<(String, CheckpointState)> {
        lock(&self.states)
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    fn set_state(&self, step: &str, state: CheckpointState) {
        lock(&self.states).insert(step.to_string(), state);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
