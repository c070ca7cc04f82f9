//! # Runtime
//!
//! Wiring between the kube-runtime `Controller` and the [`Reconciler`].
//!
//! - `initialization`: process startup (crypto provider, logging, metrics, HTTP server, clients)
//! - `watch_loop`: the controller stream and its secondary watches
//! - `error_policy`: requeue decisions after a failed reconcile

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::{ReconcileOutcome, Reconciler};
use crate::store::ResourceKey;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Shared state handed to every reconcile and error policy call
pub struct Context {
    pub reconciler: Reconciler,
    pub config: ControllerConfig,
    /// Per-resource backoff, so one failing import never slows down another
    backoff_states: Mutex<HashMap<ResourceKey, FibonacciBackoff>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Context {
    #[must_use]
    pub fn new(reconciler: Reconciler, config: ControllerConfig) -> Self {
        Self {
            reconciler,
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Next retry delay for `key` and the number of consecutive failures so far
    pub fn next_backoff(&self, key: &ResourceKey) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let backoff = states.entry(key.clone()).or_insert_with(|| {
                    FibonacciBackoff::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
                });
                let delay = backoff.next_backoff();
                (delay, backoff.attempts())
            }
            Err(e) => {
                warn!(
                    "Failed to lock backoff_states: {}, using minimum backoff",
                    e
                );
                (Duration::from_secs(self.config.backoff_min_secs), 0)
            }
        }
    }

    /// Forget the failure history of `key` after a successful pass
    pub fn reset_backoff(&self, key: &ResourceKey) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(key);
        }
    }

    /// Requeue after a successful pass
    ///
    /// Everything settles into a periodic resync. A remote delete requeues at
    /// once so the finalizer is dropped even if the status event is coalesced.
    #[must_use]
    pub fn action_for(&self, outcome: ReconcileOutcome) -> Action {
        match outcome {
            ReconcileOutcome::RemoteDeleted => Action::requeue(Duration::ZERO),
            ReconcileOutcome::NotFound | ReconcileOutcome::FinalizerRemoved => {
                Action::await_change()
            }
            ReconcileOutcome::FinalizerAdded
            | ReconcileOutcome::Imported
            | ReconcileOutcome::Synced => Action::requeue(self.config.resync_interval()),
        }
    }
}
