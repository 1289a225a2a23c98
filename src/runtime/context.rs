//! # Controller Context
//!
//! State shared by every reconcile and error-policy invocation.

use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffState;
use crate::controller::provision::{NoopProvisioner, Provisioner};
use crate::controller::reconciler::Reconciler;
use crate::crd::AccountKey;
use crate::store::AccountStore;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

/// Reconciler plus the per-resource retry state owned by the runtime
#[derive(Debug)]
pub struct ControllerContext<S, P = NoopProvisioner> {
    pub reconciler: Reconciler<S, P>,
    pub config: ControllerConfig,
    /// Backoff state per resource, keyed by namespace/name
    pub(crate) backoff_states: Mutex<HashMap<AccountKey, BackoffState>>,
}

impl<S: AccountStore, P: Provisioner> ControllerContext<S, P> {
    pub fn new(reconciler: Reconciler<S, P>, config: ControllerConfig) -> Self {
        let reconciler = reconciler.conflict_requeue(config.conflict_requeue());
        Self {
            reconciler,
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }
}

impl<S, P> ControllerContext<S, P> {
    /// Record a failure for `key` and return the delay before the next attempt
    /// together with the consecutive error count.
    pub fn next_error_backoff(&self, key: &AccountKey) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.clone()).or_insert_with(|| {
                    BackoffState::new(
                        self.config.error_backoff_min_secs,
                        self.config.error_backoff_max_secs,
                    )
                });
                state.increment_error();
                (state.backoff.next_backoff_seconds(), state.error_count)
            }
            Err(e) => {
                warn!(
                    "Failed to lock backoff_states: {}, using default backoff",
                    e
                );
                (self.config.error_backoff_min_secs, 0)
            }
        }
    }

    /// Forget the failure history of `key` after a successful reconciliation
    pub fn reset_backoff(&self, key: &AccountKey) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                states.remove(key);
            }
            Err(e) => warn!("Failed to lock backoff_states: {}, backoff not reset", e),
        }
    }
}
