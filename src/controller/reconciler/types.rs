//! # Reconciler Types
//!
//! The reconciler context, its error type and the requeue directive it returns.

use crate::constants;
use crate::controller::provision::{NoopProvisioner, ProvisionError, Provisioner};
use crate::crd::AccountKey;
use crate::store::{AccountStore, StoreError};
use kube_runtime::controller::Action;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("store operation failed for account {account_id} in state {state:?}: {source}")]
    Store {
        account_id: String,
        state: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("reconciliation of {key} did not finish within {timeout:?}")]
    Timeout { key: AccountKey, timeout: Duration },
}

/// Requeue directive returned by a successful reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do until the record changes again
    AwaitChange,
    /// Run again for the same record after the delay
    RequeueAfter(Duration),
}

impl From<Outcome> for Action {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::AwaitChange => Action::await_change(),
            Outcome::RequeueAfter(delay) => Action::requeue(delay),
        }
    }
}

/// Reconciler context shared by every invocation
///
/// Holds no per-record state; every call re-reads the record from `store`.
#[derive(Debug)]
pub struct Reconciler<S, P = NoopProvisioner> {
    pub(crate) store: S,
    pub(crate) provisioner: P,
    pub(crate) conflict_requeue: Duration,
}

impl<S: AccountStore> Reconciler<S> {
    /// Reconciler with the no-op provisioning hook
    pub fn new(store: S) -> Self {
        Self::with_provisioner(store, NoopProvisioner)
    }
}

impl<S: AccountStore, P: Provisioner> Reconciler<S, P> {
    pub fn with_provisioner(store: S, provisioner: P) -> Self {
        Self {
            store,
            provisioner,
            conflict_requeue: Duration::from_secs(constants::DEFAULT_CONFLICT_REQUEUE_SECS),
        }
    }

    /// Override the delay used after a resource version conflict
    #[must_use]
    pub fn conflict_requeue(mut self, delay: Duration) -> Self {
        self.conflict_requeue = delay;
        self
    }
}
