//! # Account State Machine
//!
//! One invocation reads the latest record and performs at most one write:
//!
//! | deletion timestamp | finalizer | state     | action                         |
//! |--------------------|-----------|-----------|--------------------------------|
//! | set                | present   | any       | remove finalizer (spec write)  |
//! | set                | absent    | any       | none                           |
//! | unset              | absent    | empty     | add finalizer (spec write)     |
//! | unset              | present   | empty     | state = PENDING (status write) |
//! | unset              | any       | PENDING   | provision, state = READY       |
//! | unset              | any       | other     | none                           |
//!
//! Deletion is checked before anything else so a record being torn down is
//! never pushed forward again.

use super::types::{Outcome, Reconciler, ReconcilerError};
use crate::controller::provision::Provisioner;
use crate::crd::{AccountKey, AccountPhase, Aws};
use crate::observability;
use crate::store::AccountStore;
use tracing::{debug, info, info_span, Instrument};

impl<S: AccountStore, P: Provisioner> Reconciler<S, P> {
    /// Drive the record behind `key` one step toward `READY`, or finish its
    /// cleanup if it is being deleted.
    pub async fn reconcile(&self, key: &AccountKey) -> Result<Outcome, ReconcilerError> {
        let span = info_span!(
            "reconcile",
            resource.namespace = %key.namespace,
            resource.name = %key.name
        );
        self.reconcile_inner(key).instrument(span).await
    }

    async fn reconcile_inner(&self, key: &AccountKey) -> Result<Outcome, ReconcilerError> {
        info!("Reconciling AWS objects");

        let account = match self.store.fetch(key).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                debug!("Account {} no longer exists, nothing to do", key);
                return Ok(Outcome::AwaitChange);
            }
            Err(e) if e.is_not_found() => {
                debug!("Account {} no longer exists, nothing to do", key);
                return Ok(Outcome::AwaitChange);
            }
            Err(e) => return self.classify(&key.to_string(), "", e),
        };

        if account.is_being_deleted() {
            return self.finalize(account).await;
        }

        info!(
            account.id = %account.spec.account_id,
            state = account.state(),
            "Reconciling AWS account by id \"{}\" with current state \"{}\"",
            account.spec.account_id,
            account.state()
        );

        match account.state() {
            "" if account.has_finalizer() => self.initialize(account).await,
            "" => self.claim(account).await,
            state if state == AccountPhase::Pending.as_str() => self.provision(account).await,
            _ => {
                debug!(
                    account.id = %account.spec.account_id,
                    "Account is settled, nothing to do"
                );
                Ok(Outcome::AwaitChange)
            }
        }
    }

    /// Deleting record: release it by dropping our finalizer. Status is never touched here.
    async fn finalize(&self, mut account: Aws) -> Result<Outcome, ReconcilerError> {
        if !account.remove_finalizer() {
            debug!(
                account.id = %account.spec.account_id,
                "Finalizer already removed, waiting for the store to erase the account"
            );
            return Ok(Outcome::AwaitChange);
        }

        info!(
            account.id = %account.spec.account_id,
            "Removing finalizer for AWS object: {}",
            account.metadata.name.as_deref().unwrap_or("unknown")
        );
        match self.store.update_spec(&account).await {
            Ok(_) => Ok(Outcome::AwaitChange),
            Err(e) => self.classify(&account.spec.account_id, account.state(), e),
        }
    }

    /// First sight of the record: protect it from deletion.
    ///
    /// The resulting update notification brings us back to [`Self::initialize`].
    async fn claim(&self, mut account: Aws) -> Result<Outcome, ReconcilerError> {
        info!(
            account.id = %account.spec.account_id,
            "Adding finalizer to AWS account by id \"{}\"",
            account.spec.account_id
        );
        account.add_finalizer();
        match self.store.update_spec(&account).await {
            Ok(_) => Ok(Outcome::AwaitChange),
            Err(e) => self.classify(&account.spec.account_id, account.state(), e),
        }
    }

    /// Claimed but not yet initialized: mark it `PENDING`.
    async fn initialize(&self, account: Aws) -> Result<Outcome, ReconcilerError> {
        info!(
            account.id = %account.spec.account_id,
            "Initializing AWS account by id \"{}\"",
            account.spec.account_id
        );
        self.transition(account, AccountPhase::Pending).await
    }

    /// Run the provisioning hook, then mark the account `READY`.
    async fn provision(&self, account: Aws) -> Result<Outcome, ReconcilerError> {
        info!(
            account.id = %account.spec.account_id,
            "Working on AWS object: {}",
            account.metadata.name.as_deref().unwrap_or("unknown")
        );

        if let Err(e) = self.provisioner.provision(&account).await {
            debug!(
                account.id = %account.spec.account_id,
                error = %e,
                "Provisioning failed, account stays PENDING"
            );
            return Err(ReconcilerError::Provision(e));
        }

        self.transition(account, AccountPhase::Ready).await
    }

    async fn transition(&self, mut account: Aws, phase: AccountPhase) -> Result<Outcome, ReconcilerError> {
        let previous = account.state().to_string();
        account.set_phase(phase);
        match self.store.update_status(&account).await {
            Ok(_) => {
                info!(
                    account.id = %account.spec.account_id,
                    from = %previous,
                    to = %phase,
                    "AWS account state changed"
                );
                observability::metrics::increment_phase_transitions(phase);
                Ok(Outcome::AwaitChange)
            }
            Err(e) => self.classify(&account.spec.account_id, &previous, e),
        }
    }
}
