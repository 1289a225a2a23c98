//! # Store Error Classification
//!
//! Splits store failures into the two cases the reconciler distinguishes:
//! resource version conflicts, which are expected under optimistic concurrency
//! and resolve themselves on a short requeue, and everything else, which is
//! returned to the error policy, which logs it and applies the backoff.

use super::types::{Outcome, Reconciler, ReconcilerError};
use crate::observability;
use crate::store::StoreError;
use tracing::debug;

impl<S, P> Reconciler<S, P> {
    /// Turn a failed store call into a requeue directive or a reported error.
    ///
    /// `account_id` and `state` describe the record as it was read and only
    /// serve log correlation.
    pub(crate) fn classify(
        &self,
        account_id: &str,
        state: &str,
        error: StoreError,
    ) -> Result<Outcome, ReconcilerError> {
        if error.is_conflict() {
            debug!(
                account.id = %account_id,
                state = %state,
                requeue_after = ?self.conflict_requeue,
                "Resource version conflict, requeueing"
            );
            observability::metrics::increment_write_conflicts();
            observability::metrics::increment_requeues_total("conflict");
            return Ok(Outcome::RequeueAfter(self.conflict_requeue));
        }

        debug!(
            account.id = %account_id,
            state = %state,
            error = %error,
            "Store operation failed"
        );
        Err(ReconcilerError::Store {
            account_id: account_id.to_string(),
            state: state.to_string(),
            source: error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::AccountKey;
    use crate::store::InMemoryAccountStore;
    use std::time::Duration;

    fn reconciler() -> Reconciler<InMemoryAccountStore> {
        Reconciler::new(InMemoryAccountStore::new())
    }

    #[test]
    fn test_conflict_requeues_without_error() {
        let err = StoreError::Conflict {
            key: AccountKey::new("default", "a"),
        };
        let outcome = reconciler().classify("123", "PENDING", err).unwrap();
        assert_eq!(outcome, Outcome::RequeueAfter(Duration::from_secs(1)));
    }

    #[test]
    fn test_conflict_uses_configured_delay() {
        let reconciler = reconciler().conflict_requeue(Duration::from_millis(250));
        let err = StoreError::Conflict {
            key: AccountKey::new("default", "a"),
        };
        assert_eq!(
            reconciler.classify("123", "", err).unwrap(),
            Outcome::RequeueAfter(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_other_errors_are_surfaced() {
        let err = StoreError::Backend("connection reset".to_string());
        match reconciler().classify("123", "PENDING", err) {
            Err(ReconcilerError::Store {
                account_id,
                state,
                source,
            }) => {
                assert_eq!(account_id, "123");
                assert_eq!(state, "PENDING");
                assert!(matches!(source, StoreError::Backend(_)));
            }
            other => panic!("expected store error, got {other:?}"),
        }
    }

    #[test]
    fn test_not_found_on_write_is_surfaced() {
        let err = StoreError::NotFound {
            key: AccountKey::new("default", "a"),
        };
        assert!(reconciler().classify("123", "READY", err).is_err());
    }
}
