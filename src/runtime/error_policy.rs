//! # Error Policy
//!
//! Requeue decision for failed reconciliations. Conflicts never reach this
//! point; they are turned into a short requeue inside the reconciler.

use super::context::ControllerContext;
use crate::controller::reconciler::ReconcilerError;
use crate::crd::{AccountKey, Aws};
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Handle reconciliation errors with exponential backoff
///
/// Backoff state is tracked per resource so one failing account never slows
/// down the others.
pub fn handle_reconciliation_error<S, P>(
    obj: Arc<Aws>,
    error: &ReconcilerError,
    ctx: Arc<ControllerContext<S, P>>,
) -> Action {
    let key = AccountKey::from_resource(&obj);

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = %key.name,
        resource.namespace = %key.namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {}", key, error);
    observability::metrics::increment_reconciliation_errors();

    let (backoff_seconds, error_count) = ctx.next_error_backoff(&key);
    let next_trigger_time = i64::try_from(backoff_seconds)
        .ok()
        .and_then(chrono::TimeDelta::try_seconds)
        .and_then(|delay| chrono::Utc::now().checked_add_signed(delay))
        .map_or_else(|| "unknown".to_string(), |at| at.to_rfc3339());

    info!(
        "Retrying with exponential backoff: {}s (error count: {}, next retry at {})",
        backoff_seconds, error_count, next_trigger_time
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::reconciler::Reconciler;
    use crate::crd::AwsSpec;
    use crate::store::{InMemoryAccountStore, StoreError};

    fn account(name: &str) -> Arc<Aws> {
        let mut account = Aws::new(name, AwsSpec::default());
        account.metadata.namespace = Some("landing-zones".to_string());
        Arc::new(account)
    }

    fn error() -> ReconcilerError {
        ReconcilerError::Store {
            account_id: "123".to_string(),
            state: "PENDING".to_string(),
            source: StoreError::Backend("connection refused".to_string()),
        }
    }

    #[test]
    fn test_consecutive_errors_back_off_exponentially() {
        let config = ControllerConfig {
            error_backoff_min_secs: 5,
            error_backoff_max_secs: 30,
            ..ControllerConfig::default()
        };
        let ctx = Arc::new(ControllerContext::new(
            Reconciler::new(InMemoryAccountStore::new()),
            config,
        ));

        let delays: Vec<Action> = (0..4)
            .map(|_| handle_reconciliation_error(account("a"), &error(), Arc::clone(&ctx)))
            .collect();

        assert_eq!(
            delays,
            vec![
                Action::requeue(Duration::from_secs(5)),
                Action::requeue(Duration::from_secs(10)),
                Action::requeue(Duration::from_secs(20)),
                Action::requeue(Duration::from_secs(30)),
            ]
        );
    }

    #[test]
    fn test_errors_of_other_accounts_do_not_interfere() {
        let ctx = Arc::new(ControllerContext::new(
            Reconciler::new(InMemoryAccountStore::new()),
            ControllerConfig::default(),
        ));

        handle_reconciliation_error(account("a"), &error(), Arc::clone(&ctx));
        handle_reconciliation_error(account("a"), &error(), Arc::clone(&ctx));
        let action = handle_reconciliation_error(account("b"), &error(), ctx);

        assert_eq!(action, Action::requeue(Duration::from_secs(5)));
    }
}
