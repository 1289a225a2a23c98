//! # Watch Loop
//!
//! Wires the reconciler into the `kube_runtime` controller. The controller
//! serializes invocations per account and runs distinct accounts concurrently.

use super::context::ControllerContext;
use super::error_policy::handle_reconciliation_error;
use crate::controller::provision::Provisioner;
use crate::controller::reconciler::ReconcilerError;
use crate::controller::server::ServerState;
use crate::crd::{AccountKey, Aws};
use crate::observability;
use crate::store::AccountStore;
use anyhow::Result;
use futures::StreamExt;
use kube::Api;
use kube_runtime::controller::{self, Action};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Reconcile one account under the configured deadline
///
/// On expiry the in-flight store call is dropped and the error policy
/// schedules a retry.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub async fn reconcile_account<S, P>(
    obj: Arc<Aws>,
    ctx: Arc<ControllerContext<S, P>>,
) -> Result<Action, ReconcilerError>
where
    S: AccountStore,
    P: Provisioner,
{
    let key = AccountKey::from_resource(&obj);
    let timeout = ctx.config.reconcile_timeout();
    observability::metrics::increment_reconciliations();

    let start = Instant::now();
    let result = tokio::time::timeout(timeout, ctx.reconciler.reconcile(&key)).await;
    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    let outcome = match result {
        Ok(outcome) => outcome?,
        Err(_) => return Err(ReconcilerError::Timeout { key, timeout }),
    };

    ctx.reset_backoff(&key);
    Ok(outcome.into())
}

/// Run the controller until SIGINT/SIGTERM
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub async fn run_watch_loop<S, P>(
    accounts: Api<Aws>,
    ctx: Arc<ControllerContext<S, P>>,
    server_state: Arc<ServerState>,
) -> Result<()>
where
    S: AccountStore + 'static,
    P: Provisioner + 'static,
{
    let concurrency = ctx.config.max_concurrent_reconciles;
    info!(
        "Starting Aws account controller (max concurrent reconciles: {})",
        concurrency
    );

    Controller::new(accounts, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(
            reconcile_account::<S, P>,
            handle_reconciliation_error::<S, P>,
            ctx,
        )
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => {
                    debug!(resource = %object, ?action, "Reconciliation completed");
                }
                Err(controller::Error::ReconcilerFailed(_, object)) => {
                    debug!(resource = %object, "Reconciliation failed, retry scheduled");
                }
                Err(e) => {
                    warn!(error = %e, "Controller stream error");
                }
            }
        })
        .await;

    server_state.set_ready(false);
    info!("Controller stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::provision::ProvisionError;
    use crate::controller::reconciler::Reconciler;
    use crate::crd::{AccountPhase, AwsSpec};
    use crate::store::InMemoryAccountStore;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Debug)]
    struct SlowProvisioner;

    #[async_trait]
    impl Provisioner for SlowProvisioner {
        async fn provision(&self, _account: &Aws) -> Result<(), ProvisionError> {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct StalledProvisioner;

    #[async_trait]
    impl Provisioner for StalledProvisioner {
        async fn provision(&self, _account: &Aws) -> Result<(), ProvisionError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn account() -> Aws {
        let mut account = Aws::new("sandbox", AwsSpec::default());
        account.metadata.namespace = Some("default".to_string());
        account
    }

    #[tokio::test]
    async fn test_successful_reconcile_awaits_change() {
        let store = Arc::new(InMemoryAccountStore::new());
        let stored = store.insert(account());
        let ctx = Arc::new(ControllerContext::new(
            Reconciler::new(Arc::clone(&store)),
            ControllerConfig::default(),
        ));

        let action = reconcile_account(Arc::new(stored), ctx).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(store.spec_writes(), 1);
    }

    #[tokio::test]
    async fn test_success_resets_backoff() {
        let store = Arc::new(InMemoryAccountStore::new());
        let stored = store.insert(account());
        let key = AccountKey::from_resource(&stored);
        let ctx = Arc::new(ControllerContext::new(
            Reconciler::new(Arc::clone(&store)),
            ControllerConfig::default(),
        ));
        ctx.next_error_backoff(&key);
        ctx.next_error_backoff(&key);

        reconcile_account(Arc::new(stored), Arc::clone(&ctx)).await.unwrap();

        assert_eq!(ctx.next_error_backoff(&key), (5, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_times_out() {
        let store = Arc::new(InMemoryAccountStore::new());
        let mut pending = account();
        pending.add_finalizer();
        pending.set_phase(AccountPhase::Pending);
        let stored = store.insert(pending);
        let config = ControllerConfig {
            reconcile_timeout_secs: 2,
            ..ControllerConfig::default()
        };
        let ctx = Arc::new(ControllerContext::new(
            Reconciler::with_provisioner(Arc::clone(&store), StalledProvisioner),
            config,
        ));

        let result = reconcile_account(Arc::new(stored), ctx).await;

        assert!(matches!(
            result,
            Err(ReconcilerError::Timeout { timeout, .. }) if timeout == Duration::from_secs(2)
        ));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_setting_still_makes_progress() {
        let store = Arc::new(InMemoryAccountStore::new());
        let mut pending = account();
        pending.add_finalizer();
        pending.set_phase(AccountPhase::Pending);
        let stored = store.insert(pending);
        let key = AccountKey::from_resource(&stored);
        let config = ControllerConfig {
            reconcile_timeout_secs: 0,
            ..ControllerConfig::default()
        }
        .normalized();
        let ctx = Arc::new(ControllerContext::new(
            Reconciler::with_provisioner(Arc::clone(&store), SlowProvisioner),
            config,
        ));

        let action = reconcile_account(Arc::new(stored), ctx).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert_eq!(store.get(&key).unwrap().phase(), Some(AccountPhase::Ready));
    }
}
