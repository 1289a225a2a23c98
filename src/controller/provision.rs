//! # Account Provisioning
//!
//! Extension point invoked while an account is `PENDING`, before it is marked
//! `READY`. The controller ships with [`NoopProvisioner`]; real provisioning
//! (creating the account in the AWS organization, applying tags, moving it to
//! an OU) plugs in by implementing [`Provisioner`].

use crate::crd::Aws;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("provisioning account {account_id} failed: {reason}")]
    Failed { account_id: String, reason: String },
}

/// Performs the external work that makes an account ready
///
/// Implementations must be idempotent: a crash or a failed status write after
/// a successful call means `provision` runs again for the same account.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn provision(&self, account: &Aws) -> Result<(), ProvisionError>;
}

#[async_trait]
impl<T: Provisioner + ?Sized> Provisioner for Arc<T> {
    async fn provision(&self, account: &Aws) -> Result<(), ProvisionError> {
        (**self).provision(account).await
    }
}

/// Provisioner that performs no external work
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvisioner;

#[async_trait]
impl Provisioner for NoopProvisioner {
    async fn provision(&self, account: &Aws) -> Result<(), ProvisionError> {
        debug!(
            account.id = %account.spec.account_id,
            "No provisioning configured, nothing to do"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::AwsSpec;

    #[tokio::test]
    async fn test_noop_provisioner_succeeds() {
        let account = Aws::new(
            "sandbox",
            AwsSpec {
                account_id: "123".to_string(),
                ..AwsSpec::default()
            },
        );
        assert!(NoopProvisioner.provision(&account).await.is_ok());
    }

    #[test]
    fn test_provision_error_message() {
        let err = ProvisionError::Failed {
            account_id: "123".to_string(),
            reason: "organization quota exceeded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "provisioning account 123 failed: organization quota exceeded"
        );
    }
}
