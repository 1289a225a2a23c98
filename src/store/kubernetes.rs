//! # Kubernetes Account Store
//!
//! [`AccountStore`] backed by the Kubernetes API server.
//!
//! Writes are JSON merge patches that carry `metadata.resourceVersion`. The API
//! server treats a resourceVersion in the patch body as a precondition, so a
//! stale write is rejected with 409 Conflict instead of overwriting a
//! concurrent change.

use super::{AccountStore, StoreError};
use crate::constants;
use crate::crd::{AccountKey, Aws};
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::debug;

/// Kubernetes-backed store for `Aws` records
#[derive(Clone)]
pub struct KubeAccountStore {
    client: Client,
}

impl std::fmt::Debug for KubeAccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeAccountStore").finish_non_exhaustive()
    }
}

impl KubeAccountStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Aws> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl AccountStore for KubeAccountStore {
    async fn fetch(&self, key: &AccountKey) -> Result<Option<Aws>, StoreError> {
        self.api(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| StoreError::from_kube(key, e))
    }

    async fn update_spec(&self, account: &Aws) -> Result<Aws, StoreError> {
        let key = AccountKey::from_resource(account);
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": account.resource_version(),
                "finalizers": account.finalizers(),
            }
        });

        debug!(
            resource.namespace = %key.namespace,
            resource.name = %key.name,
            "Patching finalizers"
        );

        self.api(&key.namespace)
            .patch(
                &key.name,
                &PatchParams::apply(constants::FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| StoreError::from_kube(&key, e))
    }

    async fn update_status(&self, account: &Aws) -> Result<Aws, StoreError> {
        let key = AccountKey::from_resource(account);
        let status = serde_json::to_value(&account.status).map_err(|source| {
            StoreError::Serialization {
                key: key.clone(),
                source,
            }
        })?;
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": account.resource_version(),
            },
            "status": status
        });

        debug!(
            resource.namespace = %key.namespace,
            resource.name = %key.name,
            state = account.state(),
            "Patching status"
        );

        self.api(&key.namespace)
            .patch_status(
                &key.name,
                &PatchParams::apply(constants::FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| StoreError::from_kube(&key, e))
    }
}
