//! # Account Store
//!
//! The narrow contract the reconciler uses to read and write `Aws` records.
//!
//! Two independent write channels exist, mirroring the Kubernetes API:
//! `update_spec` persists desired-state fields and the finalizer list, while
//! `update_status` persists only the status block. Both are guarded by the
//! record's `resourceVersion`; a stale write fails with [`StoreError::Conflict`].
//!
//! - [`KubeAccountStore`] talks to the Kubernetes API server
//! - [`InMemoryAccountStore`] is a deterministic fake used by tests

mod kubernetes;
mod memory;

pub use kubernetes::KubeAccountStore;
pub use memory::{InjectedFailure, InMemoryAccountStore};

use crate::crd::{AccountKey, Aws};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failure returned by an [`AccountStore`]
///
/// Classification is structural so callers never inspect error text.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account {key} not found")]
    NotFound { key: AccountKey },

    #[error("resource version conflict writing account {key}")]
    Conflict { key: AccountKey },

    #[error("Kubernetes API error: {0}")]
    Api(#[source] kube::Error),

    #[error("failed to encode account {key}: {source}")]
    Serialization {
        key: AccountKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Map a Kubernetes client error for `key` onto the store taxonomy
    pub fn from_kube(key: &AccountKey, error: kube::Error) -> Self {
        match error {
            kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound { key: key.clone() },
            kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict { key: key.clone() },
            other => StoreError::Api(other),
        }
    }

    /// Another writer modified the record between our read and our write
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Read/write access to `Aws` records
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Latest committed record, `None` when it does not exist
    async fn fetch(&self, key: &AccountKey) -> Result<Option<Aws>, StoreError>;

    /// Persist desired-state fields, including the finalizer list
    async fn update_spec(&self, account: &Aws) -> Result<Aws, StoreError>;

    /// Persist only the status block
    async fn update_status(&self, account: &Aws) -> Result<Aws, StoreError>;
}

#[async_trait]
impl<T: AccountStore + ?Sized> AccountStore for Arc<T> {
    async fn fetch(&self, key: &AccountKey) -> Result<Option<Aws>, StoreError> {
        (**self).fetch(key).await
    }

    async fn update_spec(&self, account: &Aws) -> Result<Aws, StoreError> {
        (**self).update_spec(account).await
    }

    async fn update_status(&self, account: &Aws) -> Result<Aws, StoreError> {
        (**self).update_status(account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("request failed with {code}"),
            reason: reason.to_string(),
            code,
        })
    }

    fn key() -> AccountKey {
        AccountKey::new("landing-zones", "sandbox")
    }

    #[test]
    fn test_from_kube_maps_409_to_conflict() {
        let err = StoreError::from_kube(&key(), api_error(409, "Conflict"));
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
        assert!(matches!(err, StoreError::Conflict { key: k } if k == key()));
    }

    #[test]
    fn test_from_kube_maps_404_to_not_found() {
        let err = StoreError::from_kube(&key(), api_error(404, "NotFound"));
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_from_kube_keeps_other_api_errors() {
        let err = StoreError::from_kube(&key(), api_error(500, "InternalError"));
        assert!(!err.is_conflict());
        assert!(!err.is_not_found());
        assert!(matches!(err, StoreError::Api(kube::Error::Api(ref resp)) if resp.code == 500));
    }
}
