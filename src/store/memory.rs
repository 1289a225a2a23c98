//! # In-Memory Account Store
//!
//! Deterministic [`AccountStore`] used by unit and integration tests.
//!
//! It models the parts of the API server the reconciler relies on:
//! - a monotonically increasing `resourceVersion` on every committed write
//! - compare-and-swap on that version for both write channels
//! - spec writes that cannot touch status and status writes that cannot touch spec
//! - physical removal once a deleting record has no finalizers left
//!
//! Failures can be injected per channel to exercise conflict and error paths.

use super::{AccountStore, StoreError};
use crate::crd::{AccountKey, Aws};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Failure returned by the next matching store call instead of executing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Reject the write as if another writer got there first
    Conflict,
    /// Fail with a generic backend error carrying this message
    Backend(String),
}

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<AccountKey, Aws>,
    version: u64,
    spec_writes: usize,
    status_writes: usize,
    fetch_failures: VecDeque<InjectedFailure>,
    spec_failures: VecDeque<InjectedFailure>,
    status_failures: VecDeque<InjectedFailure>,
}

impl Inner {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    fn check_version(&self, key: &AccountKey, incoming: &Aws) -> Result<(), StoreError> {
        let stored = self
            .records
            .get(key)
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })?;
        if stored.resource_version() == incoming.resource_version() {
            Ok(())
        } else {
            Err(StoreError::Conflict { key: key.clone() })
        }
    }

    fn erase_if_released(&mut self, key: &AccountKey) {
        let released = self
            .records
            .get(key)
            .is_some_and(|a| a.is_being_deleted() && a.finalizers().is_empty());
        if released {
            self.records.remove(key);
        }
    }
}

fn into_error(key: &AccountKey, failure: InjectedFailure) -> StoreError {
    match failure {
        InjectedFailure::Conflict => StoreError::Conflict { key: key.clone() },
        InjectedFailure::Backend(message) => StoreError::Backend(message),
    }
}

fn now() -> Result<Time, StoreError> {
    let stamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    serde_json::from_value(serde_json::Value::String(stamp))
        .map_err(|e| StoreError::Backend(format!("invalid deletion timestamp: {e}")))
}

/// Thread-safe in-memory store for `Aws` records
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: Mutex<Inner>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a record as an external author would, assigning a fresh version.
    /// Records without a namespace land in `default`.
    pub fn insert(&self, mut account: Aws) -> Aws {
        if account.metadata.namespace.is_none() {
            account.metadata.namespace = Some("default".to_string());
        }
        let key = AccountKey::from_resource(&account);
        let mut inner = self.lock();
        account.metadata.resource_version = Some(inner.next_version());
        inner.records.insert(key, account.clone());
        account
    }

    /// Snapshot of the committed record
    pub fn get(&self, key: &AccountKey) -> Option<Aws> {
        self.lock().records.get(key).cloned()
    }

    pub fn contains(&self, key: &AccountKey) -> bool {
        self.lock().records.contains_key(key)
    }

    /// Apply an out-of-band change, as a concurrent writer would.
    /// Returns `false` if the record does not exist.
    pub fn modify(&self, key: &AccountKey, change: impl FnOnce(&mut Aws)) -> bool {
        let mut inner = self.lock();
        if !inner.records.contains_key(key) {
            return false;
        }
        let version = inner.next_version();
        if let Some(account) = inner.records.get_mut(key) {
            change(account);
            account.metadata.resource_version = Some(version);
        }
        true
    }

    /// Request deletion. Records without finalizers are erased immediately,
    /// the others stay until their finalizer list is emptied.
    pub fn delete(&self, key: &AccountKey) -> Result<(), StoreError> {
        let stamp = now()?;
        let mut inner = self.lock();
        let version = inner.next_version();
        let account = inner
            .records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })?;
        if account.metadata.deletion_timestamp.is_none() {
            account.metadata.deletion_timestamp = Some(stamp);
        }
        account.metadata.resource_version = Some(version);
        inner.erase_if_released(key);
        Ok(())
    }

    /// Number of committed spec writes
    pub fn spec_writes(&self) -> usize {
        self.lock().spec_writes
    }

    /// Number of committed status writes
    pub fn status_writes(&self) -> usize {
        self.lock().status_writes
    }

    /// Total number of committed writes across both channels
    pub fn writes(&self) -> usize {
        let inner = self.lock();
        inner.spec_writes + inner.status_writes
    }

    pub fn fail_next_fetch(&self, failure: InjectedFailure) {
        self.lock().fetch_failures.push_back(failure);
    }

    pub fn fail_next_spec_write(&self, failure: InjectedFailure) {
        self.lock().spec_failures.push_back(failure);
    }

    pub fn fail_next_status_write(&self, failure: InjectedFailure) {
        self.lock().status_failures.push_back(failure);
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn fetch(&self, key: &AccountKey) -> Result<Option<Aws>, StoreError> {
        let mut inner = self.lock();
        if let Some(failure) = inner.fetch_failures.pop_front() {
            return Err(into_error(key, failure));
        }
        Ok(inner.records.get(key).cloned())
    }

    async fn update_spec(&self, account: &Aws) -> Result<Aws, StoreError> {
        let key = AccountKey::from_resource(account);
        let mut inner = self.lock();
        if let Some(failure) = inner.spec_failures.pop_front() {
            return Err(into_error(&key, failure));
        }
        inner.check_version(&key, account)?;

        let version = inner.next_version();
        let committed = {
            let stored = inner
                .records
                .get_mut(&key)
                .ok_or_else(|| StoreError::NotFound { key: key.clone() })?;
            stored.spec = account.spec.clone();
            stored.metadata.finalizers = account.metadata.finalizers.clone();
            stored.metadata.labels = account.metadata.labels.clone();
            stored.metadata.annotations = account.metadata.annotations.clone();
            stored.metadata.resource_version = Some(version);
            stored.clone()
        };
        inner.spec_writes += 1;
        inner.erase_if_released(&key);
        Ok(committed)
    }

    async fn update_status(&self, account: &Aws) -> Result<Aws, StoreError> {
        let key = AccountKey::from_resource(account);
        let mut inner = self.lock();
        if let Some(failure) = inner.status_failures.pop_front() {
            return Err(into_error(&key, failure));
        }
        inner.check_version(&key, account)?;

        let version = inner.next_version();
        let stored = inner
            .records
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })?;
        stored.status = account.status.clone();
        stored.metadata.resource_version = Some(version);
        let committed = stored.clone();
        inner.status_writes += 1;
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{AccountPhase, AwsSpec};

    fn account(name: &str) -> Aws {
        Aws::new(
            name,
            AwsSpec {
                account_id: "123".to_string(),
                account_name: "acct".to_string(),
                management_account_id: "mgmt-1".to_string(),
                tags: BTreeMap::new(),
            },
        )
    }

    #[test]
    fn test_insert_assigns_namespace_and_version() {
        let store = InMemoryAccountStore::new();
        let stored = store.insert(account("a"));
        assert_eq!(stored.metadata.namespace.as_deref(), Some("default"));
        assert_eq!(stored.resource_version().as_deref(), Some("1"));
        assert!(store.contains(&AccountKey::new("default", "a")));
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        let store = InMemoryAccountStore::new();
        let stale = store.insert(account("a"));
        let key = AccountKey::from_resource(&stale);
        assert!(store.modify(&key, |a| {
            a.spec.tags.insert("team".into(), "platform".into());
        }));

        let mut update = stale.clone();
        update.add_finalizer();
        let err = store.update_spec(&update).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.spec_writes(), 0);
    }

    #[test]
    fn test_modify_missing_record_keeps_version_sequence() {
        let store = InMemoryAccountStore::new();
        let stored = store.insert(account("a"));
        let key = AccountKey::from_resource(&stored);

        assert!(!store.modify(&AccountKey::new("default", "ghost"), |_| {}));
        assert!(store.modify(&key, |a| a.spec.account_name = "renamed".to_string()));

        assert_eq!(store.get(&key).unwrap().resource_version().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_status_write_leaves_finalizers_alone() {
        let store = InMemoryAccountStore::new();
        let current = store.insert(account("a"));
        let key = AccountKey::from_resource(&current);

        let mut update = current.clone();
        update.add_finalizer();
        update.set_phase(AccountPhase::Pending);
        let committed = store.update_status(&update).await.unwrap();

        assert_eq!(committed.state(), "PENDING");
        assert!(!committed.has_finalizer());
        assert!(!store.get(&key).unwrap().has_finalizer());
        assert_eq!(store.status_writes(), 1);
    }

    #[tokio::test]
    async fn test_spec_write_leaves_status_alone() {
        let store = InMemoryAccountStore::new();
        let current = store.insert(account("a"));

        let mut update = current.clone();
        update.add_finalizer();
        update.set_phase(AccountPhase::Ready);
        let committed = store.update_spec(&update).await.unwrap();

        assert!(committed.has_finalizer());
        assert_eq!(committed.state(), "");
    }

    #[tokio::test]
    async fn test_delete_waits_for_finalizers() {
        let store = InMemoryAccountStore::new();
        let mut claimed = store.insert(account("a"));
        claimed.add_finalizer();
        let claimed = store.update_spec(&claimed).await.unwrap();
        let key = AccountKey::from_resource(&claimed);

        store.delete(&key).unwrap();
        let mut deleting = store.get(&key).unwrap();
        assert!(deleting.is_being_deleted());

        deleting.remove_finalizer();
        store.update_spec(&deleting).await.unwrap();
        assert!(!store.contains(&key));
    }

    #[test]
    fn test_delete_without_finalizers_erases_immediately() {
        let store = InMemoryAccountStore::new();
        let stored = store.insert(account("a"));
        let key = AccountKey::from_resource(&stored);
        store.delete(&key).unwrap();
        assert!(!store.contains(&key));
    }

    #[tokio::test]
    async fn test_injected_failures_are_one_shot() {
        let store = InMemoryAccountStore::new();
        let stored = store.insert(account("a"));
        let key = AccountKey::from_resource(&stored);

        store.fail_next_fetch(InjectedFailure::Backend("etcd unavailable".into()));
        assert!(matches!(
            store.fetch(&key).await,
            Err(StoreError::Backend(msg)) if msg == "etcd unavailable"
        ));
        assert!(store.fetch(&key).await.unwrap().is_some());
    }
}
