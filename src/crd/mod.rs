//! # Custom Resource Definitions
//!
//! CRD types for the Landing Zone Controller.
//!
//! The controller owns a single resource kind, `Aws`, which describes one AWS
//! account belonging to an organization. The spec is authored externally and is
//! read-only to the controller; the controller only touches the finalizer list
//! and `status.state`.

mod status;

pub use status::*;

use crate::constants;
use kube::CustomResource;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Aws Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: accounts.k8s.rubyrainbows.com/v1alpha1
/// kind: Aws
/// metadata:
///   name: sandbox
///   namespace: landing-zones
/// spec:
///   id: "123456789012"
///   name: sandbox
///   managementAccountId: "210987654321"
///   tags:
///     team: platform
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Aws",
    group = "accounts.k8s.rubyrainbows.com",
    version = "v1alpha1",
    namespaced,
    plural = "aws",
    status = "AwsStatus",
    printcolumn = r#"{"name":"ID", "type":"string", "jsonPath":".spec.id", "description":"The ID of the account"}"#,
    printcolumn = r#"{"name":"Name", "type":"string", "jsonPath":".spec.name", "description":"The name of the account"}"#,
    printcolumn = r#"{"name":"Management Account ID", "type":"string", "jsonPath":".spec.managementAccountId", "description":"The management account ID of the account"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state", "description":"The state of the account"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AwsSpec {
    /// Account identifier
    #[serde(rename = "id")]
    pub account_id: String,
    /// Human-readable account name
    #[serde(rename = "name")]
    pub account_name: String,
    /// The organization's management account id
    pub management_account_id: String,
    /// Account tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Namespaced identity of an `Aws` record
///
/// This is what the dispatcher hands the reconciler. The reconciler always
/// re-fetches the record behind it instead of trusting a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountKey {
    pub namespace: String,
    pub name: String,
}

impl AccountKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an existing object. Cluster-scoped lookups fall back to `default`.
    pub fn from_resource(account: &Aws) -> Self {
        Self {
            namespace: account.namespace().unwrap_or_else(|| "default".to_string()),
            name: account.name_any(),
        }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl Aws {
    /// Raw `status.state`; empty when the controller has not initialized the record
    pub fn state(&self) -> &str {
        self.status.as_ref().map_or("", |s| s.state.as_str())
    }

    /// Parsed phase, `None` when unset or not one of the known values
    pub fn phase(&self) -> Option<AccountPhase> {
        self.state().parse().ok()
    }

    /// Record `phase` in the status block, creating it when absent
    pub fn set_phase(&mut self, phase: AccountPhase) {
        self.status.get_or_insert_with(AwsStatus::default).state = phase.to_string();
    }

    /// Whether the record carries a deletion timestamp
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Whether this controller's finalizer is present
    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == constants::FINALIZER)
    }

    /// Add this controller's finalizer. Returns `false` if it was already present.
    pub fn add_finalizer(&mut self) -> bool {
        if self.has_finalizer() {
            return false;
        }
        self.finalizers_mut().push(constants::FINALIZER.to_string());
        true
    }

    /// Remove this controller's finalizer, keeping foreign tokens in order.
    /// Returns `false` if it was not present.
    pub fn remove_finalizer(&mut self) -> bool {
        if !self.has_finalizer() {
            return false;
        }
        self.finalizers_mut().retain(|f| f != constants::FINALIZER);
        true
    }
}
