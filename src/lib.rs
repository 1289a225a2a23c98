//! # Landing Zone Controller
//!
//! Library crate behind the `landing-zone-controller` binary.
//!
//! - [`crd`] - the `Aws` custom resource and its lifecycle phases
//! - [`store`] - read/write access to `Aws` records (Kubernetes or in-memory)
//! - [`controller`] - the reconciler, provisioning hook and probe server
//! - [`runtime`] - initialization, watch loop and error policy
//! - [`config`] - environment-driven configuration
//! - [`observability`] - Prometheus metrics

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod runtime;
pub mod store;

pub use controller::provision::{NoopProvisioner, ProvisionError, Provisioner};
pub use controller::reconciler::{Outcome, Reconciler, ReconcilerError};
pub use crd::{AccountKey, AccountPhase, Aws, AwsSpec, AwsStatus};
pub use store::{AccountStore, InMemoryAccountStore, InjectedFailure, KubeAccountStore, StoreError};
