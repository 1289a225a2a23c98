//! # Controller
//!
//! Reconciliation logic for `Aws` accounts plus the probe/metrics server.

pub mod backoff;
pub mod provision;
pub mod reconciler;
pub mod server;
