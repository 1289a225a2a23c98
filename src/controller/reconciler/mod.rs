//! # Reconciler
//!
//! Moves each `Aws` record through its lifecycle, one store write at a time.
//!
//! ## Sub-modules
//!
//! - `types` - Reconciler context, error type and requeue directive
//! - `reconcile` - The account state machine
//! - `classify` - Conflict vs. failure classification of store errors

mod classify;
mod reconcile;
mod types;

pub use types::{Outcome, Reconciler, ReconcilerError};
