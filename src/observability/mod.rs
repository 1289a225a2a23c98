//! # Observability
//!
//! Prometheus metrics for the controller. Structured logging is configured in
//! [`crate::runtime::initialization`].

pub mod metrics;
