//! # Reconciliation Configuration
//!
//! Timing and concurrency settings for the reconcile loop.

use super::env_var_or_default;
use crate::constants::{
    DEFAULT_CONFLICT_REQUEUE_SECS, DEFAULT_ERROR_BACKOFF_MAX_SECS, DEFAULT_ERROR_BACKOFF_MIN_SECS,
    DEFAULT_MAX_CONCURRENT_RECONCILES, DEFAULT_RECONCILE_TIMEOUT_SECS,
};
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch. `None` watches every namespace.
    pub watch_namespace: Option<String>,
    /// Requeue delay after a resource version conflict (seconds)
    pub conflict_requeue_secs: u64,
    /// First retry delay after a failed reconciliation (seconds)
    pub error_backoff_min_secs: u64,
    /// Upper bound for the retry delay (seconds)
    pub error_backoff_max_secs: u64,
    /// Deadline for a single reconciliation (seconds)
    pub reconcile_timeout_secs: u64,
    /// Number of distinct accounts reconciled in parallel
    pub max_concurrent_reconciles: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            conflict_requeue_secs: DEFAULT_CONFLICT_REQUEUE_SECS,
            error_backoff_min_secs: DEFAULT_ERROR_BACKOFF_MIN_SECS,
            error_backoff_max_secs: DEFAULT_ERROR_BACKOFF_MAX_SECS,
            reconcile_timeout_secs: DEFAULT_RECONCILE_TIMEOUT_SECS,
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|ns| !ns.trim().is_empty()),
            conflict_requeue_secs: env_var_or_default(
                "CONFLICT_REQUEUE_SECS",
                DEFAULT_CONFLICT_REQUEUE_SECS,
            ),
            error_backoff_min_secs: env_var_or_default(
                "ERROR_BACKOFF_MIN_SECS",
                DEFAULT_ERROR_BACKOFF_MIN_SECS,
            ),
            error_backoff_max_secs: env_var_or_default(
                "ERROR_BACKOFF_MAX_SECS",
                DEFAULT_ERROR_BACKOFF_MAX_SECS,
            ),
            reconcile_timeout_secs: env_var_or_default(
                "RECONCILE_TIMEOUT_SECS",
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            ),
            max_concurrent_reconciles: env_var_or_default(
                "MAX_CONCURRENT_RECONCILES",
                DEFAULT_MAX_CONCURRENT_RECONCILES,
            ),
        }
        .normalized()
    }

    /// Clamp inconsistent values: the backoff ceiling never sits below the
    /// floor, a reconciliation gets at least one second and at least one
    /// runs at a time.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.error_backoff_min_secs = self.error_backoff_min_secs.max(1);
        self.error_backoff_max_secs = self.error_backoff_max_secs.max(self.error_backoff_min_secs);
        self.max_concurrent_reconciles = self.max_concurrent_reconciles.max(1);
        self.reconcile_timeout_secs = self.reconcile_timeout_secs.max(1);
        self
    }

    pub fn conflict_requeue(&self) -> Duration {
        Duration::from_secs(self.conflict_requeue_secs)
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.watch_namespace, None);
        assert_eq!(config.conflict_requeue(), Duration::from_secs(1));
        assert_eq!(config.reconcile_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_concurrent_reconciles, 4);
    }

    #[test]
    fn test_normalized_clamps_backoff_and_concurrency() {
        let config = ControllerConfig {
            error_backoff_min_secs: 0,
            error_backoff_max_secs: 0,
            max_concurrent_reconciles: 0,
            reconcile_timeout_secs: 0,
            ..ControllerConfig::default()
        }
        .normalized();
        assert_eq!(config.error_backoff_min_secs, 1);
        assert_eq!(config.error_backoff_max_secs, 1);
        assert_eq!(config.max_concurrent_reconciles, 1);
        assert_eq!(config.reconcile_timeout(), Duration::from_secs(1));

        let inverted = ControllerConfig {
            error_backoff_min_secs: 60,
            error_backoff_max_secs: 10,
            ..ControllerConfig::default()
        }
        .normalized();
        assert_eq!(inverted.error_backoff_max_secs, 60);
    }
}
