//! # Constants
//!
//! Default values and well-known names shared across the controller.

/// Finalizer token this controller places on every claimed account
pub const FINALIZER: &str = "aws.finalizers.itpe.suse.com";

/// Field manager used for server-side writes
pub const FIELD_MANAGER: &str = "landing-zone-controller";

/// Default HTTP port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default time to wait for the HTTP server to bind (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default interval between server readiness checks (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Requeue delay after an optimistic-concurrency conflict (seconds)
pub const DEFAULT_CONFLICT_REQUEUE_SECS: u64 = 1;

/// First retry delay after a reconciliation error (seconds)
pub const DEFAULT_ERROR_BACKOFF_MIN_SECS: u64 = 5;

/// Upper bound for the error retry delay (seconds)
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Deadline for a single reconciliation (seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 30;

/// Default number of accounts reconciled in parallel
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 4;

