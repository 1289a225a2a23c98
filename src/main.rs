//! # Landing Zone Controller
//!
//! A Kubernetes controller that manages the lifecycle of `Aws` account
//! resources for cloud landing zones.
//!
//! ## Overview
//!
//! For every `Aws` resource the controller:
//!
//! 1. **Claims it** - adds a finalizer so the record cannot disappear unseen
//! 2. **Initializes it** - sets `status.state` to `PENDING`
//! 3. **Provisions it** - runs the provisioning hook and sets `READY`
//! 4. **Releases it** - removes the finalizer once deletion is requested
//!
//! Settings come from environment variables; the flags below override them.

use anyhow::Result;
use clap::Parser;
use landing_zone_controller::config::{self, LogFormat};
use landing_zone_controller::runtime::{initialize, run_watch_loop};

/// Landing Zone Controller - reconciles Aws account resources
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Namespace to watch (all namespaces when unset)
    #[arg(long)]
    namespace: Option<String>,

    /// HTTP port for metrics and health probes
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Number of accounts reconciled in parallel
    #[arg(long)]
    max_concurrent_reconciles: Option<u16>,

    /// Deadline for a single reconciliation, in seconds
    #[arg(long)]
    reconcile_timeout_secs: Option<u64>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut controller_config, mut server_config) = config::load_config();
    if let Some(namespace) = args.namespace.filter(|ns| !ns.is_empty()) {
        controller_config.watch_namespace = Some(namespace);
    }
    if let Some(port) = args.metrics_port {
        server_config.metrics_port = port;
    }
    if let Some(concurrency) = args.max_concurrent_reconciles {
        controller_config.max_concurrent_reconciles = concurrency;
    }
    if let Some(timeout) = args.reconcile_timeout_secs {
        controller_config.reconcile_timeout_secs = timeout;
    }

    let init_result =
        initialize(controller_config.normalized(), server_config, args.log_format).await?;

    run_watch_loop(
        init_result.accounts,
        init_result.context,
        init_result.server_state,
    )
    .await
}
