//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use super::context::ControllerContext;
use crate::config::{ControllerConfig, LogFormat, ServerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::Aws;
use crate::observability;
use crate::store::KubeAccountStore;
use anyhow::{anyhow, Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Everything the watch loop needs
#[allow(
    missing_debug_implementations,
    reason = "kube::Api does not implement Debug"
)]
pub struct InitializationResult {
    /// API for the Aws CRD, scoped to the watched namespace
    pub accounts: Api<Aws>,
    /// Reconciler context
    pub context: Arc<ControllerContext<KubeAccountStore>>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
pub async fn initialize(
    controller_config: ControllerConfig,
    server_config: ServerConfig,
    log_format: LogFormat,
) -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    init_tracing(log_format)?;

    if !provider_installed {
        warn!("rustls crypto provider was already installed, keeping the existing one");
    }

    info!("Starting Landing Zone Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(?controller_config, ?server_config, "Loaded configuration");

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());

    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {:#}", e);
        }
    });

    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let accounts: Api<Aws> = match controller_config.watch_namespace.as_deref() {
        Some(namespace) => {
            info!("Watching Aws resources in namespace {}", namespace);
            Api::namespaced(client.clone(), namespace)
        }
        None => {
            info!("Watching Aws resources in all namespaces");
            Api::all(client.clone())
        }
    };

    let store = KubeAccountStore::new(client.clone());
    let context = Arc::new(ControllerContext::new(
        Reconciler::new(store),
        controller_config,
    ));

    summarize_existing_resources(&accounts).await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        accounts,
        context,
        server_state,
    })
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "landing_zone_controller=info".into());

    match log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    }
    .map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}"))
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Log what the controller is about to pick up
///
/// Existing resources are reconciled by the controller's initial list; this
/// only verifies the CRD is installed and reports the inventory.
#[tracing::instrument(name = "controller.startup.existing_resources", skip_all)]
async fn summarize_existing_resources(accounts: &Api<Aws>) {
    match accounts.list(&ListParams::default()).await {
        Ok(list) => {
            let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for item in &list.items {
                let namespace = item.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
                let name = item.metadata.name.clone().unwrap_or_else(|| "unknown".to_string());
                by_namespace.entry(namespace).or_default().push(name);
            }

            info!(
                "CRD is queryable, found {} existing Aws resources in {} namespaces",
                list.items.len(),
                by_namespace.len()
            );
            for (namespace, mut names) in by_namespace {
                names.sort();
                info!("  {}: {}", namespace, names.join(", "));
            }
        }
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
        }
    }
}
