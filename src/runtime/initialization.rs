//! # Initialization
//!
//! Controller startup: rustls setup, tracing, metrics, server startup,
//! Kubernetes and ACM client setup.

use crate::config::ControllerConfig;
use crate::controller::Reconciler;
use crate::crd::AcmCertificateImport;
use crate::observability;
use crate::provider::aws::AcmCertificateGateway;
use crate::runtime::Context;
use crate::server::{start_server, ServerState};
use crate::store::KubeStore;
use anyhow::{anyhow, Context as _, Result};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub context: Arc<Context>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes and ACM client creation
/// - A startup listing proving the CRD is installed
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before any TLS connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|existing| {
            anyhow!("Failed to install rustls crypto provider, one is already installed: {existing:?}")
        })?;

    let config = ControllerConfig::from_env();
    observability::logging::init(&config)?;

    info!("Starting ACM import controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_handle = {
        let state = Arc::clone(&server_state);
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!("HTTP server error: {}", e);
            }
        })
    };
    wait_for_server_ready(&server_state, &server_handle, &config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    check_existing_resources(&client, config.watch_namespace.as_deref()).await?;

    let store = Arc::new(KubeStore::new(client.clone()));
    let gateway = Arc::new(AcmCertificateGateway::new(config.aws_region.as_deref()).await);
    let reconciler = Reconciler::new(store, gateway);
    let context = Arc::new(Context::new(reconciler, config));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        context,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &ServerState,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ControllerConfig,
) -> Result<()> {
    let startup_timeout = config.server_startup_timeout();
    let poll_interval = config.server_poll_interval();
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
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

/// List existing imports before watching
///
/// Fails fast when the CRD is not installed or RBAC forbids listing, instead
/// of leaving the watch to retry forever.
async fn check_existing_resources(client: &Client, namespace: Option<&str>) -> Result<()> {
    let api: Api<AcmCertificateImport> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    let list = api
        .list(&ListParams::default())
        .await
        .context("ACMCertificateImport CRD is not queryable; is it installed?")?;

    info!(
        "CRD is queryable, found {} existing ACMCertificateImport resources",
        list.items.len()
    );

    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in &list.items {
        by_namespace
            .entry(item.namespace().unwrap_or_else(|| "default".to_string()))
            .or_default()
            .push(item.name_any());
    }
    for (namespace, names) in &by_namespace {
        info!("  {}: {}", namespace, names.join(", "));
    }

    Ok(())
}
