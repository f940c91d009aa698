// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use replizieren::config::Config;
use replizieren::kubernetes::ClusterView;
use replizieren::reconcilers::{ConfigMapReconciler, NamespaceReconciler, SecretReconciler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting replizieren operator");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: protected_namespaces={:?}",
        config.protected_namespaces
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Namespaces and broadcast sources are answered from this cache
    let (view, cache) = ClusterView::cached(client.clone());
    tokio::spawn(cache.run());

    let secret_reconciler = SecretReconciler::new(client.clone(), view.clone(), config.clone());
    let config_map_reconciler = ConfigMapReconciler::new(client.clone(), view.clone(), config.clone());
    let namespace_reconciler = NamespaceReconciler::new(client, view, config);

    info!("Starting reconcilers...");

    tokio::try_join!(
        secret_reconciler.run(),
        config_map_reconciler.run(),
        namespace_reconciler.run()
    )?;

    warn!("All reconcilers stopped");
    Ok(())
}
