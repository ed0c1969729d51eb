// Main entry point for the bus position tracker

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracker_core::common::AppContext;
use tracker_core::domains::tracking::start_tracking;
use tracker_core::kernel::{ServerDeps, TransitAdapter};
use tracker_core::server::{build_app, AxumAppState};
use tracker_core::storage::open_store;
use tracker_core::Config;
use transit_client::{TransitClient, TransitOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tracker_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting bus position tracker");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(backend = ?config.storage_backend, "Configuration loaded");

    // Open storage (runs migrations for PostgreSQL)
    let store = open_store(&config)
        .await
        .context("Failed to open storage")?;

    let client = TransitClient::new(TransitOptions {
        base_url: config.transit_api_base_url.clone(),
        timeout: config.http_timeout,
    })
    .context("Failed to build transit API client")?;
    tracing::info!(base_url = %client.base_url(), "Transit API client ready");

    let deps = ServerDeps::new(store, Arc::new(TransitAdapter::new(Arc::new(client))));
    let context = AppContext::new();

    // Discover lines and start one poller per line in the background, so the
    // reporting endpoints are up even while the operator is slow to answer.
    let shutdown = CancellationToken::new();
    let tracker = {
        let deps = deps.clone();
        let shutdown = shutdown.clone();
        let interval = config.poll_interval;
        tokio::spawn(async move { start_tracking(&deps, interval, shutdown).await })
    };

    let app = build_app(AxumAppState::new(deps, context));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Status: http://localhost:{}/status", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Server error")?;

    // Stop the pollers once the server has drained
    shutdown.cancel();
    match tracker.await {
        Ok(handle) => {
            tracing::info!(pollers = handle.poller_count(), "Stopping pollers");
            handle.shutdown().await;
        }
        Err(e) => tracing::error!(error = %e, "Line discovery task failed"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C, cancelling `shutdown` so pollers stop too
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
