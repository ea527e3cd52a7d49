//! Nimbus Cache - admin server entry point
//!
//! Wires the cache core to its thin HTTP admin surface: one primary cache
//! instance, a TTL reaper, and the cross-instance coordinator.

mod api;
mod breaker;
mod cache;
mod config;
mod coordinator;
mod error;
mod invalidation;
mod metrics;
mod models;
mod tasks;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{create_router, AppState};
use config::Config;
use coordinator::CacheCoordinator;
use tasks::TtlReaper;

/// Main entry point for the cache admin server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the primary cache, metrics collector, coordinator, and
///    invalidation manager
/// 4. Start the TTL reaper and coordinator loops
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nimbus_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Nimbus Cache admin server");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, max_memory_mb={}, default_ttl={}s, port={}, cleanup_interval={}s",
        config.max_entries,
        config.max_memory_mb,
        config.default_ttl,
        config.server_port,
        config.cleanup_interval
    );

    // Build components and application state
    let state = AppState::from_config(&config);
    info!("Cache core initialized");

    // Start background loops
    let reaper = Arc::new(TtlReaper::new(
        state.cache.clone(),
        Duration::from_secs(config.cleanup_interval),
    ));
    reaper.start();
    state.coordinator.start();
    info!("TTL reaper and coordinator started");

    // Create router with all endpoints
    let app = create_router(state.clone());

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(reaper, Arc::clone(&state.coordinator)))
        .await
        .unwrap();

    info!("Server shutdown complete");
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, cancels the background loops so no timer handle
/// outlives the server.
async fn shutdown_signal(reaper: Arc<TtlReaper>, coordinator: Arc<CacheCoordinator>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    reaper.stop();
    coordinator.stop();
    warn!("Background tasks stopped");
}
