//! Refresh Cache - topic API server
//!
//! Serves topics from the self-refreshing cache, fetching from the origin
//! on a miss.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refresh_cache::api::create_router;
use refresh_cache::{spawn_error_logger, AppState, Config, ExpiringCache, HttpFetcher, IndexedStore};

/// Main entry point for the topic API server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the expiring cache and the indexed topic store
/// 4. Start logging the store's error stream
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. On SIGINT/SIGTERM, stop serving and terminate the store
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refresh_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Refresh Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: expiration={}s, refresh_interval={}s, port={}, origin={}, warm_up_pages={}",
        config.entry_expiration,
        config.refresh_interval,
        config.server_port,
        config.origin_url,
        config.warm_up_pages
    );

    let cache = Arc::new(ExpiringCache::new(config.cache_config())?);
    let fetcher = HttpFetcher::new(config.origin_url.clone());
    let store = IndexedStore::start(cache, fetcher, config.store_options())?;
    spawn_error_logger("topic-storage", store.errors()?);
    info!("Topic store initialized");

    let app = create_router(AppState::new(Arc::clone(&store)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    store.terminate().await;
    info!("Server shutdown complete");

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
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
}
