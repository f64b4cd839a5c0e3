//! Cacheproxy - A caching forward HTTP proxy
//!
//! Relays GET requests to origin servers and keeps small responses in a
//! fixed-size in-memory cache with LRU eviction.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cacheproxy::api::{create_router, AppState};
use cacheproxy::{spawn_stats_reporter, Acceptor, Config, ResponseCache};

/// Main entry point for the proxy.
///
/// # Startup Sequence
/// 1. Parse command-line configuration
/// 2. Initialize tracing subscriber for logging
/// 3. Create the shared response cache
/// 4. Start the admin API and stats reporter when enabled
/// 5. Accept proxy clients until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cacheproxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Configuration loaded: port={}, cache_slots={}, max_object_size={}, policy={:?}",
        config.port,
        config.cache_slots,
        config.max_object_size,
        config.connection_policy()
    );

    let cache = Arc::new(ResponseCache::new(config.cache_slots, config.max_object_size));

    let reporter = spawn_stats_reporter(cache.clone(), config.stats_interval);

    let admin = match config.admin_addr() {
        Some(addr) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind admin API on {}", addr))?;
            info!("Admin API listening on http://{}", addr);
            let app = create_router(AppState::new(cache.clone()));
            Some(tokio::spawn(async move {
                if let Err(err) = axum::serve(listener, app).await {
                    warn!(error = %err, "Admin API stopped");
                }
            }))
        }
        None => None,
    };

    let acceptor = Acceptor::bind(config.listen_addr(), cache, config.connection_policy())
        .await
        .with_context(|| format!("failed to bind proxy on {}", config.listen_addr()))?;

    acceptor.run_until(shutdown_signal()).await;

    for handle in reporter.into_iter().chain(admin) {
        handle.abort();
    }
    info!("Proxy shutdown complete");

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
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
                warn!(error = %err, "Failed to install SIGTERM handler");
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
