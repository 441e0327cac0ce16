//! Task Chat Relay Server Library
//!
//! Real-time presence and chat fan-out for task conversations, with chat
//! messages kept in a JSON message store.

pub mod chat;
pub mod core;

use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::core::store::JsonMessageStore;
use crate::core::{AppState, RelayConfig};

/// Install the global fmt subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }
}

/// Every route the server exposes, with CORS and request tracing applied.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(crate::core::router())
        .merge(crate::chat::router())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

pub async fn run() -> anyhow::Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();
    init_tracing();

    info!("=== Task Chat Relay ===");

    let config = RelayConfig::from_env();
    info!("Storage directory: {:?}", config.storage_dir);

    let store = Arc::new(JsonMessageStore::new(&config).await?);
    let state = AppState::new(config.clone(), store);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Relay listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
