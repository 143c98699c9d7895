use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::handlers;
use crate::telegram::ClientManager;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub telegram: Arc<ClientManager>,
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(telegram: Arc<ClientManager>, api_key: Option<String>) -> Self {
        Self { telegram, api_key }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // === CLIENT LIFECYCLE ROUTES ===
        .route("/configure", post(handlers::configure))
        .route("/status", get(handlers::status))
        .route("/disconnect", post(handlers::disconnect))
        // === AUTHENTICATION ROUTES ===
        .route("/send-code", post(handlers::send_code))
        .route("/sign-in", post(handlers::sign_in))
        // === MESSAGING ROUTES ===
        .route("/message", post(handlers::send_message))
        .route("/channel", post(handlers::send_to_channel))
        .route("/media", post(handlers::send_media))
        .route("/history", post(handlers::get_history))
        .route("/join-channel", post(handlers::join_channel))
        .route("/dialogs", post(handlers::list_dialogs))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until Ctrl-C, then closes the Telegram session so it is persisted.
pub async fn start_server(config: &Config, state: AppState) -> Result<()> {
    let telegram = state.telegram.clone();
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, closing Telegram session");
    telegram.disconnect().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
