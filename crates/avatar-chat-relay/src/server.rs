//! Axum-based relay server.

use std::sync::Arc;

use axum::{
    Router,
    http::Method,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::proxy::proxy_audio;
use crate::state::RelayState;

/// Build the relay router with its CORS and trace layers.
pub fn relay_router(state: Arc<RelayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/proxy-audio", get(proxy_audio))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the relay and serve until Ctrl-C.
pub async fn start_relay(state: Arc<RelayState>) -> anyhow::Result<()> {
    let bind_addr = state.config.bind().to_string();
    let port = state.config.port;
    let app = relay_router(state);

    let addr = format!("{bind_addr}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Audio relay listening on {addr}");
    info!("Health check: http://localhost:{port}/health");
    info!("Proxy endpoint: http://localhost:{port}/proxy-audio?url=<audio_url>");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    axum::Json(json!({
        "status": "ok",
        "message": "Audio proxy server is running",
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(%e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
