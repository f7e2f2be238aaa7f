//! HTTP status server for tannoy-pa

use std::net::SocketAddr;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::playback::SoundQueue;

/// Application state
#[derive(Clone)]
struct AppState {
    queue: SoundQueue,
}

/// Serve `/health` and `/status` until the process exits.
pub async fn start(port: u16, queue: SoundQueue) -> crate::Result<()> {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { queue });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Health check endpoint
async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Status endpoint
async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = state.queue.status().await;
    Json(json!({
        "service": "tannoy-pa",
        "version": env!("CARGO_PKG_VERSION"),
        "queued": status.queued,
        "playing": status.playing,
        "suppressed_for_secs": status.suppressed_for_secs,
    }))
}
