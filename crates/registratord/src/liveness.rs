//! Liveness endpoint
//!
//! `GET /health` answers as long as the process is up. It shares no state
//! with the engine, so it says nothing about DNS or Docker reachability.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::info;

/// Router serving the liveness endpoint
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Serve the liveness endpoint until the listener fails
pub async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Liveness endpoint listening on {}", addr);
    }
    axum::serve(listener, router()).await?;
    Ok(())
}
