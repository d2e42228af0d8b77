use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;

use crate::engine::Monitor;
use crate::models::{HealthStatus, TargetStats};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: HealthStatus,
    pub summary: String,
}

pub async fn get_stats(State(monitor): State<Arc<Monitor>>) -> Json<Vec<TargetStats>> {
    Json(monitor.stats_in_order())
}

pub async fn get_status(State(monitor): State<Arc<Monitor>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: monitor.current_status(),
        summary: monitor.summary_text(),
    })
}

pub async fn get_targets(State(monitor): State<Arc<Monitor>>) -> Json<Vec<String>> {
    Json(monitor.targets().to_vec())
}

pub fn create_router(monitor: Arc<Monitor>) -> Router {
    Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/status", get(get_status))
        .route("/api/targets", get(get_targets))
        .fallback_service(ServeDir::new("public"))
        .with_state(monitor)
}

pub async fn start_server(port: u16, monitor: Arc<Monitor>) -> Result<()> {
    let app = create_router(monitor);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API port {}", port))?;
    info!("Dashboard: http://localhost:{}", addr.port());
    axum::serve(listener, app).await.context("API server failed")?;
    Ok(())
}
