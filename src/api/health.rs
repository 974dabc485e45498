/// Health and metrics endpoints
///
/// `/health` stays 200 whenever the process can answer; a missing identity
/// provider or mail transport shows up as `"degraded"` rather than a failure.
use crate::{context::AppContext, metrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// "ok" or "degraded"
    pub status: String,

    /// Application version
    pub version: String,

    /// Whether the broadcast endpoint can currently serve requests
    pub broadcast_ready: bool,
}

/// Build health and metrics routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
}

pub async fn health(State(ctx): State<AppContext>) -> Json<HealthStatus> {
    let broadcast_ready = ctx.broadcast_ready();

    Json(HealthStatus {
        status: if broadcast_ready { "ok" } else { "degraded" }.to_string(),
        version: ctx.config.service.version.clone(),
        broadcast_ready,
    })
}

/// Prometheus text exposition
pub async fn prometheus_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather(),
    )
}
