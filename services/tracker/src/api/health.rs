//! Health check endpoints.
//!
//! Used by load balancers to decide whether the tracker should receive
//! pixel traffic.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status: "ok" or "degraded".
    pub status: String,

    pub service: String,

    pub version: String,

    /// Current timestamp (RFC 3339).
    pub timestamp: String,

    /// Store reachability, readiness only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<ComponentStatus>,
}

/// Individual component status.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ComponentStatus {
    /// Status: "ok" or "unavailable".
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Create health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}

/// Liveness: the process is serving. Does not touch the store.
async fn healthz() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "tracker".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        store: None,
    })
}

/// Readiness: the store answers a ping. Returns 503 otherwise.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.store().ping().await;
    let ok = result.is_ok();

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" }.to_string(),
        service: "tracker".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        store: Some(ComponentStatus {
            status: if ok { "ok" } else { "unavailable" }.to_string(),
            message: result.err().map(|e| e.to_string()),
        }),
    };

    if ok {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
