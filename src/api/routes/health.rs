//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (document store reachable)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{ComponentHealth, FeedHealth, HealthResponse};
use crate::api::state::AppState;

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.service.store().health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = state.service.store();
    let store_error = store.health_check().await.err().map(|e| e.to_string());
    let store_status = if store_error.is_none() { "ok" } else { "error" };
    let feed = state.feed.status().await;

    // A feed that loaded once still serves its last snapshot
    let status = match (&store_error, feed.loaded) {
        (None, _) => "healthy",
        (Some(_), true) => "degraded",
        (Some(_), false) => "unhealthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        store: ComponentHealth {
            backend: store.name().to_string(),
            status: store_status.to_string(),
            error: store_error,
        },
        identity: state.service.identity().name().to_string(),
        feed: FeedHealth {
            loaded: feed.loaded,
            request_count: feed.request_count,
            last_refresh: feed.last_refresh,
            last_error: feed.last_error,
        },
        websocket_connections: state.ws_connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
