//! BloodNet REST API
//!
//! HTTP API layer for BloodNet, built with Axum.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /api/v1/auth/register` - Create an account (body: email, password, role)
//! - `POST /api/v1/auth/login` - Sign in, returns an id token
//! - `POST /api/v1/auth/logout` - Forget the session
//! - `GET /api/v1/auth/me` - Current user and profile
//!
//! ## Requests
//! - `GET /api/v1/requests` - List requests (`?bloodType=O-&urgency=High`)
//! - `POST /api/v1/requests` - Create a request (admin)
//! - `GET /api/v1/requests/:id` - Get a request
//! - `POST /api/v1/requests/:id/donate` - Claim a request (donor)
//! - `DELETE /api/v1/requests/:id/donation` - Revert a claim
//! - `GET /api/v1/donations` - Own donation history
//!
//! ## Admin
//! - `GET /api/v1/dashboard` - All requests with counts
//! - `GET /api/v1/export` - CSV export
//!
//! ## Profile
//! - `GET /api/v1/profile`, `PUT /api/v1/profile`
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! ## WebSocket
//! - `GET /api/v1/ws` - Real-time request snapshots
//!
//! Everything under `/api/v1` except register, login and the WebSocket
//! requires `Authorization: Bearer <id token>`.

pub mod auth;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::websocket::{websocket_handler, WsEvent};

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    let protected_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route(
            "/requests",
            get(routes::requests::list_requests).post(routes::requests::create_request),
        )
        .route("/requests/:id", get(routes::requests::get_request))
        .route("/requests/:id/donate", post(routes::requests::donate))
        .route(
            "/requests/:id/donation",
            delete(routes::requests::undo_donation),
        )
        .route("/donations", get(routes::requests::donation_history))
        .route("/dashboard", get(routes::export::dashboard))
        .route("/export", get(routes::export::export_requests))
        .route(
            "/profile",
            get(routes::profile::get_profile).put(routes::profile::update_profile),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&shared_state),
            auth::require_auth,
        ));

    let api_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(shared_state.config.max_body_size))
        // WebSocket route
        .route("/ws", get(websocket_handler));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TimeoutLayer::new(Duration::from_millis(
            shared_state.config.request_timeout_ms,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&shared_state.config))
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState) -> Result<(), ApiError> {
    let addr = state.config.addr();
    let hub = Arc::clone(&state.ws_hub);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("BloodNet API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            hub.publish(WsEvent::system("server shutting down")).await;
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("BloodNet API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
