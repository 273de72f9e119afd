//! Bearer token authentication middleware
//!
//! Extracts `Authorization: Bearer <id token>`, resolves it through the
//! service (session cache first, identity service on a miss) and injects the
//! `Principal` and the raw token into request extensions.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::ApiError;
use super::state::AppState;

/// The caller's id token, for handlers that need it (logout)
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

pub fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Reject requests without a valid id token
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    match require_auth_inner(state, req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    state: Arc<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?;
    let principal = state.service.authenticate(&token).await?;

    tracing::trace!(uid = %principal.uid(), role = %principal.role, "Authenticated");

    req.extensions_mut().insert(principal);
    req.extensions_mut().insert(BearerToken(token));
    Ok(next.run(req).await)
}
