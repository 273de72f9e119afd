//! Auth Routes
//!
//! - POST /api/v1/auth/register - Create an account for a portal
//! - POST /api/v1/auth/login - Sign in, returns an id token
//! - POST /api/v1/auth/logout - Forget the session
//! - GET /api/v1/auth/me - Current user and profile

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;

use crate::api::auth::BearerToken;
use crate::api::dto::{
    LoginRequest, LoginResponse, LogoutResponse, MeResponse, RegisterRequest, RegisterResponse,
};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::backend::Principal;
use crate::forms::CredentialsForm;
use crate::views::REGISTERED;

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let form = CredentialsForm::new(body.email, body.password);
    let profile = state.service.register(&form, body.role).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            uid: profile.uid,
            email: profile.email,
            role: profile.role,
            message: REGISTERED.to_string(),
        }),
    ))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let form = CredentialsForm::new(body.email, body.password);
    let outcome = state.service.login(&form).await?;

    Ok(Json(LoginResponse {
        id_token: outcome.session.id_token,
        expires_in: outcome.session.expires_in,
        profile: outcome.profile,
    }))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Json<LogoutResponse> {
    state.service.logout(&token).await;
    Json(LogoutResponse {
        status: "ok".to_string(),
    })
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<MeResponse>> {
    let profile = state.service.profile(&principal).await?;

    Ok(Json(MeResponse {
        uid: principal.user.uid,
        email: principal.user.email,
        role: principal.role,
        profile,
    }))
}
