//! Profile Routes
//!
//! - GET /api/v1/profile - Own profile (created with defaults on first access)
//! - PUT /api/v1/profile - Update own profile

use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::backend::Principal;
use crate::forms::ProfileForm;
use crate::model::DonorProfile;

/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<DonorProfile>> {
    Ok(Json(state.service.profile(&principal).await?))
}

/// PUT /api/v1/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(form): Json<ProfileForm>,
) -> ApiResult<Json<DonorProfile>> {
    Ok(Json(state.service.update_profile(&principal, &form).await?))
}
