//! Request Routes
//!
//! - GET /api/v1/requests - List requests (query: bloodType, urgency)
//! - POST /api/v1/requests - Create a request (admin)
//! - GET /api/v1/requests/:id - Get one request
//! - POST /api/v1/requests/:id/donate - Claim a request (donor)
//! - DELETE /api/v1/requests/:id/donation - Revert a claim

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::api::dto::{RequestListQuery, RequestListResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::backend::Principal;
use crate::forms::RequestForm;
use crate::model::BloodRequest;

/// GET /api/v1/requests
///
/// Newest first; both filters must match.
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RequestListQuery>,
) -> ApiResult<Json<RequestListResponse>> {
    let filter = query.to_filter().map_err(ApiError::Validation)?;
    let requests = state.service.list_requests(&filter).await?;
    Ok(Json(RequestListResponse::new(requests)))
}

/// POST /api/v1/requests
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(form): Json<RequestForm>,
) -> ApiResult<(StatusCode, Json<BloodRequest>)> {
    let created = state.service.create_request(&principal, &form).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/requests/:id
pub async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BloodRequest>> {
    Ok(Json(state.service.get_request(&id).await?))
}

/// POST /api/v1/requests/:id/donate
///
/// 409 when the request was fulfilled by someone else first.
pub async fn donate(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<BloodRequest>> {
    Ok(Json(state.service.donate(&principal, &id).await?))
}

/// DELETE /api/v1/requests/:id/donation
pub async fn undo_donation(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<BloodRequest>> {
    Ok(Json(state.service.undo_donation(&principal, &id).await?))
}

/// GET /api/v1/donations
///
/// Requests claimed by the caller, most recent donation first.
pub async fn donation_history(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<RequestListResponse>> {
    let history = state.service.history(&principal).await?;
    Ok(Json(RequestListResponse::new(history)))
}
