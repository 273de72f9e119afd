//! Admin Routes
//!
//! - GET /api/v1/dashboard - All requests with active/fulfilled counts
//! - GET /api/v1/export - CSV download of all requests

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::backend::Principal;
use crate::service::Dashboard;

/// GET /api/v1/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Dashboard>> {
    Ok(Json(state.service.dashboard(&principal).await?))
}

/// GET /api/v1/export
pub async fn export_requests(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Response> {
    let csv = state.service.export_csv(&principal).await?;
    let filename = format!("bloodnet_requests_{}.csv", Utc::now().format("%Y%m%d"));

    tracing::info!(by = %principal.uid(), bytes = csv.len(), "Requests exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}
