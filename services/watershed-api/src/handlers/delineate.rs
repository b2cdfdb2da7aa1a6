//! Delineation endpoint.

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::Extension, Json};
use tracing::instrument;

use watershed::{DelineationRequest, DelineationResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/delineate - Delineate the watershed draining to a point
#[instrument(skip(state, payload))]
pub async fn delineate_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<DelineationRequest>, JsonRejection>,
) -> Result<Json<DelineationResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.service.delineate(request).await?;
    Ok(Json(response))
}
