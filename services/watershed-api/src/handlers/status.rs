//! Status probe and cache administration.

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub deleted: u64,
}

/// GET /api/delineate/status - Grid availability and cache configuration
#[instrument(skip(state))]
pub async fn status_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let status = state.service.status().await;
    let code = if status.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// DELETE /api/delineate/cache - Remove every stored result
#[instrument(skip(state))]
pub async fn clear_cache_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<ClearCacheResponse>, ApiError> {
    let deleted = state.service.clear_cache().await?;
    info!(deleted, "Result cache cleared");
    Ok(Json(ClearCacheResponse { deleted }))
}
