use axum::{Json, extract::State, http::HeaderMap};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SearchResultDto};
use crate::services::{ScanCallback, ScanResolution};

/// GET /api/scan/next — the scan runner's polling endpoint.
///
/// No user identity here: the runner is a machine collaborator that works
/// through every user's backlog. The returned row is atomically flipped to
/// in-progress so two pollers cannot pick up the same target.
pub async fn claim_next(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SearchResultDto>>, ApiError> {
    let claimed = state.scan_service().claim_next().await?;

    match claimed {
        Some(row) => Ok(Json(ApiResponse::success(SearchResultDto::from(row)))),
        None => Err(ApiError::NotFound("No unprocessed results found".to_string())),
    }
}

/// POST /api/scan/callback — outcome report from the scan runner.
///
/// Authenticated by a shared secret header rather than session identity;
/// the owning user comes from the payload.
pub async fn submit_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(callback): Json<ScanCallback>,
) -> Result<Json<ApiResponse<ScanResolution>>, ApiError> {
    let expected = {
        let config = state.config().read().await;
        config.scanner.callback_api_key.clone()
    };

    if expected.is_empty() {
        return Err(ApiError::unauthorized("Callback key is not configured"));
    }

    let presented = headers
        .get("X-Callback-Api-Key")
        .and_then(|v| v.to_str().ok());

    if presented != Some(expected.as_str()) {
        return Err(ApiError::unauthorized("Invalid callback key"));
    }

    let resolution = state.scan_service().resolve(&callback).await?;

    Ok(Json(ApiResponse::success(resolution)))
}
