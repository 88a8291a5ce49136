use axum::{Json, extract::State};
use std::sync::Arc;
use url::Url;

use super::identity::UserId;
use super::{ApiError, ApiResponse, AppState, ManualAddRequest, SearchResultDto};
use crate::db::NewSearchResult;
use crate::models::{Category, ProcessedState, normalize_link};

/// POST /api/pages — add a single page by hand.
///
/// Goes through the same normalization and dedup gate as automated inserts,
/// so a manually added domain can never shadow or duplicate a discovered one.
pub async fn add_page(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(request): Json<ManualAddRequest>,
) -> Result<Json<ApiResponse<SearchResultDto>>, ApiError> {
    let search_query = request.search_query.trim();
    if search_query.is_empty() {
        return Err(ApiError::validation("Link and search query are required"));
    }

    let raw_link = request.link.trim();
    if raw_link.is_empty() {
        return Err(ApiError::validation("Link and search query are required"));
    }

    if Url::parse(raw_link).is_err() {
        return Err(ApiError::validation("Invalid URL format"));
    }

    let link = normalize_link(raw_link)
        .ok_or_else(|| ApiError::validation("Invalid URL format"))?;

    let category = match request.category {
        Some(value) => Category::try_from(value)
            .map_err(|e| ApiError::validation(e.to_string()))?,
        None => Category::Manual,
    };

    if state.store().domain_exists(&link, Some(&user_id)).await? {
        return Err(ApiError::conflict(
            "This page already exists in your database",
        ));
    }

    let result = NewSearchResult {
        search_query: search_query.to_string(),
        title: request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from),
        link,
        snippet: request
            .snippet
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        position: None,
        user_id: user_id.clone(),
        processed: ProcessedState::Unprocessed,
        category,
    };

    let id = state.store().insert_manual_result(&result).await?;

    let row = state
        .store()
        .result_by_id(id, Some(&user_id))
        .await?
        .ok_or_else(|| ApiError::internal("Failed to read back inserted page"))?;

    Ok(Json(ApiResponse::success(SearchResultDto::from(row))))
}
