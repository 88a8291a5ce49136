use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::identity::UserId;
use super::{
    ApiError, ApiResponse, AppState, DeleteQueryRequest, PaginationStateDto, QueryResultsDto,
    SearchCycleDto, SearchHistoryDto, SearchRequest, SearchResultDto, StatusUpdateRequest,
};
use crate::models::ProcessedState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedDto {
    pub deleted: u64,
}

/// POST /api/search — run one orchestration cycle against the provider.
pub async fn run_search(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(request): Json<SearchRequest>,
) -> Result<Json<ApiResponse<SearchCycleDto>>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::validation("Query is required"));
    }

    let outcome = state
        .search_service()
        .run_cycle(&request.query, &user_id, request.reset_pagination)
        .await?;

    let results: Vec<SearchResultDto> = outcome
        .results
        .into_iter()
        .map(SearchResultDto::from)
        .collect();

    Ok(Json(ApiResponse::success(SearchCycleDto {
        query: outcome.query,
        total_results: results.len(),
        requests_made: outcome.requests_made,
        total_requests_made_overall: outcome.total_requests_overall,
        next_start_position: outcome.next_start_position,
        results,
    })))
}

/// GET /api/search — results for one query, or the grouped history.
pub async fn list_results(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    if let Some(query) = params.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let results = state.store().results_by_query(query, Some(&user_id)).await?;
        let pagination = state.store().pagination_state(query, &user_id).await?;

        let body = QueryResultsDto {
            query: query.to_string(),
            results: results.into_iter().map(SearchResultDto::from).collect(),
            pagination: pagination.map(PaginationStateDto::from),
        };
        return Ok(Json(ApiResponse::success(body)).into_response());
    }

    let history = state.store().search_history(Some(&user_id)).await?;
    let total_count = state.store().total_count(Some(&user_id)).await?;

    Ok(Json(ApiResponse::success(SearchHistoryDto {
        history,
        total_count,
    }))
    .into_response())
}

/// GET /api/search/results/{id}
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SearchResultDto>>, ApiError> {
    let row = state
        .store()
        .result_by_id(id, Some(&user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Result", id))?;

    Ok(Json(ApiResponse::success(SearchResultDto::from(row))))
}

/// GET /api/search/pagination — every cursor the user has accumulated.
pub async fn list_pagination(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> Result<Json<ApiResponse<Vec<PaginationStateDto>>>, ApiError> {
    let states = state.store().pagination_states_for_user(&user_id).await?;

    Ok(Json(ApiResponse::success(
        states.into_iter().map(PaginationStateDto::from).collect(),
    )))
}

/// DELETE /api/search — drop a query's rows and its cursor together.
pub async fn delete_results(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(request): Json<DeleteQueryRequest>,
) -> Result<Json<ApiResponse<DeletedDto>>, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::validation("Query is required"));
    }

    let deleted = state.store().purge_query(query, Some(&user_id)).await?;

    Ok(Json(ApiResponse::success(DeletedDto { deleted })))
}

/// PATCH /api/search — update processed status by id or by query.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Some(processed) = request.processed else {
        return Err(ApiError::validation("processed is required"));
    };

    let status = ProcessedState::try_from(processed)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    if let Some(id) = request.id {
        // "Process" goes through the guarded transition; other values are a
        // direct set that bypasses the scan dependency.
        if status == ProcessedState::InProgress {
            state.scan_service().mark_in_progress(id, &user_id).await?;
        } else {
            state
                .scan_service()
                .mark_manual(id, status, &user_id)
                .await?;
        }
        return Ok(Json(ApiResponse::success(())));
    }

    if let Some(query) = request.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        state
            .store()
            .update_status_by_query(query, status, Some(&user_id))
            .await?;
        return Ok(Json(ApiResponse::success(())));
    }

    Err(ApiError::validation("Either id or query is required"))
}
