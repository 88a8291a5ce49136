use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::identity::UserId;
use super::{ApiError, ApiResponse, AppState, SearchResultDto};
use crate::db::{ActivityBucket, CategoryBucket, HistoryEntry, StatusBucket};

#[derive(Debug, Serialize)]
pub struct AnalyticsDto {
    pub overview: OverviewDto,
    pub processed: Vec<StatusBucket>,
    pub categories: Vec<CategoryBucket>,
    pub activity: Vec<ActivityBucket>,
    pub top_queries: Vec<HistoryEntry>,
    pub recent: Vec<SearchResultDto>,
}

#[derive(Debug, Serialize)]
pub struct OverviewDto {
    pub total_results: i64,
    pub tracked_queries: i64,
    pub provider_requests: i64,
    pub scan_errors: i64,
}

/// GET /api/analytics — aggregate view over one user's stored results.
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> Result<Json<ApiResponse<AnalyticsDto>>, ApiError> {
    let report = state.store().analytics(&user_id).await?;

    Ok(Json(ApiResponse::success(AnalyticsDto {
        overview: OverviewDto {
            total_results: report.total_results,
            tracked_queries: report.tracked_queries,
            provider_requests: report.provider_requests,
            scan_errors: report.scan_errors,
        },
        processed: report.processed,
        categories: report.categories,
        activity: report.activity,
        top_queries: report.top_queries,
        recent: report.recent.into_iter().map(SearchResultDto::from).collect(),
    })))
}
