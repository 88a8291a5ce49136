use serde::{Deserialize, Serialize};

use crate::db::{HistoryEntry, PaginationState, SearchResultRow};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct SearchResultDto {
    pub id: i32,
    pub search_query: String,
    pub title: Option<String>,
    pub link: String,
    pub snippet: Option<String>,
    pub position: Option<i32>,
    pub processed: i32,
    pub category: i32,
    pub errors: Option<String>,
    pub scan_details: Option<String>,
    pub contact_url: Option<String>,
    pub is_wordpress: Option<bool>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SearchResultRow> for SearchResultDto {
    fn from(row: SearchResultRow) -> Self {
        Self {
            id: row.id,
            search_query: row.search_query,
            title: row.title,
            link: row.link,
            snippet: row.snippet,
            position: row.position,
            processed: row.processed,
            category: row.category,
            errors: row.errors,
            scan_details: row.scan_details,
            contact_url: row.contact_url,
            is_wordpress: row.is_wordpress,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct PaginationStateDto {
    pub search_query: String,
    pub last_start_position: i64,
    pub total_requests_made: i64,
    pub last_updated: String,
}

impl From<PaginationState> for PaginationStateDto {
    fn from(state: PaginationState) -> Self {
        Self {
            search_query: state.search_query,
            last_start_position: state.last_start_position,
            total_requests_made: state.total_requests_made,
            last_updated: state.last_updated,
        }
    }
}

/// Outcome of one search cycle.
#[derive(Debug, Serialize)]
pub struct SearchCycleDto {
    pub query: String,
    pub total_results: usize,
    pub requests_made: u32,
    pub total_requests_made_overall: i64,
    pub next_start_position: i64,
    pub results: Vec<SearchResultDto>,
}

#[derive(Debug, Serialize)]
pub struct QueryResultsDto {
    pub query: String,
    pub results: Vec<SearchResultDto>,
    pub pagination: Option<PaginationStateDto>,
}

#[derive(Debug, Serialize)]
pub struct SearchHistoryDto {
    pub history: Vec<HistoryEntry>,
    pub total_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub reset_pagination: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub id: Option<i32>,
    pub processed: Option<i32>,
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ManualAddRequest {
    pub link: String,
    pub search_query: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub category: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataUpdateItem {
    pub id: i32,
    pub contact_url: Option<String>,
    pub is_wordpress: Option<bool>,
    pub category: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct MetadataUpdateDto {
    pub updated: usize,
    pub total_requested: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatusDto {
    pub version: String,
    pub uptime: u64,
    pub total_results: i64,
    pub database_ok: bool,
}
