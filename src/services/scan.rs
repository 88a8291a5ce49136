//! Processing-state tracker: claims rows for the external scan collaborator
//! and resolves its asynchronous callbacks.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{SearchResultRow, Store};
use crate::models::{ProcessedState, normalize_link};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("No matching search result for this user and URL")]
    NoMatch,

    #[error("Result {0} not found")]
    NotFound(i32),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for ScanError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Payload posted by the scan runner when a scan finishes.
///
/// `result_id` is the preferred correlation: when the runner echoes the id it
/// was handed, resolution is exact. The `(user_id, url)` most-recent-row
/// lookup remains as a fallback for runners that do not.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanCallback {
    pub user_id: String,
    pub url: String,
    pub status: String,
    pub result_id: Option<i32>,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanResolution {
    pub result_id: i32,
    pub status: i32,
}

pub struct ScanService {
    store: Store,
}

impl ScanService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Hands the oldest scannable row to the polling scan runner, marking it
    /// in-progress in the same transaction so two pollers cannot claim it
    /// twice.
    pub async fn claim_next(&self) -> Result<Option<SearchResultRow>, ScanError> {
        let claimed = self.store.claim_next_scannable().await?;

        if let Some(row) = &claimed {
            info!("Claimed result {} ({}) for scanning", row.id, row.link);
        }

        Ok(claimed)
    }

    /// UI-triggered transition into `InProgress`, valid from `Unprocessed`
    /// and from `Failed` (retry).
    pub async fn mark_in_progress(&self, id: i32, user_id: &str) -> Result<(), ScanError> {
        let row = self
            .store
            .result_by_id(id, Some(user_id))
            .await?
            .ok_or(ScanError::NotFound(id))?;

        let current = ProcessedState::try_from(row.processed)
            .map_err(|e| ScanError::Database(e.to_string()))?;

        if !current.is_scannable() {
            return Err(ScanError::Conflict(format!(
                "result {} is already {}",
                id, current
            )));
        }

        self.store
            .update_status(id, ProcessedState::InProgress)
            .await?;
        Ok(())
    }

    /// Direct status set for simple UI toggles; validates the value but
    /// bypasses the scan dependency.
    pub async fn mark_manual(
        &self,
        id: i32,
        state: ProcessedState,
        user_id: &str,
    ) -> Result<(), ScanError> {
        self.store
            .result_by_id(id, Some(user_id))
            .await?
            .ok_or(ScanError::NotFound(id))?;

        self.store.update_status(id, state).await?;
        Ok(())
    }

    /// Resolves a scan callback to `Completed` or `Failed`.
    ///
    /// The target must currently be `InProgress`; anything else is rejected
    /// rather than silently overwritten, so the runner can alert or retry.
    pub async fn resolve(&self, callback: &ScanCallback) -> Result<ScanResolution, ScanError> {
        if callback.user_id.trim().is_empty() {
            return Err(ScanError::InvalidPayload("missing user_id".to_string()));
        }
        if callback.url.trim().is_empty() {
            return Err(ScanError::InvalidPayload("missing url".to_string()));
        }

        let row = if let Some(id) = callback.result_id {
            self.store
                .result_by_id(id, Some(&callback.user_id))
                .await?
                .ok_or(ScanError::NotFound(id))?
        } else {
            let link = normalize_link(&callback.url)
                .ok_or_else(|| ScanError::InvalidPayload("unusable url".to_string()))?;
            self.store
                .latest_by_link(&callback.user_id, &link)
                .await?
                .ok_or(ScanError::NoMatch)?
        };

        let current = ProcessedState::try_from(row.processed)
            .map_err(|e| ScanError::Database(e.to_string()))?;

        if current != ProcessedState::InProgress {
            return Err(ScanError::Conflict(format!(
                "result {} is {}, not awaiting a scan outcome",
                row.id, current
            )));
        }

        let (state, errors, scan_details) = interpret_outcome(callback);

        self.store
            .record_scan_outcome(row.id, state, errors.as_deref(), scan_details.as_deref())
            .await?;

        info!(
            "Resolved scan for result {} ({}) as {}",
            row.id, row.link, state
        );

        Ok(ScanResolution {
            result_id: row.id,
            status: state.as_i32(),
        })
    }
}

/// Maps the runner's report onto a processed state plus the JSON payloads
/// stored alongside it.
fn interpret_outcome(
    callback: &ScanCallback,
) -> (ProcessedState, Option<String>, Option<String>) {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match callback.status.as_str() {
        "error" => {
            let detail = json!({
                "type": "scan_runner_error",
                "message": callback.error.clone().unwrap_or_else(|| "unknown error from scan runner".to_string()),
                "timestamp": timestamp,
            });
            (ProcessedState::Failed, Some(detail.to_string()), None)
        }
        "completed" => match &callback.data {
            Some(data) => {
                if let Some(aborted) = data.get("scan_aborted").and_then(|v| v.as_str()) {
                    let detail = json!({
                        "type": "scan_aborted",
                        "message": aborted,
                        "timestamp": timestamp,
                    });
                    (
                        ProcessedState::Failed,
                        Some(detail.to_string()),
                        Some(data.to_string()),
                    )
                } else if let Some(err) = data.get("error").filter(|v| !v.is_null()) {
                    let detail = json!({
                        "type": "scan_internal_error",
                        "message": err.to_string(),
                        "timestamp": timestamp,
                    });
                    (
                        ProcessedState::Failed,
                        Some(detail.to_string()),
                        Some(data.to_string()),
                    )
                } else {
                    (ProcessedState::Completed, None, Some(data.to_string()))
                }
            }
            None => {
                let detail = json!({
                    "type": "missing_scan_data",
                    "message": "scan reported as completed, but scanner output is missing",
                    "timestamp": timestamp,
                });
                (ProcessedState::Failed, Some(detail.to_string()), None)
            }
        },
        other => {
            warn!("Unknown scan status \"{}\" for {}", other, callback.url);
            let detail = json!({
                "type": "unknown_status",
                "message": format!("received unknown status '{}' from scan runner", other),
                "timestamp": timestamp,
            });
            (ProcessedState::Failed, Some(detail.to_string()), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback(status: &str, data: Option<serde_json::Value>) -> ScanCallback {
        ScanCallback {
            user_id: "user".to_string(),
            url: "https://example.com".to_string(),
            status: status.to_string(),
            result_id: None,
            data,
            error: None,
        }
    }

    #[test]
    fn test_runner_error_maps_to_failed() {
        let (state, errors, details) = interpret_outcome(&callback("error", None));
        assert_eq!(state, ProcessedState::Failed);
        assert!(errors.unwrap().contains("scan_runner_error"));
        assert!(details.is_none());
    }

    #[test]
    fn test_completed_with_data_maps_to_completed() {
        let (state, errors, details) =
            interpret_outcome(&callback("completed", Some(json!({"plugins": []}))));
        assert_eq!(state, ProcessedState::Completed);
        assert!(errors.is_none());
        assert!(details.unwrap().contains("plugins"));
    }

    #[test]
    fn test_aborted_scan_maps_to_failed() {
        let (state, errors, details) = interpret_outcome(&callback(
            "completed",
            Some(json!({"scan_aborted": "target unreachable"})),
        ));
        assert_eq!(state, ProcessedState::Failed);
        assert!(errors.unwrap().contains("scan_aborted"));
        assert!(details.is_some());
    }

    #[test]
    fn test_completed_without_data_maps_to_failed() {
        let (state, errors, _) = interpret_outcome(&callback("completed", None));
        assert_eq!(state, ProcessedState::Failed);
        assert!(errors.unwrap().contains("missing_scan_data"));
    }

    #[test]
    fn test_unknown_status_maps_to_failed() {
        let (state, errors, _) = interpret_outcome(&callback("exploded", None));
        assert_eq!(state, ProcessedState::Failed);
        assert!(errors.unwrap().contains("unknown_status"));
    }
}
