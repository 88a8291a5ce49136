use axum::{Json, extract::State};
use std::sync::Arc;

use super::identity::UserId;
use super::{ApiError, ApiResponse, AppState, MetadataUpdateDto, MetadataUpdateItem};
use crate::models::Category;

/// POST /api/metadata — bulk site-metadata updates from the enrichment
/// collaborator. Items are validated individually; bad entries are reported
/// without blocking the rest.
pub async fn update_metadata(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Json(items): Json<Vec<MetadataUpdateItem>>,
) -> Result<Json<ApiResponse<MetadataUpdateDto>>, ApiError> {
    if items.is_empty() {
        return Err(ApiError::validation("No updates provided"));
    }

    let total_requested = items.len();
    let mut updated = 0;
    let mut errors = Vec::new();

    for item in items {
        let category = match item.category {
            Some(value) => match Category::try_from(value) {
                Ok(category) => Some(category),
                Err(e) => {
                    errors.push(format!("id {}: {}", item.id, e));
                    continue;
                }
            },
            None => None,
        };

        // Ownership check: never touch another user's rows.
        match state.store().result_by_id(item.id, Some(&user_id)).await? {
            Some(_) => {}
            None => {
                errors.push(format!("id {}: not found", item.id));
                continue;
            }
        }

        let changed = state
            .store()
            .update_metadata(
                item.id,
                item.contact_url.as_deref(),
                item.is_wordpress,
                category,
            )
            .await?;

        if changed {
            updated += 1;
        } else {
            errors.push(format!("id {}: update had no effect", item.id));
        }
    }

    if updated == 0 && !errors.is_empty() {
        return Err(ApiError::validation(format!(
            "No valid updates applied: {}",
            errors.join("; ")
        )));
    }

    Ok(Json(ApiResponse::success(MetadataUpdateDto {
        updated,
        total_requested,
        errors,
    })))
}
