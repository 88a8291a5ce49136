use anyhow::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::entities::{prelude::*, search_pagination};

/// Repository for the per-`(query, user)` pagination cursor.
pub struct PaginationRepository {
    conn: DatabaseConnection,
}

impl PaginationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(
        &self,
        query: &str,
        user_id: &str,
    ) -> Result<Option<search_pagination::Model>> {
        let row = SearchPagination::find()
            .filter(search_pagination::Column::SearchQuery.eq(query))
            .filter(search_pagination::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await?;

        Ok(row)
    }

    /// Upserts the cursor: create on first search, overwrite afterwards.
    /// Values are absolute; callers compute them inside the cycle's critical
    /// section so the read-modify-write cannot interleave.
    pub async fn upsert(
        &self,
        query: &str,
        user_id: &str,
        next_start_position: i64,
        total_requests_made: i64,
    ) -> Result<()> {
        let active_model = search_pagination::ActiveModel {
            search_query: Set(query.to_string()),
            user_id: Set(user_id.to_string()),
            last_start_position: Set(next_start_position),
            total_requests_made: Set(total_requests_made),
            last_updated: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        SearchPagination::insert(active_model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    search_pagination::Column::SearchQuery,
                    search_pagination::Column::UserId,
                ])
                .update_columns([
                    search_pagination::Column::LastStartPosition,
                    search_pagination::Column::TotalRequestsMade,
                    search_pagination::Column::LastUpdated,
                ])
                .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Deletes the cursor; the next cycle for this key starts at offset 0.
    pub async fn reset(&self, query: &str, user_id: &str) -> Result<bool> {
        let result = SearchPagination::delete_many()
            .filter(search_pagination::Column::SearchQuery.eq(query))
            .filter(search_pagination::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<search_pagination::Model>> {
        let rows = SearchPagination::find()
            .filter(search_pagination::Column::UserId.eq(user_id))
            .order_by_desc(search_pagination::Column::LastUpdated)
            .all(&self.conn)
            .await?;

        Ok(rows)
    }
}
