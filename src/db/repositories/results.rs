use anyhow::Result;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use serde::Serialize;

use crate::entities::{prelude::*, search_pagination, search_results};
use crate::models::{Category, ProcessedState};

/// Repository for stored search results.
pub struct ResultsRepository {
    conn: DatabaseConnection,
}

/// A staged row, validated and deduplicated by the caller, not yet persisted.
#[derive(Debug, Clone)]
pub struct NewSearchResult {
    pub search_query: String,
    pub title: Option<String>,
    pub link: String,
    pub snippet: Option<String>,
    pub position: Option<i32>,
    pub user_id: String,
    pub processed: ProcessedState,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub search_query: String,
    pub count: i64,
    pub last_search: String,
}

impl ResultsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn active_model(result: &NewSearchResult, now: &str) -> search_results::ActiveModel {
        search_results::ActiveModel {
            search_query: Set(result.search_query.clone()),
            title: Set(result.title.clone()),
            link: Set(result.link.clone()),
            snippet: Set(result.snippet.clone()),
            position: Set(result.position),
            user_id: Set(result.user_id.clone()),
            processed: Set(result.processed.as_i32()),
            category: Set(result.category.as_i32()),
            created_at: Set(now.to_string()),
            updated_at: Set(now.to_string()),
            ..Default::default()
        }
    }

    /// Bulk-appends a batch in one transaction; all rows land or none do.
    /// Callers are responsible for deduplication before staging.
    pub async fn insert_many(&self, results: &[NewSearchResult]) -> Result<Vec<i32>> {
        if results.is_empty() {
            return Ok(Vec::new());
        }

        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        let mut ids = Vec::with_capacity(results.len());
        for result in results {
            let res = SearchResults::insert(Self::active_model(result, &now))
                .exec(&txn)
                .await?;
            ids.push(res.last_insert_id);
        }

        txn.commit().await?;
        Ok(ids)
    }

    pub async fn insert_one(&self, result: &NewSearchResult) -> Result<i32> {
        let now = chrono::Utc::now().to_rfc3339();
        let res = SearchResults::insert(Self::active_model(result, &now))
            .exec(&self.conn)
            .await?;
        Ok(res.last_insert_id)
    }

    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<search_results::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = SearchResults::find()
            .filter(search_results::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(search_results::Column::Position)
            .order_by_asc(search_results::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows)
    }

    /// Newest first, then by upstream rank ascending within a batch.
    pub async fn find_by_query(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<search_results::Model>> {
        let mut select =
            SearchResults::find().filter(search_results::Column::SearchQuery.eq(query));

        if let Some(user_id) = user_id {
            select = select.filter(search_results::Column::UserId.eq(user_id));
        }

        let rows = select
            .order_by_desc(search_results::Column::CreatedAt)
            .order_by_asc(search_results::Column::Position)
            .all(&self.conn)
            .await?;

        Ok(rows)
    }

    pub async fn find_by_id(
        &self,
        id: i32,
        user_id: Option<&str>,
    ) -> Result<Option<search_results::Model>> {
        let mut select = SearchResults::find().filter(search_results::Column::Id.eq(id));

        if let Some(user_id) = user_id {
            select = select.filter(search_results::Column::UserId.eq(user_id));
        }

        Ok(select.one(&self.conn).await?)
    }

    /// Queries grouped with row counts, most recently searched first.
    pub async fn history(&self, user_id: Option<&str>) -> Result<Vec<HistoryEntry>> {
        let mut select = SearchResults::find()
            .select_only()
            .column(search_results::Column::SearchQuery)
            .column_as(search_results::Column::Id.count(), "count")
            .column_as(search_results::Column::CreatedAt.max(), "last_search")
            .group_by(search_results::Column::SearchQuery);

        if let Some(user_id) = user_id {
            select = select.filter(search_results::Column::UserId.eq(user_id));
        }

        let rows: Vec<(String, i64, String)> = select
            .order_by_desc(search_results::Column::CreatedAt.max())
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(search_query, count, last_search)| HistoryEntry {
                search_query,
                count,
                last_search,
            })
            .collect())
    }

    /// Deletes a query's rows and its pagination cursor in one transaction,
    /// so the cursor can never outlive the results it describes.
    pub async fn purge_query(&self, query: &str, user_id: Option<&str>) -> Result<u64> {
        let txn = self.conn.begin().await?;

        let mut delete_results =
            SearchResults::delete_many().filter(search_results::Column::SearchQuery.eq(query));
        let mut delete_cursor = SearchPagination::delete_many()
            .filter(search_pagination::Column::SearchQuery.eq(query));

        if let Some(user_id) = user_id {
            delete_results = delete_results.filter(search_results::Column::UserId.eq(user_id));
            delete_cursor = delete_cursor.filter(search_pagination::Column::UserId.eq(user_id));
        }

        let deleted = delete_results.exec(&txn).await?.rows_affected;
        delete_cursor.exec(&txn).await?;

        txn.commit().await?;
        Ok(deleted)
    }

    pub async fn count(&self, user_id: Option<&str>) -> Result<i64> {
        let mut select = SearchResults::find();

        if let Some(user_id) = user_id {
            select = select.filter(search_results::Column::UserId.eq(user_id));
        }

        Ok(select.count(&self.conn).await? as i64)
    }

    /// Deduplication Gate lookup. `link` must already be normalized.
    pub async fn domain_exists(&self, link: &str, user_id: Option<&str>) -> Result<bool> {
        let mut select = SearchResults::find().filter(search_results::Column::Link.eq(link));

        if let Some(user_id) = user_id {
            select = select.filter(search_results::Column::UserId.eq(user_id));
        }

        Ok(select.count(&self.conn).await? > 0)
    }

    pub async fn update_status(&self, id: i32, state: ProcessedState) -> Result<bool> {
        let result = SearchResults::update_many()
            .col_expr(
                search_results::Column::Processed,
                Expr::value(state.as_i32()),
            )
            .col_expr(
                search_results::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(search_results::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn update_status_by_query(
        &self,
        query: &str,
        state: ProcessedState,
        user_id: Option<&str>,
    ) -> Result<u64> {
        let mut update = SearchResults::update_many()
            .col_expr(
                search_results::Column::Processed,
                Expr::value(state.as_i32()),
            )
            .col_expr(
                search_results::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(search_results::Column::SearchQuery.eq(query));

        if let Some(user_id) = user_id {
            update = update.filter(search_results::Column::UserId.eq(user_id));
        }

        Ok(update.exec(&self.conn).await?.rows_affected)
    }

    /// Atomically claims the oldest scannable row (unprocessed or failed,
    /// with a link) by flipping it to in-progress before returning it.
    pub async fn claim_next_scannable(&self) -> Result<Option<search_results::Model>> {
        let txn = self.conn.begin().await?;

        let row = SearchResults::find()
            .filter(search_results::Column::Processed.is_in([
                ProcessedState::Unprocessed.as_i32(),
                ProcessedState::Failed.as_i32(),
            ]))
            .filter(search_results::Column::Link.ne(""))
            .order_by_asc(search_results::Column::CreatedAt)
            .order_by_asc(search_results::Column::Id)
            .one(&txn)
            .await?;

        let Some(row) = row else {
            txn.commit().await?;
            return Ok(None);
        };

        let now = chrono::Utc::now().to_rfc3339();
        SearchResults::update_many()
            .col_expr(
                search_results::Column::Processed,
                Expr::value(ProcessedState::InProgress.as_i32()),
            )
            .col_expr(search_results::Column::UpdatedAt, Expr::value(now.clone()))
            .filter(search_results::Column::Id.eq(row.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        Ok(Some(search_results::Model {
            processed: ProcessedState::InProgress.as_i32(),
            updated_at: now,
            ..row
        }))
    }

    /// Most recent row for a `(user, link)` pair, the fallback used to match
    /// scan callbacks that carry no correlation id.
    pub async fn latest_by_link(
        &self,
        user_id: &str,
        link: &str,
    ) -> Result<Option<search_results::Model>> {
        let row = SearchResults::find()
            .filter(search_results::Column::UserId.eq(user_id))
            .filter(search_results::Column::Link.eq(link))
            .order_by_desc(search_results::Column::CreatedAt)
            .order_by_desc(search_results::Column::Id)
            .one(&self.conn)
            .await?;

        Ok(row)
    }

    pub async fn record_scan_outcome(
        &self,
        id: i32,
        state: ProcessedState,
        errors: Option<&str>,
        scan_details: Option<&str>,
    ) -> Result<bool> {
        let result = SearchResults::update_many()
            .col_expr(
                search_results::Column::Processed,
                Expr::value(state.as_i32()),
            )
            .col_expr(search_results::Column::Errors, Expr::value(errors))
            .col_expr(
                search_results::Column::ScanDetails,
                Expr::value(scan_details),
            )
            .col_expr(
                search_results::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(search_results::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn update_metadata(
        &self,
        id: i32,
        contact_url: Option<&str>,
        is_wordpress: Option<bool>,
        category: Option<Category>,
    ) -> Result<bool> {
        let mut update = SearchResults::update_many()
            .col_expr(
                search_results::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(search_results::Column::Id.eq(id));

        if let Some(contact_url) = contact_url {
            update = update.col_expr(search_results::Column::ContactUrl, Expr::value(contact_url));
        }
        if let Some(is_wordpress) = is_wordpress {
            update = update.col_expr(
                search_results::Column::IsWordpress,
                Expr::value(is_wordpress),
            );
        }
        if let Some(category) = category {
            update = update.col_expr(
                search_results::Column::Category,
                Expr::value(category.as_i32()),
            );
        }

        Ok(update.exec(&self.conn).await?.rows_affected > 0)
    }

    pub async fn analytics(&self, user_id: &str) -> Result<AnalyticsReport> {
        let total_results = self.count(Some(user_id)).await?;

        let processed: Vec<(i32, i64)> = SearchResults::find()
            .select_only()
            .column(search_results::Column::Processed)
            .column_as(search_results::Column::Id.count(), "count")
            .filter(search_results::Column::UserId.eq(user_id))
            .group_by(search_results::Column::Processed)
            .into_tuple()
            .all(&self.conn)
            .await?;

        let categories: Vec<(i32, i64)> = SearchResults::find()
            .select_only()
            .column(search_results::Column::Category)
            .column_as(search_results::Column::Id.count(), "count")
            .filter(search_results::Column::UserId.eq(user_id))
            .group_by(search_results::Column::Category)
            .into_tuple()
            .all(&self.conn)
            .await?;

        let activity_rows = self
            .conn
            .query_all(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                "SELECT DATE(created_at) AS day, COUNT(*) AS count \
                 FROM search_results \
                 WHERE user_id = ? AND datetime(created_at) >= datetime('now', '-30 days') \
                 GROUP BY DATE(created_at) ORDER BY day ASC",
                [user_id.into()],
            ))
            .await?;

        let mut activity = Vec::with_capacity(activity_rows.len());
        for row in activity_rows {
            activity.push(ActivityBucket {
                date: row.try_get("", "day")?,
                count: row.try_get("", "count")?,
            });
        }

        let top_queries: Vec<(String, i64, String)> = SearchResults::find()
            .select_only()
            .column(search_results::Column::SearchQuery)
            .column_as(search_results::Column::Id.count(), "count")
            .column_as(search_results::Column::CreatedAt.max(), "last_search")
            .filter(search_results::Column::UserId.eq(user_id))
            .group_by(search_results::Column::SearchQuery)
            .order_by_desc(search_results::Column::Id.count())
            .limit(10)
            .into_tuple()
            .all(&self.conn)
            .await?;

        let scan_errors = SearchResults::find()
            .filter(search_results::Column::UserId.eq(user_id))
            .filter(search_results::Column::Errors.is_not_null())
            .count(&self.conn)
            .await? as i64;

        let pagination: Option<(i64, Option<i64>)> = SearchPagination::find()
            .select_only()
            .column_as(search_pagination::Column::Id.count(), "queries")
            .column_as(
                search_pagination::Column::TotalRequestsMade.sum(),
                "requests",
            )
            .filter(search_pagination::Column::UserId.eq(user_id))
            .into_tuple()
            .one(&self.conn)
            .await?;

        let (tracked_queries, provider_requests) = pagination
            .map(|(queries, requests)| (queries, requests.unwrap_or(0)))
            .unwrap_or((0, 0));

        let recent = SearchResults::find()
            .filter(search_results::Column::UserId.eq(user_id))
            .filter(Expr::cust(
                "datetime(created_at) >= datetime('now', '-7 days')",
            ))
            .order_by_desc(search_results::Column::CreatedAt)
            .order_by_desc(search_results::Column::Id)
            .limit(20)
            .all(&self.conn)
            .await?;

        Ok(AnalyticsReport {
            total_results,
            tracked_queries,
            provider_requests,
            scan_errors,
            processed: processed
                .into_iter()
                .map(|(status, count)| StatusBucket { status, count })
                .collect(),
            categories: categories
                .into_iter()
                .map(|(category, count)| CategoryBucket { category, count })
                .collect(),
            activity,
            top_queries: top_queries
                .into_iter()
                .map(|(search_query, count, last_search)| HistoryEntry {
                    search_query,
                    count,
                    last_search,
                })
                .collect(),
            recent,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub total_results: i64,
    pub tracked_queries: i64,
    pub provider_requests: i64,
    pub scan_errors: i64,
    pub processed: Vec<StatusBucket>,
    pub categories: Vec<CategoryBucket>,
    pub activity: Vec<ActivityBucket>,
    pub top_queries: Vec<HistoryEntry>,
    #[serde(skip)]
    pub recent: Vec<search_results::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusBucket {
    pub status: i32,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBucket {
    pub category: i32,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityBucket {
    pub date: String,
    pub count: i64,
}
