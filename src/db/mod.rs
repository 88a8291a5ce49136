use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::models::{Category, ProcessedState};

pub mod migrator;
pub mod repositories;

pub use crate::entities::search_pagination::Model as PaginationState;
pub use crate::entities::search_results::Model as SearchResultRow;
pub use repositories::results::{
    ActivityBucket, AnalyticsReport, CategoryBucket, HistoryEntry, NewSearchResult, StatusBucket,
};

/// Explicitly constructed, dependency-injected database handle. Owns the
/// connection pool and applies the migration chain once at construction.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("::memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn results_repo(&self) -> repositories::results::ResultsRepository {
        repositories::results::ResultsRepository::new(self.conn.clone())
    }

    fn pagination_repo(&self) -> repositories::pagination::PaginationRepository {
        repositories::pagination::PaginationRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Search results
    // ========================================================================

    pub async fn insert_results(&self, results: &[NewSearchResult]) -> Result<Vec<i32>> {
        self.results_repo().insert_many(results).await
    }

    pub async fn insert_manual_result(&self, result: &NewSearchResult) -> Result<i32> {
        self.results_repo().insert_one(result).await
    }

    pub async fn results_by_ids(&self, ids: &[i32]) -> Result<Vec<SearchResultRow>> {
        self.results_repo().find_by_ids(ids).await
    }

    pub async fn results_by_query(
        &self,
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<SearchResultRow>> {
        self.results_repo().find_by_query(query, user_id).await
    }

    pub async fn result_by_id(
        &self,
        id: i32,
        user_id: Option<&str>,
    ) -> Result<Option<SearchResultRow>> {
        self.results_repo().find_by_id(id, user_id).await
    }

    pub async fn search_history(&self, user_id: Option<&str>) -> Result<Vec<HistoryEntry>> {
        self.results_repo().history(user_id).await
    }

    /// Deletes all rows for a query and its cursor together (all-or-nothing).
    pub async fn purge_query(&self, query: &str, user_id: Option<&str>) -> Result<u64> {
        self.results_repo().purge_query(query, user_id).await
    }

    pub async fn total_count(&self, user_id: Option<&str>) -> Result<i64> {
        self.results_repo().count(user_id).await
    }

    pub async fn domain_exists(&self, link: &str, user_id: Option<&str>) -> Result<bool> {
        self.results_repo().domain_exists(link, user_id).await
    }

    pub async fn update_status(&self, id: i32, state: ProcessedState) -> Result<bool> {
        self.results_repo().update_status(id, state).await
    }

    pub async fn update_status_by_query(
        &self,
        query: &str,
        state: ProcessedState,
        user_id: Option<&str>,
    ) -> Result<u64> {
        self.results_repo()
            .update_status_by_query(query, state, user_id)
            .await
    }

    pub async fn claim_next_scannable(&self) -> Result<Option<SearchResultRow>> {
        self.results_repo().claim_next_scannable().await
    }

    pub async fn latest_by_link(
        &self,
        user_id: &str,
        link: &str,
    ) -> Result<Option<SearchResultRow>> {
        self.results_repo().latest_by_link(user_id, link).await
    }

    pub async fn record_scan_outcome(
        &self,
        id: i32,
        state: ProcessedState,
        errors: Option<&str>,
        scan_details: Option<&str>,
    ) -> Result<bool> {
        self.results_repo()
            .record_scan_outcome(id, state, errors, scan_details)
            .await
    }

    pub async fn update_metadata(
        &self,
        id: i32,
        contact_url: Option<&str>,
        is_wordpress: Option<bool>,
        category: Option<Category>,
    ) -> Result<bool> {
        self.results_repo()
            .update_metadata(id, contact_url, is_wordpress, category)
            .await
    }

    pub async fn analytics(&self, user_id: &str) -> Result<AnalyticsReport> {
        self.results_repo().analytics(user_id).await
    }

    // ========================================================================
    // Pagination cursors
    // ========================================================================

    pub async fn pagination_state(
        &self,
        query: &str,
        user_id: &str,
    ) -> Result<Option<PaginationState>> {
        self.pagination_repo().get(query, user_id).await
    }

    pub async fn advance_pagination(
        &self,
        query: &str,
        user_id: &str,
        next_start_position: i64,
        total_requests_made: i64,
    ) -> Result<()> {
        self.pagination_repo()
            .upsert(query, user_id, next_start_position, total_requests_made)
            .await
    }

    pub async fn reset_pagination(&self, query: &str, user_id: &str) -> Result<bool> {
        self.pagination_repo().reset(query, user_id).await
    }

    pub async fn pagination_states_for_user(&self, user_id: &str) -> Result<Vec<PaginationState>> {
        self.pagination_repo().list_for_user(user_id).await
    }
}
