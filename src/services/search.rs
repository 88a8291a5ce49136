//! Search orchestration: one bounded fetch-dedup-persist-advance cycle per
//! invocation, resumable through the persisted pagination cursor.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clients::SearchProvider;
use crate::db::{NewSearchResult, SearchResultRow, Store};
use crate::models::{Category, ProcessedState, normalize_link};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search query must not be blank")]
    EmptyQuery,

    #[error("Search provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for SearchError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Snapshot of the provider policy for a cycle.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub page_size: u64,
    /// Upper bound on provider calls per invocation. Kept small so each HTTP
    /// request stays fast; backfills are driven by repeated client calls.
    pub max_requests_per_cycle: u32,
    /// Appended to every provider query (targets WordPress installs).
    pub query_suffix: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            max_requests_per_cycle: 1,
            query_suffix: "inurl:wp-content".to_string(),
        }
    }
}

/// What one orchestration cycle produced.
#[derive(Debug)]
pub struct CycleOutcome {
    pub query: String,
    /// Newly inserted rows, re-read from the store so ids and timestamps are
    /// populated.
    pub results: Vec<SearchResultRow>,
    pub requests_made: u32,
    pub total_requests_overall: i64,
    pub next_start_position: i64,
}

type CycleKey = (String, String);

pub struct SearchService {
    store: Store,
    provider: Arc<dyn SearchProvider>,
    settings: SearchSettings,
    /// Per-`(query, user)` critical sections. Two concurrent cycles for the
    /// same key would race on the cursor upsert and on duplicate detection.
    cycle_locks: Mutex<HashMap<CycleKey, Arc<Mutex<()>>>>,
}

impl SearchService {
    #[must_use]
    pub fn new(store: Store, provider: Arc<dyn SearchProvider>, settings: SearchSettings) -> Self {
        Self {
            store,
            provider,
            settings,
            cycle_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, query: &str, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.cycle_locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry((query.to_string(), user_id.to_string()))
            .or_default()
            .clone()
    }

    /// Executes one bounded unit of work: fetch page(s) from the provider,
    /// filter new domains, persist them, advance the cursor.
    ///
    /// The insert commits before the cursor advances, so a crash between the
    /// two at worst repeats a provider call and never loses results.
    pub async fn run_cycle(
        &self,
        query: &str,
        user_id: &str,
        reset_pagination: bool,
    ) -> Result<CycleOutcome, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let lock = self.lock_for(query, user_id).await;
        let _guard = lock.lock().await;

        if reset_pagination {
            self.store.reset_pagination(query, user_id).await?;
            debug!("Pagination reset for \"{}\"", query);
        }

        let cursor = self.store.pagination_state(query, user_id).await?;
        let start_offset = cursor.as_ref().map_or(0, |c| c.last_start_position.max(0));
        let prior_requests = cursor.as_ref().map_or(0, |c| c.total_requests_made);

        let page_size = self.settings.page_size;
        let provider_query = if self.settings.query_suffix.is_empty() {
            query.to_string()
        } else {
            format!("{} {}", query, self.settings.query_suffix)
        };

        let mut staged: Vec<NewSearchResult> = Vec::new();
        let mut seen_links: HashSet<String> = HashSet::new();
        let mut pages_fetched: u32 = 0;

        for request in 0..self.settings.max_requests_per_cycle {
            let offset = start_offset + i64::from(request) * page_size as i64;

            let page = match self
                .provider
                .fetch_page(&provider_query, offset as u64, page_size)
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    warn!(
                        "Provider call failed for \"{}\" at offset {}: {}",
                        query, offset, err
                    );
                    if pages_fetched == 0 {
                        return Err(SearchError::Provider(err.to_string()));
                    }
                    // Keep what earlier pages gathered; the failed page is
                    // retried by the next cycle because the cursor only
                    // advances over the consumed prefix.
                    break;
                }
            };

            pages_fetched += 1;
            let hit_count = page.hits.len();

            for (index, hit) in page.hits.into_iter().enumerate() {
                let Some(link) = normalize_link(&hit.link) else {
                    debug!("Skipping unusable link: {}", hit.link);
                    continue;
                };

                // In-batch dedup first: adjacent pages can repeat a domain.
                if !seen_links.insert(link.clone()) {
                    continue;
                }

                if self.store.domain_exists(&link, Some(user_id)).await? {
                    continue;
                }

                staged.push(NewSearchResult {
                    search_query: query.to_string(),
                    title: hit.title,
                    link,
                    snippet: hit.snippet,
                    position: Some((offset + index as i64 + 1) as i32),
                    user_id: user_id.to_string(),
                    processed: ProcessedState::Unprocessed,
                    category: Category::Discovered,
                });
            }

            // A short page signals the end of upstream results.
            if (hit_count as u64) < page_size {
                debug!("Short page for \"{}\" at offset {}", query, offset);
                break;
            }

            if request + 1 < self.settings.max_requests_per_cycle {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }

        let inserted_ids = self.store.insert_results(&staged).await?;

        let mut next_start_position = start_offset;
        let mut total_requests_overall = prior_requests;

        if pages_fetched > 0 {
            next_start_position = start_offset + i64::from(pages_fetched) * page_size as i64;
            total_requests_overall = prior_requests + i64::from(pages_fetched);
            self.store
                .advance_pagination(query, user_id, next_start_position, total_requests_overall)
                .await?;
        }

        let results = self.store.results_by_ids(&inserted_ids).await?;

        info!(
            "Search cycle for \"{}\": {} new results, {} provider call(s), next offset {}",
            query,
            results.len(),
            pages_fetched,
            next_start_position
        );

        Ok(CycleOutcome {
            query: query.to_string(),
            results,
            requests_made: pages_fetched,
            total_requests_overall,
            next_start_position,
        })
    }
}
