use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clients::SearchProvider;
use crate::clients::serpapi::SerpApiClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{ScanService, SearchService, SearchSettings};

/// Build a shared HTTP client with reasonable defaults for API calls.
/// Reused across all HTTP-based collaborators for connection pooling, and
/// carries the bounded per-call timeout required of provider fetches.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Prospektor/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub search_service: Arc<SearchService>,

    pub scan_service: Arc<ScanService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let http_client = build_shared_http_client(config.serpapi.request_timeout_seconds)?;
        let provider: Arc<dyn SearchProvider> = Arc::new(SerpApiClient::with_shared_client(
            http_client,
            &config.serpapi,
        ));

        Self::with_provider(config, store, provider)
    }

    /// Wires the services around an explicit store and provider; tests swap
    /// in a scripted provider here.
    pub fn with_provider(
        config: Config,
        store: Store,
        provider: Arc<dyn SearchProvider>,
    ) -> anyhow::Result<Self> {
        let settings = SearchSettings {
            page_size: config.serpapi.page_size,
            max_requests_per_cycle: config.serpapi.max_requests_per_cycle,
            query_suffix: config.serpapi.query_suffix.clone(),
        };

        let search_service = Arc::new(SearchService::new(store.clone(), provider, settings));
        let scan_service = Arc::new(ScanService::new(store.clone()));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            search_service,
            scan_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
