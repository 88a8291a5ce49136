pub mod serpapi;

use anyhow::Result;

/// One page of organic hits from the upstream search provider.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub hits: Vec<OrganicHit>,
}

#[derive(Debug, Clone)]
pub struct OrganicHit {
    pub title: Option<String>,
    pub link: String,
    pub snippet: Option<String>,
}

/// Seam between the orchestrator and the external search API, so cycles can
/// be driven by a scripted provider in tests.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn fetch_page(&self, query: &str, start: u64, page_size: u64) -> Result<SearchPage>;
}
