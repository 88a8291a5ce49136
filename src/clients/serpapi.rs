use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

use super::{OrganicHit, SearchPage, SearchProvider};
use crate::config::SerpApiConfig;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    error: Option<String>,
    #[serde(default)]
    organic_results: Vec<SerpApiOrganicResult>,
}

#[derive(Debug, Deserialize)]
struct SerpApiOrganicResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

/// Google-search client backed by SerpApi.
#[derive(Clone)]
pub struct SerpApiClient {
    client: Client,
    api_key: String,
    location: String,
    language: String,
    country: String,
}

impl SerpApiClient {
    #[must_use]
    pub fn with_shared_client(client: Client, config: &SerpApiConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            location: config.location.clone(),
            language: config.language.clone(),
            country: config.country.clone(),
        }
    }
}

#[async_trait::async_trait]
impl SearchProvider for SerpApiClient {
    async fn fetch_page(&self, query: &str, start: u64, page_size: u64) -> Result<SearchPage> {
        if self.api_key.is_empty() {
            anyhow::bail!("SerpApi key is not configured (set SERPAPI_KEY or [serpapi].api_key)");
        }

        let url = format!(
            "{}?engine=google&q={}&location={}&hl={}&gl={}&start={}&num={}&api_key={}",
            SERPAPI_URL,
            urlencoding::encode(query),
            urlencoding::encode(&self.location),
            urlencoding::encode(&self.language),
            urlencoding::encode(&self.country),
            start,
            page_size,
            urlencoding::encode(&self.api_key),
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("SerpApi error: {} - {}", status, body));
        }

        let response: SerpApiResponse = response.json().await?;

        if let Some(error) = response.error {
            return Err(anyhow::anyhow!("SerpApi error: {}", error));
        }

        let hits = response
            .organic_results
            .into_iter()
            .filter_map(|r| {
                r.link.map(|link| OrganicHit {
                    title: r.title,
                    link,
                    snippet: r.snippet,
                })
            })
            .collect();

        Ok(SearchPage { hits })
    }
}
