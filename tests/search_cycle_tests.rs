//! Orchestrator-level tests: cursor resume, dedup, failure semantics.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use prospektor::clients::{OrganicHit, SearchPage, SearchProvider};
use prospektor::db::{NewSearchResult, Store};
use prospektor::models::{Category, ProcessedState};
use prospektor::services::{SearchError, SearchService, SearchSettings};

/// Provider stand-in that serves a fixed script of pages and records the
/// offsets it was called with.
struct ScriptedProvider {
    pages: Mutex<VecDeque<Result<SearchPage, String>>>,
    offsets: Mutex<Vec<u64>>,
}

impl ScriptedProvider {
    fn new(pages: Vec<Result<SearchPage, String>>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages.into()),
            offsets: Mutex::new(Vec::new()),
        })
    }

    fn offsets(&self) -> Vec<u64> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchProvider for ScriptedProvider {
    async fn fetch_page(&self, _query: &str, start: u64, _page_size: u64) -> anyhow::Result<SearchPage> {
        self.offsets.lock().unwrap().push(start);
        match self.pages.lock().unwrap().pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(SearchPage::default()),
        }
    }
}

fn page_of(domains: &[&str]) -> Result<SearchPage, String> {
    Ok(SearchPage {
        hits: domains
            .iter()
            .map(|domain| OrganicHit {
                title: Some(format!("Site at {}", domain)),
                link: format!("https://www.{}/wp-content/themes/x", domain),
                snippet: Some("lorem".to_string()),
            })
            .collect(),
    })
}

fn domains(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}{}.pl", prefix, i)).collect()
}

async fn test_store() -> Store {
    let db_path = std::env::temp_dir().join(format!("prospektor-cycle-{}.db", uuid::Uuid::new_v4()));
    Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open test store")
}

fn service(store: Store, provider: Arc<ScriptedProvider>, max_requests: u32) -> SearchService {
    SearchService::new(
        store,
        provider,
        SearchSettings {
            page_size: 10,
            max_requests_per_cycle: max_requests,
            query_suffix: "inurl:wp-content".to_string(),
        },
    )
}

fn seeded(query: &str, user: &str, link: &str) -> NewSearchResult {
    NewSearchResult {
        search_query: query.to_string(),
        title: None,
        link: link.to_string(),
        snippet: None,
        position: None,
        user_id: user.to_string(),
        processed: ProcessedState::Unprocessed,
        category: Category::Discovered,
    }
}

#[tokio::test]
async fn test_first_cycle_dedups_against_store_and_advances_cursor() {
    let store = test_store().await;
    let user = "user-a";
    let query = "dentysta warszawa";

    // Two of the ten upstream domains are already stored for this user.
    store
        .insert_results(&[
            seeded(query, user, "https://dent0.pl"),
            seeded(query, user, "https://dent1.pl"),
        ])
        .await
        .unwrap();

    let all: Vec<String> = domains("dent", 10);
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();
    let provider = ScriptedProvider::new(vec![page_of(&refs)]);
    let service = service(store.clone(), provider.clone(), 1);

    let outcome = service.run_cycle(query, user, false).await.unwrap();

    assert_eq!(outcome.results.len(), 8);
    assert_eq!(outcome.requests_made, 1);
    assert_eq!(outcome.total_requests_overall, 1);
    assert_eq!(outcome.next_start_position, 10);
    for row in &outcome.results {
        assert_eq!(row.processed, 0);
        assert_eq!(row.category, 0);
        assert!(row.id > 0);
    }

    let cursor = store.pagination_state(query, user).await.unwrap().unwrap();
    assert_eq!(cursor.last_start_position, 10);
    assert_eq!(cursor.total_requests_made, 1);

    assert_eq!(provider.offsets(), vec![0]);
    assert_eq!(store.total_count(Some(user)).await.unwrap(), 10);
}

#[tokio::test]
async fn test_short_page_stops_a_multi_page_cycle_early() {
    let store = test_store().await;
    let user = "user-a";
    let query = "dentysta warszawa";

    let first: Vec<String> = domains("alpha", 10);
    let first_refs: Vec<&str> = first.iter().map(String::as_str).collect();
    let second: Vec<String> = domains("beta", 4);
    let second_refs: Vec<&str> = second.iter().map(String::as_str).collect();

    // Three pages allowed per cycle; the short second page must stop the
    // loop before a third provider call happens.
    let provider = ScriptedProvider::new(vec![page_of(&first_refs), page_of(&second_refs)]);
    let service = service(store.clone(), provider.clone(), 3);

    let outcome = service.run_cycle(query, user, false).await.unwrap();
    assert_eq!(outcome.results.len(), 14);
    assert_eq!(outcome.requests_made, 2);
    assert_eq!(outcome.next_start_position, 20);
    assert_eq!(provider.offsets(), vec![0, 10]);

    let cursor = store.pagination_state(query, user).await.unwrap().unwrap();
    assert_eq!(cursor.last_start_position, 20);
    assert_eq!(cursor.total_requests_made, 2);
}

#[tokio::test]
async fn test_resume_offsets_form_contiguous_progression() {
    let store = test_store().await;
    let user = "user-a";
    let query = "sklep rowerowy";

    let a: Vec<String> = domains("a", 10);
    let a_refs: Vec<&str> = a.iter().map(String::as_str).collect();
    let b: Vec<String> = domains("b", 10);
    let b_refs: Vec<&str> = b.iter().map(String::as_str).collect();

    let provider = ScriptedProvider::new(vec![page_of(&a_refs), page_of(&b_refs)]);
    let service = service(store.clone(), provider.clone(), 1);

    service.run_cycle(query, user, false).await.unwrap();
    service.run_cycle(query, user, false).await.unwrap();

    // No page skipped, no page repeated.
    assert_eq!(provider.offsets(), vec![0, 10]);

    let cursor = store.pagination_state(query, user).await.unwrap().unwrap();
    assert_eq!(cursor.last_start_position, 20);
    assert_eq!(cursor.total_requests_made, 2);
    assert_eq!(store.total_count(Some(user)).await.unwrap(), 20);
}

#[tokio::test]
async fn test_reset_restarts_at_offset_zero() {
    let store = test_store().await;
    let user = "user-a";
    let query = "fryzjer krakow";

    let a: Vec<String> = domains("a", 10);
    let a_refs: Vec<&str> = a.iter().map(String::as_str).collect();
    let b: Vec<String> = domains("b", 10);
    let b_refs: Vec<&str> = b.iter().map(String::as_str).collect();

    let provider = ScriptedProvider::new(vec![page_of(&a_refs), page_of(&b_refs)]);
    let service = service(store.clone(), provider.clone(), 1);

    service.run_cycle(query, user, false).await.unwrap();
    let outcome = service.run_cycle(query, user, true).await.unwrap();

    assert_eq!(provider.offsets(), vec![0, 0]);
    assert_eq!(outcome.next_start_position, 10);
    // The counter starts over with the cursor.
    assert_eq!(outcome.total_requests_overall, 1);
}

#[tokio::test]
async fn test_in_batch_duplicates_are_suppressed() {
    let store = test_store().await;
    let provider = ScriptedProvider::new(vec![Ok(SearchPage {
        hits: vec![
            OrganicHit {
                title: Some("a".to_string()),
                link: "https://www.example.pl/cennik".to_string(),
                snippet: None,
            },
            OrganicHit {
                title: Some("b".to_string()),
                link: "https://example.pl/kontakt".to_string(),
                snippet: None,
            },
            OrganicHit {
                title: Some("c".to_string()),
                link: "example.pl".to_string(),
                snippet: None,
            },
        ],
    })]);
    let service = service(store.clone(), provider, 1);

    let outcome = service.run_cycle("q", "user-a", false).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].link, "https://example.pl");
}

#[tokio::test]
async fn test_dedup_is_per_user() {
    let store = test_store().await;
    let all: Vec<String> = domains("site", 3);
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();

    let provider = ScriptedProvider::new(vec![page_of(&refs), page_of(&refs)]);
    let service = service(store.clone(), provider, 1);

    let first = service.run_cycle("q", "user-a", false).await.unwrap();
    let second = service.run_cycle("q", "user-b", false).await.unwrap();

    // Another user's rows do not shadow this user's discoveries.
    assert_eq!(first.results.len(), 3);
    assert_eq!(second.results.len(), 3);
}

#[tokio::test]
async fn test_blank_query_is_rejected_without_side_effects() {
    let store = test_store().await;
    let provider = ScriptedProvider::new(vec![]);
    let service = service(store.clone(), provider.clone(), 1);

    let err = service.run_cycle("   ", "user-a", false).await.unwrap_err();
    assert!(matches!(err, SearchError::EmptyQuery));
    assert!(provider.offsets().is_empty());
    assert_eq!(store.total_count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_first_page_failure_is_a_hard_failure() {
    let store = test_store().await;
    let provider = ScriptedProvider::new(vec![Err("quota exceeded".to_string())]);
    let service = service(store.clone(), provider, 1);

    let err = service.run_cycle("q", "user-a", false).await.unwrap_err();
    assert!(matches!(err, SearchError::Provider(_)));

    // Neither rows nor cursor may exist after a failed first page.
    assert_eq!(store.total_count(Some("user-a")).await.unwrap(), 0);
    assert!(store.pagination_state("q", "user-a").await.unwrap().is_none());
}

#[tokio::test]
async fn test_later_page_failure_keeps_gathered_prefix() {
    let store = test_store().await;
    let all: Vec<String> = domains("x", 10);
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();

    let provider =
        ScriptedProvider::new(vec![page_of(&refs), Err("timeout".to_string())]);
    let service = service(store.clone(), provider.clone(), 3);

    let outcome = service.run_cycle("q", "user-a", false).await.unwrap();

    assert_eq!(outcome.results.len(), 10);
    assert_eq!(outcome.requests_made, 1);
    // Cursor covers only the consumed prefix, so the failed page is retried
    // by the next cycle.
    assert_eq!(outcome.next_start_position, 10);
    assert_eq!(provider.offsets(), vec![0, 10]);
}

#[tokio::test]
async fn test_empty_page_is_a_valid_nothing_new_response() {
    let store = test_store().await;
    let provider = ScriptedProvider::new(vec![Ok(SearchPage::default())]);
    let service = service(store.clone(), provider, 1);

    let outcome = service.run_cycle("q", "user-a", false).await.unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.requests_made, 1);
    assert_eq!(outcome.next_start_position, 10);
}

#[tokio::test]
async fn test_concurrent_cycles_for_same_key_serialize() {
    let store = test_store().await;
    let all: Vec<String> = domains("race", 10);
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();

    // Both cycles see the same ten domains; without the per-key critical
    // section they would both stage all ten.
    let provider = ScriptedProvider::new(vec![page_of(&refs), page_of(&refs)]);
    let service = service(store.clone(), provider.clone(), 1);

    let (first, second) = tokio::join!(
        service.run_cycle("q", "user-a", false),
        service.run_cycle("q", "user-a", false),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(first.results.len() + second.results.len(), 10);
    assert_eq!(store.total_count(Some("user-a")).await.unwrap(), 10);

    let cursor = store.pagination_state("q", "user-a").await.unwrap().unwrap();
    assert_eq!(cursor.last_start_position, 20);
    assert_eq!(cursor.total_requests_made, 2);
    assert_eq!(provider.offsets(), vec![0, 10]);
}

#[tokio::test]
async fn test_purge_removes_rows_and_cursor_together() {
    let store = test_store().await;
    let user = "user-a";
    let query = "dentysta warszawa";

    let a: Vec<String> = domains("a", 10);
    let a_refs: Vec<&str> = a.iter().map(String::as_str).collect();
    let b: Vec<String> = domains("b", 10);
    let b_refs: Vec<&str> = b.iter().map(String::as_str).collect();

    let provider = ScriptedProvider::new(vec![page_of(&a_refs), page_of(&b_refs)]);
    let service = service(store.clone(), provider.clone(), 1);

    service.run_cycle(query, user, false).await.unwrap();

    let deleted = store.purge_query(query, Some(user)).await.unwrap();
    assert_eq!(deleted, 10);
    assert!(store.pagination_state(query, user).await.unwrap().is_none());
    assert!(store.search_history(Some(user)).await.unwrap().is_empty());

    // A later search behaves as if it were the first ever.
    let outcome = service.run_cycle(query, user, false).await.unwrap();
    assert_eq!(provider.offsets(), vec![0, 0]);
    assert_eq!(outcome.total_requests_overall, 1);
    assert_eq!(outcome.results.len(), 10);
}
