//! Paginated web search via the Google Custom Search JSON API.
//!
//! Each requested page is one `GET {endpoint}?q&cx&key&num&start` call.
//! Results are tagged with the 1-indexed page they came from so later
//! stages can tell first-page hits from deeper ones.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use researcher_shared::{AppConfig, ResearchError, Result, SearchResult, WebSearch, resolve_api_key};

/// The API never returns more than this many items per page.
pub const MAX_RESULTS_PER_PAGE: u32 = 10;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("researcher/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

// ---------------------------------------------------------------------------
// GoogleSearch
// ---------------------------------------------------------------------------

/// Google Custom Search client.
#[derive(Debug, Clone)]
pub struct GoogleSearch {
    client: Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
}

impl GoogleSearch {
    /// Create a client for `endpoint` with the given credentials.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ResearchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        })
    }

    /// Create a client from the `[search]` config section, reading the
    /// credentials from the environment variables it names.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(&config.search.api_key_env)?;
        let engine_id = resolve_api_key(&config.search.engine_id_env)?;
        Self::new(
            config.search.endpoint.clone(),
            api_key,
            engine_id,
            config.defaults.request_timeout(),
        )
    }

    /// Fetch up to `max_pages` pages of `num_results` results for `query`.
    ///
    /// A page without items is skipped; a failed request ends pagination
    /// and whatever was gathered so far is returned.
    #[instrument(skip_all, fields(query = %query, num_results, max_pages))]
    pub async fn search(&self, query: &str, num_results: u32, max_pages: u32) -> Vec<SearchResult> {
        let num = num_results.clamp(1, MAX_RESULTS_PER_PAGE);
        let mut results: Vec<SearchResult> = Vec::new();

        for page_index in 0..max_pages {
            let page = page_index + 1;
            let start = page_index * num + 1;

            let items = match self.fetch_page(query, num, start).await {
                Ok(Some(items)) => items,
                Ok(None) => {
                    warn!(page, "no results on search page");
                    continue;
                }
                Err(e) => {
                    error!(page, error = %e, "search failed");
                    break;
                }
            };

            let before = results.len();
            for item in items {
                let Some(link) = item.link else {
                    debug!(page, "search item without link, skipping");
                    continue;
                };
                results.push(SearchResult::new(
                    item.title.unwrap_or_default(),
                    link,
                    item.snippet.unwrap_or_default(),
                    page,
                ));
            }
            debug!(page, added = results.len() - before, "search page fetched");
        }

        info!(results = results.len(), "search completed");
        results
    }

    async fn fetch_page(&self, query: &str, num: u32, start: u32) -> Result<Option<Vec<SearchItem>>> {
        let num = num.to_string();
        let start = start.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("cx", self.engine_id.as_str()),
                ("key", self.api_key.as_str()),
                ("num", num.as_str()),
                ("start", start.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ResearchError::Network(format!("search request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::Network(format!("search request: HTTP {status}")));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::parse(format!("search response: {e}")))?;

        Ok(body.items)
    }
}

impl WebSearch for GoogleSearch {
    async fn search(&self, query: &str, num_results: u32, max_pages: u32) -> Vec<SearchResult> {
        GoogleSearch::search(self, query, num_results, max_pages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleSearch {
        GoogleSearch::new(
            format!("{}/customsearch/v1", server.uri()),
            "test-key",
            "test-cx",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn items(prefix: &str, count: usize) -> serde_json::Value {
        let items: Vec<serde_json::Value> = (0..count)
            .map(|i| {
                serde_json::json!({
                    "title": format!("{prefix} {i}"),
                    "link": format!("https://news.example.com/{prefix}-{i}"),
                    "snippet": format!("snippet {i}"),
                })
            })
            .collect();
        serde_json::json!({ "items": items })
    }

    #[tokio::test]
    async fn test_search_tags_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("q", "india us trade deal"))
            .and(query_param("cx", "test-cx"))
            .and(query_param("key", "test-key"))
            .and(query_param("num", "2"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items("first", 2)))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("start", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items("second", 2)))
            .mount(&server)
            .await;

        let results = client(&server).search("india us trade deal", 2, 2).await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].title, "first 0");
        assert_eq!(results[0].link, "https://news.example.com/first-0");
        assert_eq!(results[0].snippet, "snippet 0");
        assert_eq!(results[0].page, 1);
        assert_eq!(results[1].page, 1);
        assert_eq!(results[2].title, "second 0");
        assert_eq!(results[2].page, 2);
        assert_eq!(results[3].page, 2);
    }

    #[tokio::test]
    async fn test_search_missing_items_continues() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("start", "11"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items("late", 1)))
            .mount(&server)
            .await;

        let results = client(&server).search("trade", 10, 2).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].page, 2);
    }

    #[tokio::test]
    async fn test_search_error_stops_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items("kept", 3)))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("start", "4"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("start", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items("never", 3)))
            .expect(0)
            .mount(&server)
            .await;

        let results = client(&server).search("trade", 3, 3).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.page == 1));
    }

    #[tokio::test]
    async fn test_search_total_failure_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let results = client(&server).search("trade", 10, 3).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_caps_results_per_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("num", "10"))
            .and(query_param("start", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items("capped", 10)))
            .expect(1)
            .mount(&server)
            .await;

        let results = client(&server).search("trade", 50, 1).await;
        assert_eq!(results.len(), 10);
    }

    #[test]
    fn test_from_config_requires_keys() {
        let mut config = AppConfig::default();
        config.search.api_key_env = "RS_TEST_MISSING_SEARCH_KEY_2".into();
        let err = GoogleSearch::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("RS_TEST_MISSING_SEARCH_KEY_2"));
    }
}
