//! Breadth-first, bounded site crawler.
//!
//! The crawler starts from a given URL and walks same-host links in FIFO
//! order. Each page contributes its paragraph text; its links are ranked
//! against the research query and only the best [`LINKS_PER_PAGE`] are
//! enqueued one level deeper. Fetches are awaited one at a time.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use reqwest::Client;
use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use researcher_shared::{CrawledPage, ResearchError, Result, SiteCrawl};

use crate::extract::{build_client, paragraph_text, same_host_links};
use crate::ranker::rank_links;

/// Ranked links enqueued from each crawled page.
pub const LINKS_PER_PAGE: usize = 5;

// ---------------------------------------------------------------------------
// SiteCrawler
// ---------------------------------------------------------------------------

/// Depth- and page-count-bounded crawler over one site.
#[derive(Debug, Clone)]
pub struct SiteCrawler {
    client: Client,
}

impl SiteCrawler {
    /// Create a crawler whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    /// Create a crawler around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Crawl from `start_url`, prioritising links relevant to `query`.
    ///
    /// Returns at most `max_pages` pages, none deeper than `max_depth`, each
    /// URL at most once. Pages that fail to fetch are logged and skipped.
    #[instrument(skip_all, fields(start_url = %start_url, max_depth, max_pages))]
    pub async fn crawl(
        &self,
        start_url: &Url,
        query: &str,
        max_depth: u32,
        max_pages: usize,
    ) -> Result<Vec<CrawledPage>> {
        let host = start_url
            .host_str()
            .ok_or_else(|| ResearchError::validation(format!("URL has no host: {start_url}")))?
            .to_string();

        let mut queue: VecDeque<(Url, u32)> = VecDeque::from([(start_url.clone(), 0)]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut pages: Vec<CrawledPage> = Vec::new();
        let mut failures: usize = 0;

        if max_pages == 0 {
            return Ok(pages);
        }

        info!("starting crawl");

        while let Some((url, depth)) = queue.pop_front() {
            if depth > max_depth || !visited.insert(url.to_string()) {
                continue;
            }

            let body = match fetch_html(&self.client, &url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(%url, error = %e, "failed to crawl page, skipping");
                    failures += 1;
                    continue;
                }
            };

            // `Html` is not `Send`; keep it out of any await point.
            let (content, links) = {
                let doc = Html::parse_document(&body);
                (paragraph_text(&doc), same_host_links(&doc, &url, &host))
            };

            debug!(%url, depth, chars = content.len(), links = links.len(), "page crawled");
            pages.push(CrawledPage::new(url.as_str(), depth, content));

            if pages.len() >= max_pages {
                break;
            }

            for link in rank_links(&links, query, LINKS_PER_PAGE) {
                if visited.contains(&link) {
                    continue;
                }
                if let Ok(link_url) = Url::parse(&link) {
                    queue.push_back((link_url, depth + 1));
                }
            }
        }

        info!(pages = pages.len(), failures, "crawl completed");
        Ok(pages)
    }
}

impl SiteCrawl for SiteCrawler {
    async fn crawl(
        &self,
        start_url: &Url,
        query: &str,
        max_depth: u32,
        max_pages: usize,
    ) -> Result<Vec<CrawledPage>> {
        SiteCrawler::crawl(self, start_url, query, max_depth, max_pages).await
    }
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

/// Fetch a page body, treating any non-2xx status as a failure.
pub(crate) async fn fetch_html(client: &Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| ResearchError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResearchError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| ResearchError::Network(format!("{url}: body read failed: {e}")))
}

#[cfg(test)]
mod crawler_tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn crawler() -> SiteCrawler {
        SiteCrawler::new(Duration::from_secs(5)).unwrap()
    }

    async fn mount_page(server: &MockServer, at: &str, html: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(html.to_string()))
            .mount(server)
            .await;
    }

    fn page_urls(pages: &[CrawledPage]) -> Vec<String> {
        pages.iter().map(|p| p.url.clone()).collect()
    }

    #[tokio::test]
    async fn test_crawl_with_mock_server() {
        let server = MockServer::start().await;

        mount_page(
            &server,
            "/",
            r#"<html><body>
                <p>Welcome to page one.</p>
                <a href="/page2">Go to page 2</a>
                <a href="/page3">Go to page 3</a>
            </body></html>"#,
        )
        .await;
        mount_page(
            &server,
            "/page2",
            r#"<html><body><p>This is page two.</p><a href="/">Home</a></body></html>"#,
        )
        .await;
        mount_page(
            &server,
            "/page3",
            r#"<html><body><p>Final page.</p><a href="/page2">Back</a></body></html>"#,
        )
        .await;

        let start_url = Url::parse(&server.uri()).unwrap();
        let pages = crawler().crawl(&start_url, "page", 3, 10).await.unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].depth, 0);
        assert_eq!(pages[0].content, "Welcome to page one.");
        assert!(pages[1..].iter().all(|p| p.depth == 1));

        // Cycles back to visited pages are never re-emitted
        let urls = page_urls(&pages);
        let distinct: HashSet<&String> = urls.iter().collect();
        assert_eq!(distinct.len(), urls.len());
    }

    #[tokio::test]
    async fn test_crawl_respects_depth() {
        let server = MockServer::start().await;

        mount_page(&server, "/", r#"<p>Root</p><a href="/page2">Page 2</a>"#).await;
        mount_page(&server, "/page2", r#"<p>Page 2</p><a href="/page3">Page 3</a>"#).await;
        mount_page(&server, "/page3", r#"<p>Deep page</p>"#).await;

        let start_url = Url::parse(&server.uri()).unwrap();
        let pages = crawler().crawl(&start_url, "deep", 1, 10).await.unwrap();

        // Root (depth 0) and page2 (depth 1), but not page3 (depth 2)
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.depth <= 1));
        assert!(!pages.iter().any(|p| p.url.ends_with("/page3")));
    }

    #[tokio::test]
    async fn test_crawl_stops_at_max_pages() {
        let server = MockServer::start().await;

        mount_page(
            &server,
            "/",
            r#"<p>Root</p><a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#,
        )
        .await;
        for leaf in ["/a", "/b", "/c"] {
            mount_page(&server, leaf, "<p>Leaf</p>").await;
        }

        let start_url = Url::parse(&server.uri()).unwrap();
        let pages = crawler().crawl(&start_url, "leaf", 2, 2).await.unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[tokio::test]
    async fn test_crawl_zero_pages_fetches_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>x</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let start_url = Url::parse(&server.uri()).unwrap();
        let pages = crawler().crawl(&start_url, "x", 2, 0).await.unwrap();
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_crawl_single_page_without_links() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<p>Lonely page</p><a href="https://elsewhere.example.org/">Away</a>"#,
        )
        .await;

        let start_url = Url::parse(&server.uri()).unwrap();
        let pages = crawler().crawl(&start_url, "lonely", 2, 5).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].depth, 0);
        assert_eq!(pages[0].content, "Lonely page");
    }

    #[tokio::test]
    async fn test_crawl_skips_failed_pages() {
        let server = MockServer::start().await;

        mount_page(
            &server,
            "/",
            r#"<p>Root</p><a href="/missing">Missing</a><a href="/ok">Ok</a>"#,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_page(&server, "/ok", "<p>Still crawled</p>").await;

        let start_url = Url::parse(&server.uri()).unwrap();
        let pages = crawler().crawl(&start_url, "ok", 1, 10).await.unwrap();

        let urls = page_urls(&pages);
        assert_eq!(pages.len(), 2);
        assert!(urls.iter().any(|u| u.ends_with("/ok")));
        assert!(!urls.iter().any(|u| u.ends_with("/missing")));
    }

    #[tokio::test]
    async fn test_crawl_unreachable_start_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let start_url = Url::parse(&server.uri()).unwrap();
        let pages = crawler().crawl(&start_url, "x", 2, 5).await.unwrap();
        assert!(pages.is_empty());
    }
}
