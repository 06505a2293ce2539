//! HTML text and link extraction, plus the shared HTTP client builder.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use researcher_shared::{ResearchError, Result};

/// User-Agent string for crawl and scrape requests.
pub const USER_AGENT: &str = concat!("researcher/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

static PARAGRAPH_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("paragraph selector"));

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector"));

/// Build a reqwest client with the researcher user agent and `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .build()
        .map_err(|e| ResearchError::Network(format!("failed to build HTTP client: {e}")))
}

/// Plain text of every non-blank `<p>` element, one paragraph per line.
pub fn paragraph_text(doc: &Html) -> String {
    let paragraphs: Vec<String> = doc
        .select(&PARAGRAPH_SEL)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    paragraphs.join("\n").trim().to_string()
}

/// Links on the page that resolve to `host`, in first-seen order, without duplicates.
///
/// Anchor-only, `javascript:` and `mailto:` hrefs are skipped, fragments are
/// stripped, and only `http`/`https` targets are kept.
pub fn same_host_links(doc: &Html, base_url: &Url, host: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();

    for el in doc.select(&LINK_SEL) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }

        let Ok(mut resolved) = base_url.join(href) else {
            continue;
        };
        resolved.set_fragment(None);

        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        if resolved.host_str() != Some(host) {
            continue;
        }

        let resolved = resolved.to_string();
        if !links.contains(&resolved) {
            links.push(resolved);
        }
    }

    links
}
