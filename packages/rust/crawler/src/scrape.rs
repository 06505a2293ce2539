//! One-shot article scraping.

use std::time::Duration;

use reqwest::Client;
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

use researcher_shared::{PageScraper, Result, ScrapedPage};

use crate::engine::fetch_html;
use crate::extract::{build_client, paragraph_text};

/// Fetches one page and keeps its paragraph text, clipped to `max_chars`.
///
/// Never fails: any request, status or URL error yields empty content.
#[derive(Debug, Clone)]
pub struct HttpScraper {
    client: Client,
    max_chars: usize,
}

impl HttpScraper {
    pub fn new(timeout: Duration, max_chars: usize) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            max_chars,
        })
    }

    pub fn with_client(client: Client, max_chars: usize) -> Self {
        Self { client, max_chars }
    }

    pub async fn scrape(&self, url: &str) -> ScrapedPage {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(url, error = %e, "invalid URL, nothing scraped");
                return ScrapedPage::empty(url);
            }
        };

        match fetch_html(&self.client, &parsed).await {
            Ok(body) => {
                let text = paragraph_text(&Html::parse_document(&body));
                let content = truncate_chars(&text, self.max_chars);
                debug!(url, chars = content.chars().count(), "page scraped");
                ScrapedPage::new(url, content)
            }
            Err(e) => {
                warn!(url, error = %e, "failed to scrape page");
                ScrapedPage::empty(url)
            }
        }
    }
}

impl PageScraper for HttpScraper {
    async fn scrape(&self, url: &str) -> ScrapedPage {
        HttpScraper::scrape(self, url).await
    }
}

/// Clip `text` to at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
