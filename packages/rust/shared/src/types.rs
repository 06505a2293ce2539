//! Core domain records for a research run.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SearchResult
// ---------------------------------------------------------------------------

/// One hit returned by the web search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title as reported by the search API.
    pub title: String,
    /// Target URL.
    pub link: String,
    /// Short excerpt shown by the search engine.
    pub snippet: String,
    /// 1-indexed paginated search page the result came from.
    pub page: u32,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        snippet: impl Into<String>,
        page: u32,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            snippet: snippet.into(),
            page,
        }
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// A page visited by the site crawler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawledPage {
    /// Absolute URL of the page.
    pub url: String,
    /// Distance from the crawl's start page (0 = start page).
    pub depth: u32,
    /// Extracted plain text.
    pub content: String,
}

impl CrawledPage {
    pub fn new(url: impl Into<String>, depth: u32, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth,
            content: content.into(),
        }
    }
}

/// Output of the scrape collaborator. `content` is empty on any failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub content: String,
}

impl ScrapedPage {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
        }
    }

    /// A scrape that produced nothing.
    pub fn empty(url: impl Into<String>) -> Self {
        Self::new(url, String::new())
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// Provenance attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// URL of the page the chunk was cut from.
    pub url: String,
    /// Result title, or `Crawled from {homepage}` for crawled pages.
    pub title: String,
}

impl ChunkMetadata {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    /// Metadata for a page reached by crawling from `homepage`.
    pub fn crawled(url: impl Into<String>, homepage: &str) -> Self {
        Self::new(url, crawled_title(homepage))
    }
}

/// A bounded slice of page text, the unit that gets embedded and retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

// ---------------------------------------------------------------------------
// Coverage accounting
// ---------------------------------------------------------------------------

/// How a covered source entered the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A search result scraped directly.
    Scraped,
    /// A page reached by crawling from a homepage result.
    Crawled,
}

/// Marks one distinct URL as having contributed chunks to the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedSourceRecord {
    pub title: String,
    pub link: String,
    /// Search page of the originating result.
    pub page: u32,
    pub kind: SourceKind,
}

impl ScrapedSourceRecord {
    /// Record for a directly scraped search result.
    pub fn scraped(result: &SearchResult) -> Self {
        Self {
            title: result.title.clone(),
            link: result.link.clone(),
            page: result.page,
            kind: SourceKind::Scraped,
        }
    }

    /// Record for a page crawled from the homepage `result`.
    pub fn crawled(page_url: impl Into<String>, result: &SearchResult) -> Self {
        Self {
            title: crawled_title(&result.link),
            link: page_url.into(),
            page: result.page,
            kind: SourceKind::Crawled,
        }
    }

    /// Whether the originating result came from beyond the first search page.
    pub fn is_deep_page(&self) -> bool {
        self.page > 1
    }
}

fn crawled_title(homepage: &str) -> String {
    format!("Crawled from {homepage}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawled_metadata_records_homepage() {
        let meta = ChunkMetadata::crawled("https://example.com/news", "https://example.com/");
        assert_eq!(meta.url, "https://example.com/news");
        assert_eq!(meta.title, "Crawled from https://example.com/");
    }

    #[test]
    fn crawled_record_keeps_origin_page() {
        let result = SearchResult::new("Home", "https://example.com/", "", 2);
        let record = ScrapedSourceRecord::crawled("https://example.com/a", &result);
        assert_eq!(record.title, "Crawled from https://example.com/");
        assert_eq!(record.link, "https://example.com/a");
        assert_eq!(record.kind, SourceKind::Crawled);
        assert!(record.is_deep_page());
    }

    #[test]
    fn source_record_serialization() {
        let result = SearchResult::new("Trade talks", "https://news.example.com/a", "s", 1);
        let record = ScrapedSourceRecord::scraped(&result);
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains(r#""kind":"scraped""#));
        let parsed: ScrapedSourceRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, record);
        assert!(!parsed.is_deep_page());
    }
}
