//! In-process collaborators for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use url::Url;

use researcher_shared::{
    Chunk, ChunkMetadata, CrawledPage, Embedder, PageScraper, ResearchError, Result, ScrapedPage,
    SearchResult, SiteCrawl, TextChunker, TextGenerator, WebSearch,
};

type Responder = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Generator answering every prompt through a closure, recording prompts.
pub struct ScriptedGenerator {
    respond: Responder,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(respond: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::new(|_| Err(ResearchError::Generation("model unavailable".into())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.respond)(prompt)
    }
}

/// Search returning canned results per query, or `default` for unknown queries.
#[derive(Default)]
pub struct FakeSearch {
    by_query: HashMap<String, Vec<SearchResult>>,
    default: Vec<SearchResult>,
    calls: Mutex<Vec<(String, u32, u32)>>,
}

impl FakeSearch {
    pub fn returning(results: Vec<SearchResult>) -> Self {
        Self {
            default: results,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.by_query.insert(query.to_string(), results);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(q, _, _)| q.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<(String, u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl WebSearch for FakeSearch {
    async fn search(&self, query: &str, num_results: u32, max_pages: u32) -> Vec<SearchResult> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), num_results, max_pages));
        self.by_query
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Scraper serving fixed page text by URL; unknown URLs scrape empty.
#[derive(Default)]
pub struct FakeScraper {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeScraper {
    pub fn with_page(mut self, url: &str, content: &str) -> Self {
        self.pages.insert(url.to_string(), content.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PageScraper for FakeScraper {
    async fn scrape(&self, url: &str) -> ScrapedPage {
        self.calls.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(content) => ScrapedPage::new(url, content.clone()),
            None => ScrapedPage::empty(url),
        }
    }
}

/// Crawler serving fixed page lists by start URL; unknown sites fail.
#[derive(Default)]
pub struct FakeCrawler {
    sites: HashMap<String, Vec<CrawledPage>>,
    calls: Mutex<Vec<(String, u32, usize)>>,
}

impl FakeCrawler {
    pub fn with_site(mut self, start_url: &str, pages: Vec<CrawledPage>) -> Self {
        self.sites.insert(start_url.to_string(), pages);
        self
    }

    pub fn calls(&self) -> Vec<(String, u32, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SiteCrawl for FakeCrawler {
    async fn crawl(
        &self,
        start_url: &Url,
        _query: &str,
        max_depth: u32,
        max_pages: usize,
    ) -> Result<Vec<CrawledPage>> {
        self.calls
            .lock()
            .unwrap()
            .push((start_url.to_string(), max_depth, max_pages));
        match self.sites.get(start_url.as_str()) {
            Some(pages) => Ok(pages.iter().take(max_pages).cloned().collect()),
            None => Err(ResearchError::Network(format!("{start_url}: connection refused"))),
        }
    }
}

/// One chunk per non-blank paragraph (blank-line separated).
pub struct ParagraphChunker;

impl TextChunker for ParagraphChunker {
    fn chunk_text(&self, content: &str, metadata: &ChunkMetadata) -> Vec<Chunk> {
        content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Chunk::new(p, metadata.clone()))
            .collect()
    }
}

/// Hashed bag-of-words embedder, so texts sharing words land close together.
#[derive(Default)]
pub struct HashEmbedder {
    pub fail: bool,
    pub drop_last: bool,
}

pub const EMBED_DIMS: usize = 64;

impl HashEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; EMBED_DIMS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .bytes()
                .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % EMBED_DIMS] += 1.0;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.fail {
            return Err(ResearchError::Embedding("embedding service down".into()));
        }
        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| Self::vector(t)).collect();
        if self.drop_last {
            vectors.pop();
        }
        Ok(vectors)
    }
}
