//! Collaborator traits the research pipeline is written against.
//!
//! Search, scrape, crawl, embed and generate all cross the network, so they
//! return futures; chunking is pure and stays synchronous. The pipeline uses
//! these through generics, and tests swap in in-process fakes.

use std::future::Future;

use url::Url;

use crate::error::Result;
use crate::types::{Chunk, ChunkMetadata, CrawledPage, ScrapedPage, SearchResult};

/// Paginated web search.
///
/// Never fails past its boundary: a total failure is an empty list.
pub trait WebSearch: Send + Sync {
    fn search(
        &self,
        query: &str,
        num_results: u32,
        max_pages: u32,
    ) -> impl Future<Output = Vec<SearchResult>> + Send;
}

/// Single-page text extraction. Failures yield empty content.
pub trait PageScraper: Send + Sync {
    fn scrape(&self, url: &str) -> impl Future<Output = ScrapedPage> + Send;
}

/// Bounded crawl of one site's internal links.
pub trait SiteCrawl: Send + Sync {
    fn crawl(
        &self,
        start_url: &Url,
        query: &str,
        max_depth: u32,
        max_pages: usize,
    ) -> impl Future<Output = Result<Vec<CrawledPage>>> + Send;
}

/// Splits page text into chunks carrying `metadata`. Failures yield no chunks.
pub trait TextChunker: Send + Sync {
    fn chunk_text(&self, content: &str, metadata: &ChunkMetadata) -> Vec<Chunk>;
}

/// Maps texts to embedding vectors, one per input, in input order.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;
}

/// Prompt in, plain text out. No structure is guaranteed in the response.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}
