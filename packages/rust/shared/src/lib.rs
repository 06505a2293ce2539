//! Shared types, error model, configuration, and collaborator traits for researcher.
//!
//! This crate is the foundation depended on by all other researcher crates.
//! It provides:
//! - [`ResearchError`]: the unified error type
//! - Domain records ([`SearchResult`], [`CrawledPage`], [`Chunk`], [`ScrapedSourceRecord`])
//! - Configuration ([`AppConfig`], [`ResearchConfig`], config loading)
//! - Collaborator traits ([`WebSearch`], [`PageScraper`], [`SiteCrawl`], [`TextChunker`],
//!   [`Embedder`], [`TextGenerator`])

pub mod config;
pub mod error;
pub mod ports;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkingConfig, DefaultsConfig, EmbeddingConfig, LlmConfig, ResearchConfig,
    SearchConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_api_key, validate_api_keys,
};
pub use error::{ResearchError, Result};
pub use ports::{Embedder, PageScraper, SiteCrawl, TextChunker, TextGenerator, WebSearch};
pub use types::{
    Chunk, ChunkMetadata, CrawledPage, ScrapedPage, ScrapedSourceRecord, SearchResult, SourceKind,
};
