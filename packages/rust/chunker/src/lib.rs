//! Recursive character text splitting.
//!
//! Page text is cut on the coarsest separator that occurs in it (paragraph
//! break, line break, sentence punctuation, space, then single characters),
//! and the pieces are merged back into chunks of at most `chunk_size`
//! characters, each sharing up to `chunk_overlap` characters with the
//! previous one.

mod splitter;

use researcher_shared::{Chunk, ChunkMetadata, ChunkingConfig, Result, TextChunker};
use tracing::debug;

pub use splitter::DEFAULT_SEPARATORS;

/// Splits text into overlapping, size-bounded chunks.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// Create a splitter with the default separator hierarchy.
    ///
    /// Fails when `chunk_overlap` does not leave room for new text.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        ChunkingConfig {
            chunk_size,
            chunk_overlap,
        }
        .validate()?;

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Create a splitter from the `[chunking]` config section.
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split `text` into trimmed, non-empty chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        splitter::split_recursive(text, &self.separators, self.chunk_size, self.chunk_overlap)
    }
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        let defaults = ChunkingConfig::default();
        Self {
            chunk_size: defaults.chunk_size,
            chunk_overlap: defaults.chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TextChunker for RecursiveSplitter {
    fn chunk_text(&self, content: &str, metadata: &ChunkMetadata) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self
            .split_text(content)
            .into_iter()
            .map(|text| Chunk::new(text, metadata.clone()))
            .collect();

        debug!(url = %metadata.url, chunks = chunks.len(), "text chunked");
        chunks
    }
}
