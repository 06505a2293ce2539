//! In-memory nearest-neighbour index over embedded chunks.
//!
//! Rebuilt from scratch for every run; nothing is persisted.

use tracing::{debug, info, instrument};

use researcher_shared::{Chunk, Embedder, ResearchError, Result};

/// A chunk with its embedding.
#[derive(Debug, Clone)]
struct IndexedChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Cosine-similarity index over a fixed set of chunks.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Embed every chunk and index the results.
    ///
    /// Fails on an empty corpus, an embedding failure, or when the embedder
    /// returns a different number of vectors than chunks.
    #[instrument(skip_all, fields(chunks = chunks.len()))]
    pub async fn build<E: Embedder>(embedder: &E, chunks: Vec<Chunk>) -> Result<Self> {
        if chunks.is_empty() {
            return Err(ResearchError::Index(
                "cannot build an index from an empty corpus".into(),
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(ResearchError::Index(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let entries: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedChunk { chunk, vector })
            .collect();

        info!(entries = entries.len(), "index built");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embed `query` and return the `k` most similar chunks, best first.
    #[instrument(skip_all, fields(k))]
    pub async fn retrieve<E: Embedder>(&self, embedder: &E, query: &str, k: usize) -> Result<Vec<Chunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ResearchError::Embedding("no vector returned for query".into()))?;

        let hits: Vec<Chunk> = self
            .nearest(&query_vector, k)
            .into_iter()
            .map(|(chunk, _)| chunk.clone())
            .collect();

        debug!(hits = hits.len(), "chunks retrieved");
        Ok(hits)
    }

    /// The `k` entries most similar to `vector`; ties keep insertion order.
    pub fn nearest(&self, vector: &[f32], k: usize) -> Vec<(&Chunk, f32)> {
        let mut scored: Vec<(&Chunk, f32)> = self
            .entries
            .iter()
            .map(|entry| (&entry.chunk, cosine_similarity(vector, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HashEmbedder;
    use researcher_shared::ChunkMetadata;

    fn chunk(url: &str, content: &str) -> Chunk {
        Chunk::new(content, ChunkMetadata::new(url, "t"))
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk("https://a.example.com", "cricket world cup final score"),
            chunk("https://b.example.com", "india us trade deal tariffs agreement"),
            chunk("https://c.example.com", "weather forecast rain tomorrow"),
            chunk("https://d.example.com", "trade deal negotiations india"),
        ]
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_retrieve_most_similar_first() {
        let embedder = HashEmbedder::default();
        let index = VectorIndex::build(&embedder, corpus()).await.unwrap();
        assert_eq!(index.len(), 4);

        let hits = index
            .retrieve(&embedder, "india us trade deal", 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.url, "https://b.example.com");
        assert_eq!(hits[1].metadata.url, "https://d.example.com");
    }

    #[tokio::test]
    async fn test_retrieve_k_larger_than_index() {
        let embedder = HashEmbedder::default();
        let index = VectorIndex::build(&embedder, corpus()).await.unwrap();
        let hits = index.retrieve(&embedder, "anything", 10).await.unwrap();
        assert_eq!(hits.len(), 4);
        assert!(index.retrieve(&embedder, "anything", 0).await.unwrap().is_empty());
    }

    #[test]
    fn test_nearest_ties_keep_insertion_order() {
        let index = VectorIndex {
            entries: vec![
                IndexedChunk { chunk: chunk("1", "a"), vector: vec![1.0, 0.0] },
                IndexedChunk { chunk: chunk("2", "b"), vector: vec![0.0, 1.0] },
                IndexedChunk { chunk: chunk("3", "c"), vector: vec![2.0, 0.0] },
            ],
        };
        let hits = index.nearest(&[1.0, 0.0], 3);
        let urls: Vec<&str> = hits.iter().map(|(c, _)| c.metadata.url.as_str()).collect();
        assert_eq!(urls, vec!["1", "3", "2"]);
    }

    #[tokio::test]
    async fn test_build_failures() {
        let embedder = HashEmbedder::default();
        let err = VectorIndex::build(&embedder, Vec::new()).await.unwrap_err();
        assert!(matches!(err, ResearchError::Index(_)));

        let failing = HashEmbedder { fail: true, ..Default::default() };
        let err = VectorIndex::build(&failing, corpus()).await.unwrap_err();
        assert!(matches!(err, ResearchError::Embedding(_)));

        let short = HashEmbedder { drop_last: true, ..Default::default() };
        let err = VectorIndex::build(&short, corpus()).await.unwrap_err();
        assert!(matches!(err, ResearchError::Index(_)));
    }
}
