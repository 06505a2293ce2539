//! Answer assembly: score retrieved chunks, keep the best chunk per source,
//! and label the survivors for citation.
//!
//! The number of distinct sources kept is tied to how many sources were
//! gathered (`ceil(0.7 × n)`, at least one), so one over-represented site
//! cannot crowd out the rest.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use researcher_shared::{Chunk, ScrapedSourceRecord, TextGenerator};

/// Score used when the generator fails or answers without a number.
pub const NEUTRAL_SCORE: u8 = 3;

/// Characters of chunk text shown to the relevance scorer.
pub const SNIPPET_CHARS: usize = 500;

/// Group key for chunks that carry no URL.
pub const NO_URL: &str = "No URL";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A retrieved chunk with its coarse relevance score (1–5).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    /// Source URL, or [`NO_URL`].
    pub url: String,
    pub score: u8,
}

impl ScoredCandidate {
    pub fn new(chunk: Chunk, score: u8) -> Self {
        let url = if chunk.metadata.url.trim().is_empty() {
            NO_URL.to_string()
        } else {
            chunk.metadata.url.clone()
        };
        Self { chunk, url, score }
    }
}

/// `Source N` labels in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceLabels {
    entries: Vec<(String, String)>,
}

impl SourceLabels {
    /// Label for `url`, assigning the next `Source N` if it is new.
    pub fn assign(&mut self, url: &str) -> String {
        if let Some(label) = self.get(url) {
            return label.to_string();
        }
        let label = format!("Source {}", self.entries.len() + 1);
        self.entries.push((url.to_string(), label.clone()));
        label
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, label)| label.as_str())
    }

    /// `(url, label)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(u, l)| (u.as_str(), l.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of answer assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    /// Labelled source text handed to the report generator.
    pub context: String,
    /// One candidate per selected source, in selection order.
    pub selected: Vec<ScoredCandidate>,
    pub labels: SourceLabels,
    /// Every scored candidate, best first.
    pub scored: Vec<ScoredCandidate>,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Relevance-scoring prompt for one snippet.
pub fn build_score_prompt(query: &str, snippet: &str) -> String {
    format!(
        r#"You are a relevance evaluator assistant.

Given the user's query and a document snippet, score how relevant this document is (1 to 5 scale):

User Query:
"""{query}"""

Document Snippet:
"""{snippet}"""

Return a single number (1-5):"#
    )
}

/// First run of ASCII digits in `text`, clamped to 1–5.
pub fn parse_score(text: &str) -> Option<u8> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some(value.clamp(1, 5) as u8)
}

/// Score every candidate against `query`, one generator call each, and sort
/// best first. Ties keep retrieval order. Failures score [`NEUTRAL_SCORE`].
#[instrument(skip_all, fields(candidates = candidates.len()))]
pub async fn score_candidates<G: TextGenerator>(
    candidates: Vec<Chunk>,
    query: &str,
    generator: &G,
) -> Vec<ScoredCandidate> {
    let mut scored = Vec::with_capacity(candidates.len());

    for chunk in candidates {
        let snippet: String = chunk.content.chars().take(SNIPPET_CHARS).collect();
        let score = match generator.generate(&build_score_prompt(query, &snippet)).await {
            Ok(answer) => parse_score(&answer).unwrap_or_else(|| {
                warn!(url = %chunk.metadata.url, "no score in response, using neutral");
                NEUTRAL_SCORE
            }),
            Err(e) => {
                warn!(url = %chunk.metadata.url, error = %e, "scoring failed, using neutral");
                NEUTRAL_SCORE
            }
        };
        debug!(url = %chunk.metadata.url, score, "candidate scored");
        scored.push(ScoredCandidate::new(chunk, score));
    }

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

// ---------------------------------------------------------------------------
// Diversification
// ---------------------------------------------------------------------------

/// Distinct sources to keep for `source_count` gathered sources.
pub fn min_required(source_count: usize) -> usize {
    // ceil(0.7 × n) in integer arithmetic
    ((source_count * 7).div_ceil(10)).max(1)
}

/// Best candidate of each source, sources ordered by their best score,
/// stopping after `min_required` sources. Expects `scored` best first.
pub fn diversify(scored: &[ScoredCandidate], min_required: usize) -> Vec<ScoredCandidate> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut picked = Vec::new();

    for candidate in scored {
        if picked.len() >= min_required {
            break;
        }
        if seen.insert(candidate.url.as_str()) {
            picked.push(candidate.clone());
        }
    }

    picked
}

/// Diversify an already-scored list and build the labelled context.
pub fn assemble(scored: Vec<ScoredCandidate>, min_required: usize) -> Selection {
    let selected = diversify(&scored, min_required);
    let mut labels = SourceLabels::default();
    let mut context = String::new();

    for candidate in &selected {
        let label = labels.assign(&candidate.url);
        context.push_str(&format!(
            "[{label}] ({}):\n{}\n\n",
            candidate.url, candidate.chunk.content
        ));
    }

    Selection {
        context,
        selected,
        labels,
        scored,
    }
}

/// Score, diversify and label `candidates` for a report on `query`.
pub async fn select<G: TextGenerator>(
    candidates: Vec<Chunk>,
    query: &str,
    sources: &[ScrapedSourceRecord],
    generator: &G,
) -> Selection {
    let scored = score_candidates(candidates, query, generator).await;
    let quota = min_required(sources.len());
    let selection = assemble(scored, quota);
    debug!(
        quota,
        selected = selection.selected.len(),
        "sources selected"
    );
    selection
}
