//! Report synthesis and rendering.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use researcher_shared::{ResearchError, Result, ScrapedSourceRecord, TextGenerator};

use crate::selection::Selection;

/// Coarse relevance bucket shown in the ranking table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    High,
    Medium,
    Low,
}

impl Rating {
    pub fn from_score(score: u8) -> Self {
        match score {
            4.. => Self::High,
            3 => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// One row of the document relevance ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevanceRow {
    /// `Source N` when the document was cited, `-` otherwise.
    pub label: String,
    pub rating: Rating,
    pub score: u8,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub label: String,
    pub url: String,
}

/// The finished research answer with its provenance tables.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchReport {
    pub query: String,
    /// Markdown answer from the generator.
    pub answer: String,
    /// Whether any source came from beyond the first search page.
    pub includes_deep_pages: bool,
    pub relevance: Vec<RelevanceRow>,
    pub citations: Vec<Citation>,
    pub sources: Vec<ScrapedSourceRecord>,
    pub generated_at: DateTime<Utc>,
}

/// Report-synthesis prompt over the labelled `context`.
pub fn build_report_prompt(query: &str, context: &str) -> String {
    format!(
        r#"You are a senior research analyst generating professional and comprehensive reports.

Write a well-structured report answering the user's query using only the source documents below.

Formatting rules:
- Use Markdown headings to organise the report.
- Present pricing, comparisons and other structured data as Markdown tables.
- Cite sources inline as [Source N] after every claim drawn from them.
- Prefer bullet points for lists of findings.
- Draw on at least 3 different sources when that many are available.
- Finish with a "Source Coverage" section stating which sources were used and for what.

### SOURCE DOCUMENTS:
{context}
---
### USER QUERY:
"""{query}"""

Please begin."#
    )
}

/// Generate the report for `query` from an assembled selection.
///
/// A generation failure is fatal for the run.
#[instrument(skip_all, fields(query = %query, selected = selection.selected.len()))]
pub async fn synthesize_report<G: TextGenerator>(
    query: &str,
    selection: &Selection,
    sources: &[ScrapedSourceRecord],
    generator: &G,
) -> Result<ResearchReport> {
    let answer = generator
        .generate(&build_report_prompt(query, &selection.context))
        .await
        .map_err(|e| match e {
            ResearchError::Generation(msg) => ResearchError::Generation(msg),
            other => ResearchError::Generation(other.to_string()),
        })?;

    let relevance = selection
        .scored
        .iter()
        .map(|candidate| RelevanceRow {
            label: selection
                .labels
                .get(&candidate.url)
                .unwrap_or("-")
                .to_string(),
            rating: Rating::from_score(candidate.score),
            score: candidate.score,
            url: candidate.url.clone(),
        })
        .collect();

    let citations = selection
        .labels
        .iter()
        .map(|(url, label)| Citation {
            label: label.to_string(),
            url: url.to_string(),
        })
        .collect();

    let report = ResearchReport {
        query: query.to_string(),
        answer: answer.trim().to_string(),
        includes_deep_pages: sources.iter().any(ScrapedSourceRecord::is_deep_page),
        relevance,
        citations,
        sources: sources.to_vec(),
        generated_at: Utc::now(),
    };

    info!(citations = report.citations.len(), "report synthesized");
    Ok(report)
}

impl ResearchReport {
    /// Render the answer followed by the ranking and citation tables.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "{}\n", self.answer);

        if self.includes_deep_pages {
            out.push_str(
                "> **Note:** some sources came from beyond the first page of search results \
                 and may be less authoritative.\n\n",
            );
        }

        out.push_str("## Document Relevance Ranking\n\n");
        if self.relevance.is_empty() {
            out.push_str("No documents were ranked.\n\n");
        } else {
            out.push_str("| Source | Relevance | Score | URL |\n");
            out.push_str("|---|---|---|---|\n");
            for row in &self.relevance {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    row.label,
                    row.rating.as_str(),
                    row.score,
                    row.url
                );
            }
            out.push('\n');
        }

        out.push_str("## Source Citations\n\n");
        if self.citations.is_empty() {
            out.push_str("No sources available.\n");
        } else {
            for citation in &self.citations {
                let _ = writeln!(out, "- **{}**: {}", citation.label, citation.url);
            }
        }

        out
    }
}
