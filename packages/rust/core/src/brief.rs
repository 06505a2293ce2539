//! Quick brief: one search, per-article summaries, one synthesis.
//!
//! No crawling and no index. Cheaper than a full research run and useful
//! for a first look at a topic.

use std::fmt::Write as _;

use serde::Serialize;
use tracing::{info, instrument, warn};

use researcher_shared::{PageScraper, ResearchError, Result, TextGenerator, WebSearch};

use crate::pipeline::ResearchProgress;
use crate::query::analyze_query;

/// Summary recorded when the generator fails on an article.
pub const SUMMARY_FAILED: &str = "Summarization failed.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSummary {
    pub url: String,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Brief {
    pub query: String,
    /// Keywords actually searched.
    pub keywords: String,
    pub articles: Vec<ArticleSummary>,
    /// Markdown synthesis of all summaries.
    pub synthesis: String,
}

impl Brief {
    pub fn to_markdown(&self) -> String {
        let mut out = format!("{}\n\n## Article Summaries\n\n", self.synthesis);
        for (i, article) in self.articles.iter().enumerate() {
            let _ = writeln!(
                out,
                "### [Source {}] {}\n\n{}\n\n{}\n",
                i + 1,
                article.title,
                article.url,
                article.summary
            );
        }
        out
    }
}

pub fn build_summary_prompt(query: &str, content: &str) -> String {
    format!(
        r#"You're an AI research assistant. Read the article below and do 3 things:

1. Summarize it in 3-5 bullet points.
2. Label the type of content (e.g., 'news report', 'opinion article', 'government page').
3. Rate its relevance to the topic '{query}' (high/medium/low).

Article Content:
"""
{content}
""""#
    )
}

pub fn build_brief_prompt(query: &str, articles: &[ArticleSummary]) -> String {
    let mut combined = String::new();
    for (i, article) in articles.iter().enumerate() {
        let _ = write!(
            combined,
            "[Source {}] {}\nSummary:\n{}\n\n",
            i + 1,
            article.url,
            article.summary
        );
    }

    format!(
        r#"You are a senior research assistant. Your job is to synthesize findings from multiple article summaries related to the topic: "{query}".

Steps:
- Group common insights.
- Highlight contradictions.
- End with a single paragraph "Final Takeaway".

Here are the article summaries:
{combined}
Provide a response in Markdown format."#
    )
}

/// Produce a brief for `query` from the top `results` search hits.
///
/// Articles that scrape empty are skipped; a failed summary is kept as
/// [`SUMMARY_FAILED`]. Fails with `NoContent` when no article had text and
/// with `Generation` when the final synthesis fails.
#[instrument(skip_all, fields(query = %query, results))]
pub async fn run_brief<S, P, G>(
    query: &str,
    results: u32,
    search: &S,
    scraper: &P,
    generator: &G,
    progress: &dyn ResearchProgress,
) -> Result<Brief>
where
    S: WebSearch,
    P: PageScraper,
    G: TextGenerator,
{
    progress.phase("Analyzing query");
    let plan = analyze_query(query, generator).await;
    progress.plan_ready(&plan);

    progress.phase("Searching");
    let hits = search.search(&plan.keywords, results, 1).await;

    progress.phase("Summarizing articles");
    let mut articles = Vec::new();
    for hit in hits.iter().take(results as usize) {
        let scraped = scraper.scrape(&hit.link).await;
        if scraped.content.is_empty() {
            continue;
        }

        let summary = match generator
            .generate(&build_summary_prompt(query, &scraped.content))
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(url = %hit.link, error = %e, "summarization failed");
                SUMMARY_FAILED.to_string()
            }
        };

        articles.push(ArticleSummary {
            url: hit.link.clone(),
            title: hit.title.clone(),
            summary,
        });
    }

    if articles.is_empty() {
        return Err(ResearchError::no_content(query));
    }

    progress.phase("Synthesizing brief");
    let synthesis = generator
        .generate(&build_brief_prompt(query, &articles))
        .await
        .map_err(|e| match e {
            ResearchError::Generation(msg) => ResearchError::Generation(msg),
            other => ResearchError::Generation(other.to_string()),
        })?;

    info!(articles = articles.len(), "brief synthesized");
    Ok(Brief {
        query: query.to_string(),
        keywords: plan.keywords,
        articles,
        synthesis: synthesis.trim().to_string(),
    })
}
