//! End-to-end research run: query → plan → gather → index → select → report.

use std::time::Instant;

use tracing::{info, instrument};

use researcher_shared::{
    Embedder, PageScraper, ResearchConfig, ResearchError, Result, ScrapedSourceRecord, SiteCrawl,
    TextChunker, TextGenerator, WebSearch,
};

use crate::gather::SearchAndScrape;
use crate::index::VectorIndex;
use crate::query::{QueryPlan, analyze_query};
use crate::report::{ResearchReport, synthesize_report};
use crate::selection::select;

/// Progress callback for reporting pipeline status.
pub trait ResearchProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the query has been decomposed.
    fn plan_ready(&self, plan: &QueryPlan);
    /// Called when a source is admitted to the corpus; `count` includes it.
    fn source_added(&self, record: &ScrapedSourceRecord, count: usize);
    /// Called when the report is ready.
    fn done(&self, report: &ResearchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ResearchProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn plan_ready(&self, _plan: &QueryPlan) {}
    fn source_added(&self, _record: &ScrapedSourceRecord, _count: usize) {}
    fn done(&self, _report: &ResearchReport) {}
}

/// The full research pipeline over a set of collaborators.
pub struct Researcher<'a, S, P, C, K, E, G> {
    pub search: &'a S,
    pub scraper: &'a P,
    pub crawler: &'a C,
    pub chunker: &'a K,
    pub embedder: &'a E,
    pub generator: &'a G,
}

impl<S, P, C, K, E, G> Researcher<'_, S, P, C, K, E, G>
where
    S: WebSearch,
    P: PageScraper,
    C: SiteCrawl,
    K: TextChunker,
    E: Embedder,
    G: TextGenerator,
{
    /// Run the full pipeline for `query`.
    ///
    /// 1. Decompose the query into keyword clusters
    /// 2. Search, crawl and scrape into a chunked corpus
    /// 3. Embed and index the corpus
    /// 4. Retrieve, score and diversify candidates
    /// 5. Synthesize the cited report
    ///
    /// Fails with `NoContent` when nothing was gathered, and with the
    /// collaborator's error when indexing or report generation fails.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn run(
        &self,
        query: &str,
        limits: &ResearchConfig,
        progress: &dyn ResearchProgress,
    ) -> Result<ResearchReport> {
        let start = Instant::now();
        limits.validate()?;
        if query.trim().is_empty() {
            return Err(ResearchError::validation("query must not be empty"));
        }

        info!(max_links = limits.max_links, "starting research");

        // --- Phase 1: Query analysis ---
        progress.phase("Analyzing query");
        let plan = analyze_query(query, self.generator).await;
        progress.plan_ready(&plan);

        // --- Phase 2: Search, crawl and scrape ---
        progress.phase("Searching and scraping");
        let gathered = SearchAndScrape::new(
            self.search,
            self.scraper,
            self.crawler,
            self.chunker,
            limits.clone(),
        )
        .run(&plan.keyword_clusters, query, progress)
        .await;

        if gathered.chunks.is_empty() {
            return Err(ResearchError::no_content(query));
        }

        // --- Phase 3: Index ---
        progress.phase("Indexing content");
        let index = VectorIndex::build(self.embedder, gathered.chunks).await?;

        // --- Phase 4: Retrieve and select ---
        progress.phase("Ranking documents");
        let candidates = index
            .retrieve(self.embedder, query, limits.retrieve_k)
            .await?;
        let selection = select(candidates, query, &gathered.sources, self.generator).await;

        // --- Phase 5: Report ---
        progress.phase("Synthesizing report");
        let report =
            synthesize_report(query, &selection, &gathered.sources, self.generator).await?;

        info!(
            sources = report.sources.len(),
            citations = report.citations.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "research completed"
        );
        progress.done(&report);
        Ok(report)
    }
}
