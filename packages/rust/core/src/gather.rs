//! Search → (crawl | scrape) → chunk, accumulated under a global source cap.
//!
//! Each keyword cluster becomes one paginated search. Results pointing at a
//! site's homepage are crawled; everything else is scraped directly. All
//! text is chunked and gathered into one flat corpus alongside the list of
//! sources that contributed to it.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};
use url::Url;

use researcher_shared::{
    Chunk, ChunkMetadata, PageScraper, ResearchConfig, ScrapedSourceRecord, SearchResult,
    SiteCrawl, TextChunker, WebSearch,
};

use crate::pipeline::ResearchProgress;

/// Decides whether a search result URL should be crawled as a site homepage.
pub type HomepagePredicate = Box<dyn Fn(&Url) -> bool + Send + Sync>;

/// Default homepage rule: the path is empty, `/`, `/index.html` or `/home`.
pub fn is_homepage_path(url: &Url) -> bool {
    matches!(url.path(), "" | "/" | "/index.html" | "/home")
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Everything gathered for one research run, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Gathered {
    /// One record per distinct URL that contributed chunks.
    pub sources: Vec<ScrapedSourceRecord>,
    /// All chunks from all covered sources.
    pub chunks: Vec<Chunk>,
}

/// Outcome of offering one page to the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// The source cap was already reached.
    Full,
    /// The page produced no chunks.
    Empty,
    /// The URL is already covered by an earlier record.
    Duplicate,
}

/// Accumulates sources and chunks; the only place the source cap is enforced.
struct Corpus {
    max_links: usize,
    covered: HashSet<String>,
    gathered: Gathered,
}

impl Corpus {
    fn new(max_links: usize) -> Self {
        Self {
            max_links,
            covered: HashSet::new(),
            gathered: Gathered::default(),
        }
    }

    fn is_full(&self) -> bool {
        self.gathered.sources.len() >= self.max_links
    }

    fn admit(
        &mut self,
        record: ScrapedSourceRecord,
        chunks: Vec<Chunk>,
        progress: &dyn ResearchProgress,
    ) -> Admission {
        if self.is_full() {
            return Admission::Full;
        }
        if chunks.is_empty() {
            return Admission::Empty;
        }
        if !self.covered.insert(record.link.clone()) {
            return Admission::Duplicate;
        }

        self.gathered.chunks.extend(chunks);
        self.gathered.sources.push(record);
        if let Some(record) = self.gathered.sources.last() {
            progress.source_added(record, self.gathered.sources.len());
        }
        Admission::Admitted
    }
}

// ---------------------------------------------------------------------------
// SearchAndScrape
// ---------------------------------------------------------------------------

/// Turns keyword clusters into a chunked corpus using the given collaborators.
pub struct SearchAndScrape<'a, S, P, C, K> {
    search: &'a S,
    scraper: &'a P,
    crawler: &'a C,
    chunker: &'a K,
    limits: ResearchConfig,
    is_homepage: HomepagePredicate,
}

impl<'a, S, P, C, K> SearchAndScrape<'a, S, P, C, K>
where
    S: WebSearch,
    P: PageScraper,
    C: SiteCrawl,
    K: TextChunker,
{
    pub fn new(
        search: &'a S,
        scraper: &'a P,
        crawler: &'a C,
        chunker: &'a K,
        limits: ResearchConfig,
    ) -> Self {
        Self {
            search,
            scraper,
            crawler,
            chunker,
            limits,
            is_homepage: Box::new(is_homepage_path),
        }
    }

    /// Replace the homepage classifier.
    pub fn with_homepage_predicate(
        mut self,
        predicate: impl Fn(&Url) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_homepage = Box::new(predicate);
        self
    }

    /// Gather sources for each cluster in order until `max_links` sources
    /// are covered. `query` guides link ranking inside crawled sites.
    #[instrument(skip_all, fields(clusters = clusters.len(), max_links = self.limits.max_links))]
    pub async fn run(
        &self,
        clusters: &[Vec<String>],
        query: &str,
        progress: &dyn ResearchProgress,
    ) -> Gathered {
        let mut corpus = Corpus::new(self.limits.max_links);

        for cluster in clusters {
            if corpus.is_full() {
                break;
            }

            let search_query = cluster_query(cluster);
            if search_query.is_empty() {
                debug!("skipping blank keyword cluster");
                continue;
            }

            let results = self
                .search
                .search(
                    &search_query,
                    self.limits.results_per_page,
                    self.limits.search_pages,
                )
                .await;
            debug!(query = %search_query, results = results.len(), "cluster searched");

            for result in &results {
                if corpus.is_full() {
                    break;
                }

                let url = match Url::parse(&result.link) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!(link = %result.link, error = %e, "unparseable result URL, skipping");
                        continue;
                    }
                };

                if (self.is_homepage)(&url) {
                    self.gather_site(&url, result, query, &mut corpus, progress)
                        .await;
                } else {
                    self.gather_article(result, &mut corpus, progress).await;
                }
            }
        }

        info!(
            sources = corpus.gathered.sources.len(),
            chunks = corpus.gathered.chunks.len(),
            "gathering completed"
        );
        corpus.gathered
    }

    async fn gather_site(
        &self,
        homepage: &Url,
        result: &SearchResult,
        query: &str,
        corpus: &mut Corpus,
        progress: &dyn ResearchProgress,
    ) {
        let pages = match self
            .crawler
            .crawl(
                homepage,
                query,
                self.limits.crawl_depth,
                self.limits.crawl_pages,
            )
            .await
        {
            Ok(pages) => pages,
            Err(e) => {
                warn!(homepage = %result.link, error = %e, "failed to crawl site, skipping");
                return;
            }
        };

        for page in pages {
            if corpus.is_full() {
                break;
            }
            if page.content.trim().is_empty() {
                continue;
            }

            let metadata = ChunkMetadata::crawled(page.url.as_str(), &result.link);
            let chunks = self.chunker.chunk_text(&page.content, &metadata);
            let record = ScrapedSourceRecord::crawled(page.url.as_str(), result);
            let admission = corpus.admit(record, chunks, progress);
            debug!(url = %page.url, depth = page.depth, ?admission, "crawled page offered");
        }
    }

    async fn gather_article(
        &self,
        result: &SearchResult,
        corpus: &mut Corpus,
        progress: &dyn ResearchProgress,
    ) {
        let scraped = self.scraper.scrape(&result.link).await;
        if scraped.content.is_empty() {
            debug!(url = %result.link, "nothing scraped");
            return;
        }

        let metadata = ChunkMetadata::new(result.link.as_str(), result.title.as_str());
        let chunks = self.chunker.chunk_text(&scraped.content, &metadata);
        let admission = corpus.admit(ScrapedSourceRecord::scraped(result), chunks, progress);
        debug!(url = %result.link, page = result.page, ?admission, "article offered");
    }
}

/// Join a cluster's non-blank phrases into one search string.
fn cluster_query(cluster: &[String]) -> String {
    cluster
        .iter()
        .map(|phrase| phrase.trim())
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
