//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use researcher_chunker::RecursiveSplitter;
use researcher_core::{Brief, QueryPlan, ResearchProgress, ResearchReport, Researcher, run_brief};
use researcher_crawler::{HttpScraper, SiteCrawler};
use researcher_llm::{ChatClient, EmbeddingClient};
use researcher_search::GoogleSearch;
use researcher_shared::{
    AppConfig, ResearchConfig, ResearchError, ScrapedSourceRecord, SourceKind, init_config,
    load_config, validate_api_keys,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// researcher: cited research reports from the open web.
#[derive(Parser)]
#[command(
    name = "researcher",
    version,
    about = "Search, crawl and scrape the web, then synthesize a cited research report.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full research pipeline and print a cited report.
    Research {
        /// The research question.
        query: String,

        #[command(flatten)]
        limits: LimitArgs,

        /// Write the report to this file as well as stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Emit the report as JSON instead of Markdown.
        #[arg(long)]
        json: bool,
    },

    /// Summarize the top search results into a short brief (no crawling).
    Brief {
        /// The research topic.
        query: String,

        /// Number of search results to summarize.
        #[arg(long, default_value_t = 3)]
        results: u32,
    },

    /// Crawl a single site and list the pages visited.
    Crawl {
        /// Start URL.
        url: String,

        /// Query used to prioritize links.
        #[arg(short, long)]
        query: String,

        /// Maximum link depth below the start page.
        #[arg(long)]
        depth: Option<u32>,

        /// Maximum number of pages to fetch.
        #[arg(long)]
        pages: Option<usize>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for the `[defaults]` limits.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct LimitArgs {
    /// Maximum number of sources to gather.
    #[arg(long)]
    pub max_links: Option<usize>,

    /// Crawl depth below a homepage result.
    #[arg(long)]
    pub crawl_depth: Option<u32>,

    /// Pages crawled per homepage result.
    #[arg(long)]
    pub crawl_pages: Option<usize>,

    /// Search result pages per keyword cluster.
    #[arg(long)]
    pub search_pages: Option<u32>,

    /// Chunks retrieved from the index for ranking.
    #[arg(long)]
    pub top_k: Option<usize>,
}

impl LimitArgs {
    fn apply(&self, config: &AppConfig) -> ResearchConfig {
        let mut limits = ResearchConfig::from(config);
        if let Some(v) = self.max_links {
            limits.max_links = v;
        }
        if let Some(v) = self.crawl_depth {
            limits.crawl_depth = v;
        }
        if let Some(v) = self.crawl_pages {
            limits.crawl_pages = v;
        }
        if let Some(v) = self.search_pages {
            limits.search_pages = v;
        }
        if let Some(v) = self.top_k {
            limits.retrieve_k = v;
        }
        limits
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "researcher=info",
        1 => "researcher=debug",
        _ => "researcher=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Research {
            query,
            limits,
            out,
            json,
        } => cmd_research(&query, &limits, out, json).await,
        Command::Brief { query, results } => cmd_brief(&query, results).await,
        Command::Crawl {
            url,
            query,
            depth,
            pages,
        } => cmd_crawl(&url, &query, depth, pages).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_research(
    query: &str,
    limit_args: &LimitArgs,
    out: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    // Validate credentials before doing anything
    let config = load_config()?;
    validate_api_keys(&config)?;
    let limits = limit_args.apply(&config);

    let timeout = config.defaults.request_timeout();
    let search = GoogleSearch::from_config(&config)?;
    let scraper = HttpScraper::new(timeout, config.defaults.scrape_max_chars)?;
    let crawler = SiteCrawler::new(timeout)?;
    let chunker = RecursiveSplitter::from_config(&config.chunking)?;
    let embedder = EmbeddingClient::from_config(&config)?;
    let generator = ChatClient::from_config(&config)?;

    info!(query, model = generator.model(), "starting research");

    let researcher = Researcher {
        search: &search,
        scraper: &scraper,
        crawler: &crawler,
        chunker: &chunker,
        embedder: &embedder,
        generator: &generator,
    };

    let reporter = CliProgress::new();
    let report = match researcher.run(query, &limits, &reporter).await {
        Ok(report) => report,
        Err(ResearchError::NoContent { .. }) => {
            reporter.finish();
            println!("No content could be gathered for \"{query}\". Try rephrasing the question or raising --max-links.");
            return Ok(());
        }
        Err(e) => {
            reporter.finish();
            return Err(e.into());
        }
    };

    let rendered = if json {
        serde_json::to_string_pretty(&report)?
    } else {
        report.to_markdown()
    };

    println!("{rendered}");
    if !json {
        print_sources(&report.sources);
    }

    if let Some(path) = out {
        std::fs::write(&path, &rendered)
            .wrap_err_with(|| format!("failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

async fn cmd_brief(query: &str, results: u32) -> Result<()> {
    let config = load_config()?;
    let timeout = config.defaults.request_timeout();
    let search = GoogleSearch::from_config(&config)?;
    let scraper = HttpScraper::new(timeout, config.defaults.scrape_max_chars)?;
    let generator = ChatClient::from_config(&config)?;

    info!(query, results, "starting brief");

    let reporter = CliProgress::new();
    let outcome = run_brief(query, results, &search, &scraper, &generator, &reporter).await;
    reporter.finish();

    let brief: Brief = match outcome {
        Ok(brief) => brief,
        Err(ResearchError::NoContent { .. }) => {
            println!("No articles could be scraped for \"{query}\".");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", brief.to_markdown());
    Ok(())
}

async fn cmd_crawl(url: &str, query: &str, depth: Option<u32>, pages: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let start = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    let depth = depth.unwrap_or(config.defaults.crawl_depth);
    let pages = pages.unwrap_or(config.defaults.crawl_pages);

    info!(url, depth, pages, "crawling site");

    let crawler = SiteCrawler::new(config.defaults.request_timeout())?;
    let crawled = crawler.crawl(&start, query, depth, pages).await?;

    if crawled.is_empty() {
        println!("No pages could be fetched from {start}.");
        return Ok(());
    }

    println!();
    for page in &crawled {
        println!(
            "  [depth {}] {}  ({} chars)",
            page.depth,
            page.url,
            page.content.chars().count()
        );
    }
    println!();
    println!("  {} page(s) crawled", crawled.len());
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_sources(sources: &[ScrapedSourceRecord]) {
    println!("## Scraped Sources\n");
    for (i, source) in sources.iter().enumerate() {
        let kind = match source.kind {
            SourceKind::Scraped => "scraped",
            SourceKind::Crawled => "crawled",
        };
        println!(
            "{}. {} ({kind}, search page {})\n   {}",
            i + 1,
            source.title,
            source.page,
            source.link
        );
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ResearchProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn plan_ready(&self, plan: &QueryPlan) {
        let clusters: Vec<String> = plan
            .keyword_clusters
            .iter()
            .map(|c| c.join(" "))
            .collect();
        self.spinner.println(format!(
            "  intent: {}  time range: {}\n  searching: {}",
            plan.intent,
            plan.time_range,
            clusters.join(" | ")
        ));
    }

    fn source_added(&self, record: &ScrapedSourceRecord, count: usize) {
        self.spinner.println(format!("  [{count}] {}", record.link));
    }

    fn done(&self, _report: &ResearchReport) {
        self.finish();
    }
}
