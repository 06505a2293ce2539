//! Application configuration for researcher.
//!
//! User config lives at `~/.researcher/researcher.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file; it only names the environment
//! variables that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "researcher.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".researcher";

// ---------------------------------------------------------------------------
// Config structs (matching researcher.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline limits.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Web search API settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Text generation settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Text chunking settings.
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Global cap on covered sources per run.
    #[serde(default = "default_max_links")]
    pub max_links: usize,

    /// Paginated search pages fetched per keyword cluster.
    #[serde(default = "default_search_pages")]
    pub search_pages: u32,

    /// Results requested per search page.
    #[serde(default = "default_results_per_page")]
    pub results_per_page: u32,

    /// Maximum crawl depth below a homepage.
    #[serde(default = "default_crawl_depth")]
    pub crawl_depth: u32,

    /// Maximum pages crawled per homepage.
    #[serde(default = "default_crawl_pages")]
    pub crawl_pages: usize,

    /// Candidates retrieved from the vector index.
    #[serde(default = "default_retrieve_k")]
    pub retrieve_k: usize,

    /// Timeout for search/scrape/crawl requests.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Scraped page text is clipped to this many characters.
    #[serde(default = "default_scrape_max_chars")]
    pub scrape_max_chars: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_links: default_max_links(),
            search_pages: default_search_pages(),
            results_per_page: default_results_per_page(),
            crawl_depth: default_crawl_depth(),
            crawl_pages: default_crawl_pages(),
            retrieve_k: default_retrieve_k(),
            request_timeout_secs: default_request_timeout(),
            scrape_max_chars: default_scrape_max_chars(),
        }
    }
}

fn default_max_links() -> usize {
    4
}
fn default_search_pages() -> u32 {
    3
}
fn default_results_per_page() -> u32 {
    10
}
fn default_crawl_depth() -> u32 {
    2
}
fn default_crawl_pages() -> usize {
    2
}
fn default_retrieve_k() -> usize {
    4
}
fn default_request_timeout() -> u64 {
    10
}
fn default_scrape_max_chars() -> usize {
    5000
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Name of the env var holding the search engine id (`cx`).
    #[serde(default = "default_engine_id_env")]
    pub engine_id_env: String,

    /// Search API endpoint.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            engine_id_env: default_engine_id_env(),
            endpoint: default_search_endpoint(),
        }
    }
}

fn default_search_key_env() -> String {
    "GOOGLE_CSE_API_KEY".into()
}
fn default_engine_id_env() -> String {
    "GOOGLE_CSE_CX".into()
}
fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Chat model used for planning, scoring and synthesis.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Per-request timeout.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_llm_key_env(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_llm_model() -> String {
    "google/gemini-2.0-flash-001".into()
}
fn default_llm_timeout() -> u64 {
    120
}

/// `[embedding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Embedding model.
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_embedding_key_env(),
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
        }
    }
}

fn default_embedding_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    2048
}
fn default_chunk_overlap() -> usize {
    512
}

// ---------------------------------------------------------------------------
// Research config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime limits for one research run, merged from the config file and CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchConfig {
    /// Global cap on coverage records.
    pub max_links: usize,
    /// Search pages per keyword cluster.
    pub search_pages: u32,
    /// Results per search page.
    pub results_per_page: u32,
    /// Crawl depth below a homepage.
    pub crawl_depth: u32,
    /// Pages crawled per homepage.
    pub crawl_pages: usize,
    /// Candidates retrieved from the index.
    pub retrieve_k: usize,
}

impl From<&AppConfig> for ResearchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_links: config.defaults.max_links,
            search_pages: config.defaults.search_pages,
            results_per_page: config.defaults.results_per_page,
            crawl_depth: config.defaults.crawl_depth,
            crawl_pages: config.defaults.crawl_pages,
            retrieve_k: config.defaults.retrieve_k,
        }
    }
}

impl ResearchConfig {
    /// Reject limits that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_links == 0 {
            return Err(ResearchError::validation("max_links must be at least 1"));
        }
        if self.search_pages == 0 {
            return Err(ResearchError::validation("search_pages must be at least 1"));
        }
        if self.retrieve_k == 0 {
            return Err(ResearchError::validation("retrieve_k must be at least 1"));
        }
        Ok(())
    }
}

impl DefaultsConfig {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ChunkingConfig {
    /// Overlap must leave room for new text in every chunk.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ResearchError::validation("chunk_size must be at least 1"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ResearchError::validation(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.researcher/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ResearchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.researcher/researcher.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ResearchError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ResearchError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.chunking.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ResearchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ResearchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ResearchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key held in the env var named `var_name`.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(ResearchError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check that every credential the full pipeline needs is present.
///
/// Reports all missing variables at once rather than the first one.
pub fn validate_api_keys(config: &AppConfig) -> Result<()> {
    let required = [
        config.search.api_key_env.as_str(),
        config.search.engine_id_env.as_str(),
        config.llm.api_key_env.as_str(),
        config.embedding.api_key_env.as_str(),
    ];

    let missing: Vec<&str> = required
        .into_iter()
        .filter(|name| resolve_api_key(name).is_err())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ResearchError::config(format!(
            "API key not found. Set the following environment variables: {}",
            missing.join(", ")
        )))
    }
}
