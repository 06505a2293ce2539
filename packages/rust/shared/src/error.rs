//! Error types for researcher.
//!
//! Library crates use [`ResearchError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all researcher operations.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during search, scrape, or crawl.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Text generation collaborator failed.
    #[error("generation error: {0}")]
    Generation(String),

    /// Embedding collaborator failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Vector index could not be built or queried.
    #[error("index error: {0}")]
    Index(String),

    /// Nothing was gathered, so there is nothing to synthesize.
    #[error("no content could be gathered for: {query}")]
    NoContent { query: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, invalid limits, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ResearchError>;

impl ResearchError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The "nothing gathered" outcome for a query.
    pub fn no_content(query: impl Into<String>) -> Self {
        Self::NoContent {
            query: query.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ResearchError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = ResearchError::validation("max_links must be at least 1");
        assert!(err.to_string().contains("max_links"));

        let err = ResearchError::no_content("India US trade deal");
        assert_eq!(
            err.to_string(),
            "no content could be gathered for: India US trade deal"
        );
    }
}
