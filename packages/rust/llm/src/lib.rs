//! Clients for OpenAI-compatible model APIs.
//!
//! - [`ChatClient`]: `POST {base_url}/chat/completions`, implements [`TextGenerator`]
//! - [`EmbeddingClient`]: `POST {base_url}/embeddings`, implements [`Embedder`]
//!
//! [`TextGenerator`]: researcher_shared::TextGenerator
//! [`Embedder`]: researcher_shared::Embedder

mod chat;
mod embeddings;

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

use researcher_shared::{ResearchError, Result};

pub use chat::ChatClient;
pub use embeddings::EmbeddingClient;

/// User-Agent string for model API requests.
const USER_AGENT: &str = concat!("researcher/", env!("CARGO_PKG_VERSION"));

/// Build a client that sends `Authorization: Bearer {api_key}` on every request.
fn build_client(api_key: &str, timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
        .map_err(|_| ResearchError::config("API key contains invalid header characters"))?;
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| ResearchError::Network(format!("failed to build HTTP client: {e}")))
}

/// `{base_url}/{path}` without doubled slashes.
fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(
            endpoint("https://openrouter.ai/api/v1/", "chat/completions"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(
            endpoint("https://api.openai.com/v1", "embeddings"),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[test]
    fn test_build_client_rejects_bad_key() {
        assert!(build_client("bad\nkey", Duration::from_secs(1)).is_err());
        assert!(build_client("sk-test", Duration::from_secs(1)).is_ok());
    }
}
