//! OpenAI-compatible embeddings client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use researcher_shared::{AppConfig, Embedder, ResearchError, Result, resolve_api_key};

use crate::{build_client, endpoint};

/// Inputs sent per embeddings request.
const BATCH_SIZE: usize = 64;

/// Embeddings client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    url: String,
    model: String,
}

impl EmbeddingClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(api_key, timeout)?,
            url: endpoint(base_url, "embeddings"),
            model: model.into(),
        })
    }

    /// Create a client from the `[embedding]` config section.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(&config.embedding.api_key_env)?;
        Self::new(
            &config.embedding.base_url,
            &api_key,
            config.embedding.model.clone(),
            config.defaults.request_timeout(),
        )
    }

    /// Embed `texts` in batches, returning one vector per input in input order.
    #[instrument(skip_all, fields(model = %self.model, inputs = texts.len()))]
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ResearchError::Embedding(format!("embeddings request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ResearchError::Embedding(format!(
                "embeddings request returned {status}: {text}"
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Embedding(format!("invalid embeddings response: {e}")))?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(ResearchError::Embedding(format!(
                "received {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        debug!(batch = inputs.len(), "batch embedded");
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        EmbeddingClient::embed(self, texts).await
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> EmbeddingClient {
        EmbeddingClient::new(&server.uri(), "sk-test", "test-embed", Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_embed_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-embed",
                "input": ["first", "second"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let texts = vec!["first".to_string(), "second".to_string()];
        let vectors = client(&server).embed(&texts).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_embed_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "index": 0, "embedding": [1.0] }]
            })))
            .mount(&server)
            .await;

        let texts = vec!["a".to_string(), "b".to_string()];
        let err = client(&server).embed(&texts).await.unwrap_err();
        assert!(matches!(err, ResearchError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_embed_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client(&server).embed(&["a".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_embed_empty_input_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let vectors = client(&server).embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
