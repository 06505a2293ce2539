//! OpenAI-compatible chat completions client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use researcher_shared::{AppConfig, ResearchError, Result, TextGenerator, resolve_api_key};

use crate::{build_client, endpoint};

/// Single-turn chat completion client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    url: String,
    model: String,
}

impl ChatClient {
    pub fn new(base_url: &str, api_key: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(api_key, timeout)?,
            url: endpoint(base_url, "chat/completions"),
            model: model.into(),
        })
    }

    /// Create a client from the `[llm]` config section.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm = &config.llm;
        let api_key = resolve_api_key(&llm.api_key_env)?;
        Self::new(
            &llm.base_url,
            &api_key,
            llm.model.clone(),
            Duration::from_secs(llm.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` as a single user message and return the first choice, trimmed.
    #[instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ResearchError::Generation(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ResearchError::Generation(format!(
                "chat completion returned {status}: {text}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Generation(format!("invalid chat response: {e}")))?;

        let answer = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| ResearchError::Generation("chat response had no content".into()))?;

        debug!(answer_chars = answer.len(), "completion received");
        Ok(answer.trim().to_string())
    }
}

impl TextGenerator for ChatClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        ChatClient::generate(self, prompt).await
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
