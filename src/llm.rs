//! Chat-completion client used for answer synthesis.
//!
//! [`ChatModel`] is the seam between the query pipeline and the language
//! model. [`OpenAIChat`] talks to `POST {url}/chat/completions` (OpenAI or
//! any compatible server, including Ollama's `/v1`); sampling temperature
//! and the output-token bound come from `[llm]`.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::http;
use crate::models::ChatMessage;

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";

/// Generates an assistant reply for a message sequence.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// A chat model that always fails. Used when `llm.provider = "disabled"`.
pub struct DisabledChat;

#[async_trait]
impl ChatModel for DisabledChat {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        bail!("LLM provider is disabled")
    }
}

/// OpenAI-compatible chat completions. Requires `OPENAI_API_KEY` when
/// talking to the default endpoint.
pub struct OpenAIChat {
    config: LlmConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAIChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        // Self-hosted compatible servers usually run without a key.
        let api_key = match config.url {
            None => Some(http::openai_api_key()?),
            Some(_) => http::openai_api_key().ok(),
        };
        Ok(Self {
            config: config.clone(),
            api_key,
            client: http::client_with_timeout(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let base = self.config.url.as_deref().unwrap_or(OPENAI_DEFAULT_URL);
        let url = format!("{}/chat/completions", base.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let json = http::post_json(
            &self.client,
            &url,
            self.api_key.as_deref(),
            &body,
            self.config.max_retries,
            "OpenAI",
        )
        .await?;

        parse_completion(&json)
    }
}

/// Pull `choices[0].message.content` out of a completion response.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    if let Some(error) = json.get("error") {
        bail!("API returned error: {}", error);
    }

    json.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing choices[0].message.content"))
}

/// Create the [`ChatModel`] named by `llm.provider`.
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledChat)),
        "openai" => Ok(Arc::new(OpenAIChat::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}
