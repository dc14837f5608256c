//! Minimal OpenAI-compatible REST client.
//!
//! Covers the two endpoints the search pipeline needs: chat completions (for
//! classification, enhancement and clustering) and embeddings. Errors convert
//! into `hadith_core::error::ExternalError` so callers can decide on retries.
//!
//! ```rust,ignore
//! let client = OpenAIClient::from_env()?;
//! let reply = client
//!     .chat_completion(ChatRequest::new("gpt-4o-mini").message(Message::user("Hello!")))
//!     .await?;
//! let vectors = client.create_embeddings(&["text".to_string()], "text-embedding-3-large").await?;
//! ```

pub mod error;
pub mod types;

pub use error::{OpenAIError, Result};
pub use types::{ChatRequest, Message, ResponseFormat};

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| OpenAIError::Config(e.to_string()))?;
        Ok(Self { http_client, api_key: api_key.into(), base_url: DEFAULT_BASE_URL.to_string() })
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Self::new(api_key)
    }

    /// Set a custom base URL (for Azure, proxies, local gateways).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion. Returns the content of the first choice.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<String> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                OpenAIError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %message, "OpenAI API error");
            return Err(OpenAIError::Api { status, message });
        }

        let chat_response: types::ChatResponseRaw = response.json().await.map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Parse("No content in OpenAI response".into()))?;

        debug!(model = %request.model, duration_ms = start.elapsed().as_millis() as u64, "OpenAI chat completion");
        Ok(content)
    }

    /// Embeddings for a batch of inputs, returned in input order.
    pub async fn create_embeddings(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>> {
        let start = std::time::Instant::now();
        let request = types::EmbeddingRequest { model, input: texts };

        let response = self
            .http_client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Embedding request failed");
                OpenAIError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %message, "OpenAI embedding error");
            return Err(OpenAIError::Api { status, message });
        }

        let embed_response: types::EmbeddingResponse =
            response.json().await.map_err(|e| OpenAIError::Parse(e.to_string()))?;
        if embed_response.data.len() != texts.len() {
            return Err(OpenAIError::Parse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embed_response.data.len()
            )));
        }
        let mut data = embed_response.data;
        data.sort_by_key(|d| d.index);

        debug!(model, inputs = texts.len(), duration_ms = start.elapsed().as_millis() as u64, "OpenAI embeddings");
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
