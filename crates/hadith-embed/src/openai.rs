use async_trait::async_trait;
use hadith_core::error::{ExternalError, ExternalResult};
use hadith_core::traits::Embedder;
use hadith_openai::OpenAIClient;
use tracing::debug;

/// Maximum inputs per embeddings request.
const MAX_BATCH: usize = 100;

pub struct OpenAIEmbedder {
    client: OpenAIClient,
    model: String,
    dim: usize,
    id: String,
}

impl OpenAIEmbedder {
    pub fn new(client: OpenAIClient, model: impl Into<String>, dim: usize) -> Self {
        let model = model.into();
        let id = format!("openai:{}:d{}", model, dim);
        Self { client, model, dim, id }
    }

    pub fn from_env(model: &str, dim: usize) -> anyhow::Result<Self> {
        Ok(Self::new(OpenAIClient::from_env()?, model, dim))
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }

    fn check(&self, vectors: &[Vec<f32>]) -> ExternalResult<()> {
        match vectors.iter().find(|v| v.len() != self.dim) {
            Some(v) => Err(ExternalError::MalformedOutput(format!(
                "expected {}-dimensional embedding, got {}",
                self.dim,
                v.len()
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> ExternalResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| ExternalError::MalformedOutput("no embedding returned".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> ExternalResult<Vec<Vec<f32>>> {
        if let Some(pos) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(ExternalError::InvalidInput(format!("input {} is empty", pos)));
        }
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            let vectors = self.client.create_embeddings(chunk, &self.model).await?;
            self.check(&vectors)?;
            out.extend(vectors);
        }
        debug!(model = %self.model, inputs = texts.len(), "Embedded batch");
        Ok(out)
    }
}
