//! Capability seams between the pipeline and its external collaborators.
//!
//! Every trait is object safe so the orchestrator can hold `Arc<dyn _>` and
//! tests can substitute deterministic fakes.
use async_trait::async_trait;

use crate::error::ExternalResult;
use crate::types::{CollectionInfo, EventCluster, QueryType, ScoredResult};

/// Text to fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-3-large`).
    fn embedder_id(&self) -> &str;
    /// Embedding dimensionality.
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> ExternalResult<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> ExternalResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Nearest-neighbour search over one named collection.
///
/// Results come back sorted by descending score.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(&self, collection: &str, vector: &[f32], k: usize) -> ExternalResult<Vec<ScoredResult>>;
}

/// Enumerates searchable collections.
#[async_trait]
pub trait CollectionRegistry: Send + Sync {
    async fn list_collections(&self) -> ExternalResult<Vec<CollectionInfo>>;
}

#[async_trait]
pub trait Classify: Send + Sync {
    async fn classify(&self, query: &str) -> ExternalResult<QueryType>;
}

/// Returns expansion terms only; the caller prepends the original query.
#[async_trait]
pub trait Enhance: Send + Sync {
    async fn enhance(&self, query: &str) -> ExternalResult<String>;
}

/// Groups ranked results that narrate the same event. Output is untrusted
/// and validated by the caller.
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn cluster(&self, results: &[ScoredResult]) -> ExternalResult<Vec<EventCluster>>;
}
