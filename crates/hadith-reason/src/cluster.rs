use async_trait::async_trait;
use hadith_core::error::{ExternalError, ExternalResult};
use hadith_core::traits::Cluster;
use hadith_core::types::{EventCluster, ScoredResult};
use hadith_openai::{ChatRequest, Message, OpenAIClient};
use serde::Deserialize;
use tracing::info;

use crate::prompts::{cluster_user, CLUSTER_SYSTEM};

pub struct LlmClusterer {
    client: OpenAIClient,
    model: String,
    max_text_chars: usize,
}

impl LlmClusterer {
    pub fn new(client: OpenAIClient, model: impl Into<String>, max_text_chars: usize) -> Self {
        Self { client, model: model.into(), max_text_chars }
    }
}

#[async_trait]
impl Cluster for LlmClusterer {
    async fn cluster(&self, results: &[ScoredResult]) -> ExternalResult<Vec<EventCluster>> {
        if results.len() < 2 {
            return Ok(Vec::new());
        }
        let request = ChatRequest::new(&self.model)
            .message(Message::system(CLUSTER_SYSTEM))
            .message(Message::user(cluster_user(results, self.max_text_chars)))
            .temperature(0.3)
            .max_tokens(2000)
            .json_object();
        let reply = self.client.chat_completion(request).await?;
        let clusters = parse_clusters(&reply)?;
        info!(clusters = clusters.len(), results = results.len(), "Model clustered results");
        Ok(clusters)
    }
}

#[derive(Deserialize)]
struct ClusterReply {
    clusters: Option<Vec<RawCluster>>,
}

#[derive(Deserialize)]
struct RawCluster {
    #[serde(default)]
    event_title: String,
    primary_index: usize,
    hadith_indices: Vec<usize>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Decode the model's JSON reply. Only the shape is checked here; index
/// validity against the result list is the caller's job.
pub fn parse_clusters(reply: &str) -> ExternalResult<Vec<EventCluster>> {
    let parsed: ClusterReply = serde_json::from_str(reply.trim())
        .map_err(|e| ExternalError::MalformedOutput(format!("cluster reply is not valid JSON: {}", e)))?;
    let clusters = parsed
        .clusters
        .ok_or_else(|| ExternalError::MalformedOutput("cluster reply has no 'clusters' field".into()))?;
    Ok(clusters
        .into_iter()
        .map(|c| EventCluster {
            event_title: c.event_title,
            primary_index: c.primary_index,
            hadith_indices: c.hadith_indices,
            reasoning: c.reasoning.filter(|r| !r.trim().is_empty()),
        })
        .collect())
}
