//! Domain types shared by the search pipeline and its collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CollectionName = String;

/// Inbound request for a single query-response cycle.
///
/// - `query`: raw user text (1..=500 characters after trimming)
/// - `collections`: optional subset to search; `None` or empty means all
/// - `top_k`: optional result count (1..=50)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<CollectionName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Default::default() }
    }

    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = Some(collections.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// Intent label assigned to a query before any search cost is incurred.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
    Greeting,
    OffTopic,
    HadithQuery,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Greeting => "GREETING",
            QueryType::OffTopic => "OFF_TOPIC",
            QueryType::HadithQuery => "HADITH_QUERY",
        }
    }

    /// Short reply sent instead of results for non-search intents.
    pub fn canned_message(&self) -> Option<&'static str> {
        match self {
            QueryType::Greeting => Some(
                "وعليكم السلام! (Wa alaikum salaam!) Welcome! I'm here to help you find Hadiths.",
            ),
            QueryType::OffTopic => Some(
                "I specialize in finding Hadiths. Ask me about what the Prophet Muhammad (ﷺ) said or did!",
            ),
            QueryType::HadithQuery => None,
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrievable passage with its citation metadata.
///
/// `hadith_id` is unique within `collection` only; the pair identifies a
/// passage globally.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PassageRecord {
    pub collection: CollectionName,
    pub hadith_id: i64,
    pub collection_reference: String,
    pub in_book_reference: String,
    pub web_reference: String,
    pub grading: String,
    pub narrator: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arabic: Option<String>,
}

impl PassageRecord {
    pub fn key(&self) -> (&str, i64) {
        (self.collection.as_str(), self.hadith_id)
    }
}

/// A passage paired with its query similarity. Higher is better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredResult {
    pub score: f32,
    #[serde(flatten)]
    pub passage: PassageRecord,
}

impl ScoredResult {
    pub fn new(passage: PassageRecord, score: f32) -> Self {
        Self { score, passage }
    }
}

/// Passages judged to narrate the same event.
///
/// Indices point into `SearchResponse::results`. `primary_index` must be one
/// of `hadith_indices`, and no index appears in two clusters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventCluster {
    pub event_title: String,
    pub primary_index: usize,
    pub hadith_indices: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A component failure absorbed by the pipeline instead of failing the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    ClassificationFailed { reason: String },
    EnhancementFailed { reason: String },
    CollectionSkipped { collection: CollectionName, reason: String },
    ClusteringDiscarded { reason: String },
}

/// Outbound response of `handle_query`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub query: String,
    pub enhanced_query: String,
    pub query_type: QueryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub results: Vec<ScoredResult>,
    pub total_results: usize,
    pub searched_collections: Vec<CollectionName>,
    pub clusters: Vec<EventCluster>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<Degradation>,
}

impl SearchResponse {
    /// Response for GREETING / OFF_TOPIC queries: no search was attempted.
    pub fn short_circuit(query: &str, query_type: QueryType, degradations: Vec<Degradation>) -> Self {
        Self {
            query: query.to_string(),
            enhanced_query: query.to_string(),
            query_type,
            message: query_type.canned_message().map(str::to_string),
            results: Vec::new(),
            total_results: 0,
            searched_collections: Vec::new(),
            clusters: Vec::new(),
            timestamp: Utc::now(),
            degradations,
        }
    }

    /// Result indices that belong to no cluster, in ranked order.
    pub fn standalone_indices(&self) -> Vec<usize> {
        (0..self.results.len())
            .filter(|i| !self.clusters.iter().any(|c| c.hadith_indices.contains(i)))
            .collect()
    }
}

/// A searchable collection and its approximate size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: CollectionName,
    pub vector_count: usize,
}
