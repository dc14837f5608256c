//! `handle_query`: one query in, one response out.
//!
//! Stages run in order: validate, classify, resolve collections, enhance,
//! embed, search, merge, cluster. Only an unusable request, an unreachable
//! registry, a failed embedding or a search where every collection failed
//! end the request with an error. Other failures are recorded on the
//! response as degradations.
use std::sync::Arc;

use chrono::Utc;
use hadith_core::config::{SearchSettings, Settings};
use hadith_core::error::PipelineError;
use hadith_core::retry::RetryPolicy;
use hadith_core::traits::{Classify, Cluster, CollectionRegistry, Embedder, Enhance, VectorIndex};
use hadith_core::types::{CollectionName, Degradation, EventCluster, QueryType, ScoredResult, SearchRequest, SearchResponse};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::clusters::validate_clusters;
use crate::merge::merge_ranked;
use crate::registry::CachedRegistry;
use crate::searcher::{call_with_deadline, MultiCollectionSearcher};

/// External collaborators the pipeline calls out to.
pub struct Capabilities {
    pub classifier: Arc<dyn Classify>,
    pub enhancer: Arc<dyn Enhance>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub registry: Arc<dyn CollectionRegistry>,
    pub clusterer: Arc<dyn Cluster>,
}

pub struct Pipeline {
    classifier: Arc<dyn Classify>,
    enhancer: Arc<dyn Enhance>,
    embedder: Arc<dyn Embedder>,
    registry: CachedRegistry,
    searcher: MultiCollectionSearcher,
    clusterer: Arc<dyn Cluster>,
    search: SearchSettings,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(capabilities: Capabilities, settings: &Settings) -> Self {
        let retry = settings.retry.policy();
        Self {
            classifier: capabilities.classifier,
            enhancer: capabilities.enhancer,
            embedder: capabilities.embedder,
            registry: CachedRegistry::new(capabilities.registry, settings.registry.refresh_interval(), retry),
            searcher: MultiCollectionSearcher::new(capabilities.index, retry),
            clusterer: capabilities.clusterer,
            search: settings.search.clone(),
            retry,
        }
    }

    pub async fn handle_query(&self, request: SearchRequest) -> Result<SearchResponse, PipelineError> {
        let started = Instant::now();
        let deadline = started + self.search.request_timeout();
        let (query, top_k) = self.validate(&request)?;
        let mut degradations = Vec::new();

        let query_type = match call_with_deadline(deadline, &self.retry, "classify", || self.classifier.classify(query)).await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "Classification failed; treating as HADITH_QUERY");
                degradations.push(Degradation::ClassificationFailed { reason: e.to_string() });
                QueryType::HadithQuery
            }
        };
        info!(%query_type, "Classified query");
        if query_type != QueryType::HadithQuery {
            return Ok(SearchResponse::short_circuit(query, query_type, degradations));
        }

        let collections = self.resolve_collections(request.collections.as_deref(), deadline).await?;
        let enhanced_query = self.enhance(query, deadline, &mut degradations).await;

        let vector = call_with_deadline(deadline, &self.retry, "embed", || self.embedder.embed(&enhanced_query))
            .await
            .map_err(PipelineError::Embedding)?;

        let outcome = self.searcher.search(&vector, &collections, top_k, deadline).await;
        if outcome.searched.is_empty() {
            return Err(PipelineError::AllCollectionsFailed { attempted: collections.len() });
        }
        degradations.extend(outcome.skipped.iter().map(|s| Degradation::CollectionSkipped {
            collection: s.collection.clone(),
            reason: s.reason.to_string(),
        }));

        let results = merge_ranked(outcome.results, top_k);
        let clusters = self.cluster(&results, deadline, &mut degradations).await;
        info!(
            results = results.len(),
            clusters = clusters.len(),
            searched = outcome.searched.len(),
            degraded = degradations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query handled"
        );
        Ok(SearchResponse {
            query: query.to_string(),
            enhanced_query,
            query_type,
            message: None,
            total_results: results.len(),
            results,
            searched_collections: outcome.searched,
            clusters,
            timestamp: Utc::now(),
            degradations,
        })
    }

    fn validate<'a>(&self, request: &'a SearchRequest) -> Result<(&'a str, usize), PipelineError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidQuery("query must not be empty".into()));
        }
        let chars = query.chars().count();
        if chars > self.search.max_query_chars {
            return Err(PipelineError::InvalidQuery(format!(
                "query is {} characters, the limit is {}",
                chars, self.search.max_query_chars
            )));
        }
        let top_k = request.top_k.unwrap_or(self.search.default_top_k);
        if top_k == 0 || top_k > self.search.max_top_k {
            return Err(PipelineError::InvalidQuery(format!(
                "top_k must be between 1 and {}, got {}",
                self.search.max_top_k, top_k
            )));
        }
        Ok((query, top_k))
    }

    /// `None` or an empty list means every known collection.
    async fn resolve_collections(
        &self,
        requested: Option<&[CollectionName]>,
        deadline: Instant,
    ) -> Result<Vec<CollectionName>, PipelineError> {
        // The cached registry retries on its own.
        let available: Vec<CollectionName> =
            call_with_deadline(deadline, &RetryPolicy::none(), "list_collections", || self.registry.list_collections())
                .await
                .map_err(PipelineError::Registry)?
                .into_iter()
                .map(|c| c.name)
                .collect();
        let requested = match requested {
            Some(r) if !r.is_empty() => r,
            _ => {
                if available.is_empty() {
                    return Err(PipelineError::NoCollections);
                }
                return Ok(available);
            }
        };
        let mut wanted: Vec<CollectionName> = Vec::with_capacity(requested.len());
        for name in requested {
            if !wanted.contains(name) {
                wanted.push(name.clone());
            }
        }
        let unknown: Vec<CollectionName> = wanted.iter().filter(|n| !available.contains(n)).cloned().collect();
        if !unknown.is_empty() {
            return Err(PipelineError::UnknownCollections { requested: unknown, available });
        }
        Ok(wanted)
    }

    async fn enhance(&self, query: &str, deadline: Instant, degradations: &mut Vec<Degradation>) -> String {
        match call_with_deadline(deadline, &self.retry, "enhance", || self.enhancer.enhance(query)).await {
            Ok(expansion) => {
                let enhanced = compose_enhanced(query, &expansion, self.search.max_enhanced_chars);
                debug!(enhanced = %enhanced, "Enhanced query");
                enhanced
            }
            Err(e) => {
                warn!(error = %e, "Query enhancement failed; using original query");
                degradations.push(Degradation::EnhancementFailed { reason: e.to_string() });
                query.to_string()
            }
        }
    }

    async fn cluster(&self, results: &[ScoredResult], deadline: Instant, degradations: &mut Vec<Degradation>) -> Vec<EventCluster> {
        if results.len() < 2 {
            return Vec::new();
        }
        let proposed = match call_with_deadline(deadline, &self.retry, "cluster", || self.clusterer.cluster(results)).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Clustering failed; results stay standalone");
                degradations.push(Degradation::ClusteringDiscarded { reason: e.to_string() });
                return Vec::new();
            }
        };
        match validate_clusters(proposed, results.len()) {
            Ok(clusters) => clusters,
            Err(reason) => {
                warn!(%reason, "Discarding inconsistent clusters");
                degradations.push(Degradation::ClusteringDiscarded { reason });
                Vec::new()
            }
        }
    }
}

/// `"{query} {expansion}"`, with the expansion cut so the whole stays within
/// `max_chars`. The query itself is never cut.
pub fn compose_enhanced(query: &str, expansion: &str, max_chars: usize) -> String {
    let expansion = expansion.trim();
    let room = max_chars.saturating_sub(query.chars().count() + 1);
    if expansion.is_empty() || room == 0 {
        return query.to_string();
    }
    let cut = match expansion.char_indices().nth(room) {
        Some((idx, _)) => &expansion[..idx],
        None => expansion,
    };
    format!("{} {}", query, cut.trim_end())
}
