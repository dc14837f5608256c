use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use hadith_core::error::{ExternalError, ExternalResult};
use hadith_core::retry::{with_retry, RetryPolicy};
use hadith_core::traits::VectorIndex;
use hadith_core::types::{CollectionName, ScoredResult};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// A collection that produced no results for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCollection {
    pub collection: CollectionName,
    pub reason: ExternalError,
}

#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Per-collection hit lists, each in descending score order.
    pub results: Vec<Vec<ScoredResult>>,
    /// Collections that answered, in request order.
    pub searched: Vec<CollectionName>,
    pub skipped: Vec<SkippedCollection>,
}

/// Run a retried external call, giving up at `deadline`.
pub async fn call_with_deadline<T, F, Fut>(
    deadline: Instant,
    retry: &RetryPolicy,
    operation: &str,
    call: F,
) -> ExternalResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ExternalResult<T>>,
{
    match timeout_at(deadline, with_retry(retry, operation, call)).await {
        Ok(result) => result,
        Err(_) => Err(ExternalError::Timeout(format!("{} exceeded the request deadline", operation))),
    }
}

/// Queries every collection concurrently with one shared deadline.
#[derive(Clone)]
pub struct MultiCollectionSearcher {
    index: Arc<dyn VectorIndex>,
    retry: RetryPolicy,
}

impl MultiCollectionSearcher {
    pub fn new(index: Arc<dyn VectorIndex>, retry: RetryPolicy) -> Self {
        Self { index, retry }
    }

    pub async fn search(&self, vector: &[f32], collections: &[CollectionName], k: usize, deadline: Instant) -> SearchOutcome {
        let started = Instant::now();
        let tasks = collections.iter().map(|collection| async move {
            let result = call_with_deadline(deadline, &self.retry, "vector_query", || {
                self.index.query(collection, vector, k)
            })
            .await;
            (collection, result)
        });
        let mut outcome = SearchOutcome::default();
        for (collection, result) in join_all(tasks).await {
            match result {
                Ok(mut hits) => {
                    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
                    debug!(%collection, hits = hits.len(), "Collection searched");
                    outcome.searched.push(collection.clone());
                    outcome.results.push(hits);
                }
                Err(reason) => {
                    warn!(%collection, error = %reason, "Skipping collection");
                    outcome.skipped.push(SkippedCollection { collection: collection.clone(), reason });
                }
            }
        }
        debug!(
            searched = outcome.searched.len(),
            skipped = outcome.skipped.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fan-out finished"
        );
        outcome
    }
}
