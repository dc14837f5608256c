use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hadith_core::error::ExternalResult;
use hadith_core::retry::{with_retry, RetryPolicy};
use hadith_core::traits::CollectionRegistry;
use hadith_core::types::CollectionInfo;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

struct Snapshot {
    collections: Vec<CollectionInfo>,
    fetched_at: Instant,
}

/// Caches the collection listing for `ttl`.
///
/// The upstream call runs without holding the lock. When a refresh fails and
/// an older listing exists, the older listing is served.
pub struct CachedRegistry {
    inner: Arc<dyn CollectionRegistry>,
    ttl: Duration,
    retry: RetryPolicy,
    cache: RwLock<Option<Snapshot>>,
}

impl CachedRegistry {
    pub fn new(inner: Arc<dyn CollectionRegistry>, ttl: Duration, retry: RetryPolicy) -> Self {
        Self { inner, ttl, retry, cache: RwLock::new(None) }
    }
}

#[async_trait]
impl CollectionRegistry for CachedRegistry {
    async fn list_collections(&self) -> ExternalResult<Vec<CollectionInfo>> {
        if let Some(snapshot) = self.cache.read().await.as_ref() {
            if snapshot.fetched_at.elapsed() < self.ttl {
                return Ok(snapshot.collections.clone());
            }
        }
        match with_retry(&self.retry, "list_collections", || self.inner.list_collections()).await {
            Ok(collections) => {
                debug!(count = collections.len(), "Refreshed collection registry");
                *self.cache.write().await = Some(Snapshot { collections: collections.clone(), fetched_at: Instant::now() });
                Ok(collections)
            }
            Err(e) => match self.cache.read().await.as_ref() {
                Some(stale) => {
                    warn!(error = %e, "Registry refresh failed; serving cached collections");
                    Ok(stale.collections.clone())
                }
                None => Err(e),
            },
        }
    }
}
