#![allow(dead_code)]
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hadith_core::config::{RetrySettings, Settings};
use hadith_core::error::{ExternalError, ExternalResult};
use hadith_core::traits::{Classify, Cluster, CollectionRegistry, Embedder, Enhance, VectorIndex};
use hadith_core::types::{CollectionInfo, EventCluster, PassageRecord, QueryType, ScoredResult};
use hadith_embed::FakeEmbedder;
use hadith_pipeline::{Capabilities, Pipeline};
use hadith_reason::{GlossaryEnhancer, LexicalClusterer, RuleClassifier};

pub const DIM: usize = 256;

pub const FLY_BUKHARI: &str = "Narrated Abu Huraira:\nAllah's Messenger said, If a fly falls in the drink of any one of you, he should dip all of it into the drink and then throw it away, for in one of its wings there is a disease and in the other there is healing.";
pub const FLY_ABUDAWUD: &str = "Narrated Abu Hurairah:\nThe Prophet said, If a fly falls in the drink of any one of you, he should dip all of it into the drink and then throw it away, for in one of its wings there is a disease and in the other there is healing.";

pub fn corpus() -> Vec<(&'static str, i64, &'static str)> {
    vec![
        ("hadith-bukhari", 3320, FLY_BUKHARI),
        ("hadith-bukhari", 645, "Narrated Ibn Umar:\nThe prayer in congregation is twenty seven times superior to the prayer offered by a person alone."),
        ("hadith-bukhari", 1, "Narrated Umar bin Al-Khattab:\nI heard Allah's Messenger saying, The reward of deeds depends upon the intentions."),
        ("hadith-abudawud", 3844, FLY_ABUDAWUD),
        ("hadith-abudawud", 2350, "Narrated Anas:\nThe Prophet used to break his fast with fresh dates before praying."),
        ("hadith-muslim", 2564, "Narrated Abu Hurairah:\nAllah does not look at your bodies nor your faces but He looks at your hearts."),
    ]
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.retry = RetrySettings { max_attempts: 2, min_delay_ms: 1, max_delay_ms: 2 };
    settings.search.request_timeout_ms = 5_000;
    settings
}

#[derive(Clone)]
pub enum Behaviour {
    Fail(ExternalError),
    Hang,
}

/// Brute-force cosine search over passages embedded with `FakeEmbedder`.
#[derive(Default)]
pub struct MemoryIndex {
    docs: HashMap<String, Vec<(PassageRecord, Vec<f32>)>>,
    behaviour: HashMap<String, Behaviour>,
    calls: Mutex<Vec<String>>,
}

impl MemoryIndex {
    pub fn build(corpus: &[(&str, i64, &str)]) -> Self {
        let embedder = FakeEmbedder::new(DIM);
        let mut index = Self::default();
        for (collection, id, text) in corpus {
            let passage = PassageRecord {
                collection: collection.to_string(),
                hadith_id: *id,
                collection_reference: format!("{} {}", collection, id),
                narrator: text.split_once('\n').map(|(n, _)| n.to_string()).unwrap_or_default(),
                text: text.to_string(),
                ..Default::default()
            };
            let vector = embedder.embed_sync(text).expect("embed corpus");
            index.docs.entry(collection.to_string()).or_default().push((passage, vector));
        }
        index
    }

    pub fn with_behaviour(mut self, collection: &str, behaviour: Behaviour) -> Self {
        self.behaviour.insert(collection.to_string(), behaviour);
        self
    }

    pub fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.docs.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn query(&self, collection: &str, vector: &[f32], k: usize) -> ExternalResult<Vec<ScoredResult>> {
        self.calls.lock().expect("lock").push(collection.to_string());
        match self.behaviour.get(collection) {
            Some(Behaviour::Fail(e)) => return Err(e.clone()),
            Some(Behaviour::Hang) => {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            None => {}
        }
        let docs = self
            .docs
            .get(collection)
            .ok_or_else(|| ExternalError::InvalidInput(format!("collection '{}' does not exist", collection)))?;
        let mut hits: Vec<ScoredResult> = docs
            .iter()
            .map(|(p, v)| ScoredResult::new(p.clone(), v.iter().zip(vector).map(|(a, b)| a * b).sum()))
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}

pub struct StaticRegistry {
    names: Vec<String>,
    fail: Option<ExternalError>,
    hang: bool,
    pub calls: AtomicUsize,
}

impl StaticRegistry {
    pub fn new(names: Vec<String>) -> Self {
        Self { names, fail: None, hang: false, calls: AtomicUsize::new(0) }
    }

    pub fn failing(e: ExternalError) -> Self {
        Self { fail: Some(e), ..Self::new(Vec::new()) }
    }

    /// Never answers within any sane request deadline.
    pub fn hanging() -> Self {
        Self { hang: true, ..Self::new(Vec::new()) }
    }
}

#[async_trait]
impl CollectionRegistry for StaticRegistry {
    async fn list_collections(&self) -> ExternalResult<Vec<CollectionInfo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(e) = &self.fail {
            return Err(e.clone());
        }
        Ok(self.names.iter().map(|n| CollectionInfo { name: n.clone(), vector_count: 1 }).collect())
    }
}

/// Counts calls; optionally fails every one of them.
pub struct CountingEmbedder {
    inner: FakeEmbedder,
    fail: Option<ExternalError>,
    pub calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self { inner: FakeEmbedder::new(DIM), fail: None, calls: AtomicUsize::new(0) }
    }

    pub fn failing(e: ExternalError) -> Self {
        Self { fail: Some(e), ..Self::new() }
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn embedder_id(&self) -> &str {
        self.inner.embedder_id()
    }

    fn dim(&self) -> usize {
        DIM
    }

    async fn embed(&self, text: &str) -> ExternalResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail {
            Some(e) => Err(e.clone()),
            None => self.inner.embed(text).await,
        }
    }
}

pub struct FixedClassifier(pub ExternalResult<QueryType>);

#[async_trait]
impl Classify for FixedClassifier {
    async fn classify(&self, _query: &str) -> ExternalResult<QueryType> {
        self.0.clone()
    }
}

pub struct FixedEnhancer(pub ExternalResult<String>);

#[async_trait]
impl Enhance for FixedEnhancer {
    async fn enhance(&self, _query: &str) -> ExternalResult<String> {
        self.0.clone()
    }
}

pub struct FixedClusterer(pub ExternalResult<Vec<EventCluster>>);

#[async_trait]
impl Cluster for FixedClusterer {
    async fn cluster(&self, _results: &[ScoredResult]) -> ExternalResult<Vec<EventCluster>> {
        self.0.clone()
    }
}

/// Offline reasoning over the shared corpus; tests swap single parts.
pub struct Harness {
    pub index: Arc<MemoryIndex>,
    pub registry: Arc<StaticRegistry>,
    pub embedder: Arc<CountingEmbedder>,
    pub classifier: Arc<dyn Classify>,
    pub enhancer: Arc<dyn Enhance>,
    pub clusterer: Arc<dyn Cluster>,
    pub settings: Settings,
}

impl Harness {
    pub fn new(index: MemoryIndex) -> Self {
        let settings = test_settings();
        let registry = StaticRegistry::new(index.collections());
        Self {
            index: Arc::new(index),
            registry: Arc::new(registry),
            embedder: Arc::new(CountingEmbedder::new()),
            classifier: Arc::new(RuleClassifier),
            enhancer: Arc::new(GlossaryEnhancer),
            clusterer: Arc::new(LexicalClusterer::new(settings.clustering.threshold)),
            settings,
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            Capabilities {
                classifier: self.classifier.clone(),
                enhancer: self.enhancer.clone(),
                embedder: self.embedder.clone(),
                index: self.index.clone(),
                registry: self.registry.clone(),
                clusterer: self.clusterer.clone(),
            },
            &self.settings,
        )
    }

    pub fn embed_calls(&self) -> usize {
        self.embedder.calls.load(Ordering::SeqCst)
    }
}
