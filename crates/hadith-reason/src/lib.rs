#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]
//! Reasoning capabilities for the query pipeline: intent classification,
//! query enhancement and event clustering.
//!
//! `reasoning.provider = "openai"` uses the chat completions endpoint;
//! `"offline"` uses lexicon rules, a glossary and shingle overlap. The lexical
//! clusterer can also be chosen on its own with `clustering.backend = "lexical"`.
use std::sync::Arc;

use anyhow::Result;
use hadith_core::config::{ClusteringBackend, ReasoningProvider, Settings};
use hadith_core::traits::{Classify, Cluster, Enhance};
use hadith_openai::OpenAIClient;
use tracing::info;

pub mod classify;
pub mod cluster;
pub mod enhance;
pub mod lexical;
pub mod offline;
pub mod prompts;

pub use classify::{parse_classification, LlmClassifier};
pub use cluster::{parse_clusters, LlmClusterer};
pub use enhance::LlmEnhancer;
pub use lexical::LexicalClusterer;
pub use offline::{GlossaryEnhancer, RuleClassifier};

pub struct Reasoners {
    pub classifier: Arc<dyn Classify>,
    pub enhancer: Arc<dyn Enhance>,
    pub clusterer: Arc<dyn Cluster>,
}

impl Reasoners {
    pub fn offline(threshold: f32) -> Self {
        Self {
            classifier: Arc::new(RuleClassifier),
            enhancer: Arc::new(GlossaryEnhancer),
            clusterer: Arc::new(LexicalClusterer::new(threshold)),
        }
    }
}

pub fn build_reasoners(settings: &Settings) -> Result<Reasoners> {
    let clustering = &settings.clustering;
    match settings.reasoning.provider {
        ReasoningProvider::Offline => {
            info!(threshold = clustering.threshold, "Using offline reasoning");
            Ok(Reasoners::offline(clustering.threshold))
        }
        ReasoningProvider::OpenAI => {
            let reasoning = &settings.reasoning;
            let client = OpenAIClient::from_env()?.with_base_url(&reasoning.base_url);
            let clusterer: Arc<dyn Cluster> = match clustering.backend {
                ClusteringBackend::Llm => {
                    Arc::new(LlmClusterer::new(client.clone(), &reasoning.model, clustering.max_text_chars))
                }
                ClusteringBackend::Lexical => Arc::new(LexicalClusterer::new(clustering.threshold)),
            };
            info!(model = %reasoning.model, clustering = ?clustering.backend, "Using OpenAI reasoning");
            Ok(Reasoners {
                classifier: Arc::new(LlmClassifier::new(client.clone(), &reasoning.model)),
                enhancer: Arc::new(LlmEnhancer::new(client, &reasoning.model)),
                clusterer,
            })
        }
    }
}
