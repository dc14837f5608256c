//! Embedding gateway: text in, fixed-length vector out.
//!
//! `OpenAIEmbedder` calls the remote embeddings endpoint; `FakeEmbedder` is a
//! deterministic hashed bag-of-words used for tests and offline development.
//! Set `APP_USE_FAKE_EMBEDDINGS=1` (or `embedding.provider = "fake"`) to
//! switch to the fake.
use std::sync::Arc;

use anyhow::Result;
use hadith_core::config::{EmbeddingProvider, EmbeddingSettings};
use hadith_core::traits::Embedder;
use tracing::info;

mod fake;
mod openai;

pub use fake::FakeEmbedder;
pub use openai::OpenAIEmbedder;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() || settings.provider == EmbeddingProvider::Fake {
        info!(dim = settings.dimension, "Using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.dimension)));
    }
    let embedder = OpenAIEmbedder::from_env(&settings.model, settings.dimension)?.with_base_url(&settings.base_url);
    info!(model = %settings.model, dim = settings.dimension, "Using OpenAI embeddings");
    Ok(Arc::new(embedder))
}
