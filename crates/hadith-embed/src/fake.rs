use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use hadith_core::error::{ExternalError, ExternalResult};
use hadith_core::traits::Embedder;
use twox_hash::XxHash64;

/// Hashed bag-of-words embedder. Same text, same vector; shared words pull
/// vectors together, which is enough for ranking tests.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1), id: format!("fake:xxhash64:d{}", dim.max(1)) }
    }

    pub fn embed_sync(&self, text: &str) -> ExternalResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(ExternalError::InvalidInput("cannot embed empty text".into()));
        }
        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        for token in tokens {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> ExternalResult<Vec<f32>> {
        self.embed_sync(text)
    }
}
