//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_SEARCH__DEFAULT_TOP_K=5`). Provides helpers to expand `~` and `${VAR}`
//! and to resolve relative paths against a known base directory.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::retry::RetryPolicy;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_in(Path::new("."), &env_name)
    }

    /// Load `config.toml` + `config.<env>.toml` from `dir`, then `APP_*` env vars.
    pub fn load_in(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        match env {
            "prod" | "production" => {
                if settings.embedding.provider == EmbeddingProvider::Fake {
                    return Err(Error::InvalidConfig("fake embeddings are not allowed in production".into()).into());
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub search: SearchSettings,
    pub retry: RetrySettings,
    pub embedding: EmbeddingSettings,
    pub reasoning: ReasoningSettings,
    pub clustering: ClusteringSettings,
    pub registry: RegistrySettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.search.default_top_k == 0 || self.search.default_top_k > self.search.max_top_k {
            return Err(Error::InvalidConfig(format!(
                "search.default_top_k must be in 1..={}, got {}",
                self.search.max_top_k, self.search.default_top_k
            )));
        }
        if self.search.max_enhanced_chars < self.search.max_query_chars {
            return Err(Error::InvalidConfig(format!(
                "search.max_enhanced_chars ({}) is smaller than search.max_query_chars ({})",
                self.search.max_enhanced_chars, self.search.max_query_chars
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidConfig("retry.max_attempts must be at least 1".into()));
        }
        if !(self.clustering.threshold > 0.0 && self.clustering.threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "clustering.threshold must be in (0, 1], got {}",
                self.clustering.threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataSettings {
    pub lancedb_dir: String,
    pub raw_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { lancedb_dir: "data/indexes/lancedb".into(), raw_dir: "data/raw".into() }
    }
}

impl DataSettings {
    pub fn lancedb_path(&self) -> PathBuf {
        expand_path(&self.lancedb_dir)
    }

    pub fn raw_path(&self) -> PathBuf {
        expand_path(&self.raw_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub max_query_chars: usize,
    pub max_enhanced_chars: usize,
    pub request_timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            max_top_k: 50,
            max_query_chars: 500,
            max_enhanced_chars: 2000,
            request_timeout_ms: 15_000,
        }
    }
}

impl SearchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 3, min_delay_ms: 200, max_delay_ms: 2000 }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[serde(rename = "openai")]
    OpenAI,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub base_url: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            model: "text-embedding-3-large".into(),
            dimension: 3072,
            base_url: "https://api.openai.com/v1".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningProvider {
    #[serde(rename = "openai")]
    OpenAI,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReasoningSettings {
    pub provider: ReasoningProvider,
    pub model: String,
    pub base_url: String,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            provider: ReasoningProvider::OpenAI,
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringBackend {
    Llm,
    Lexical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusteringSettings {
    pub backend: ClusteringBackend,
    /// Minimum narrative overlap for the lexical backend.
    pub threshold: f32,
    /// Passage text sent to the model is cut to this many characters.
    pub max_text_chars: usize,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self { backend: ClusteringBackend::Llm, threshold: 0.35, max_text_chars: 500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistrySettings {
    pub refresh_secs: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self { refresh_secs: 300 }
    }
}

impl RegistrySettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
