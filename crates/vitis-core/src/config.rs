//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_LLM__MODEL`). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a base dir.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Defaults overlaid with an inline TOML document. Used by tests and tools.
    pub fn from_toml_str(toml: &str) -> Self {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml));
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed, validated view of the whole configuration.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub retrieval: RetrievalSettings,
    pub embed: EmbedSettings,
    pub llm: LlmSettings,
    pub chat: ChatSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        self.retrieval.validate()?;
        let t = self.chat.image_confidence_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(Error::InvalidConfig(format!("chat.image_confidence_threshold must be in [0, 1], got {t}")));
        }
        if self.llm.max_attempts == 0 {
            return Err(Error::InvalidConfig("llm.max_attempts must be at least 1".into()));
        }
        if self.data.table_name.trim().is_empty() {
            return Err(Error::InvalidConfig("data.table_name must not be empty".into()));
        }
        Ok(())
    }
}

/// Where the knowledge base and the two persisted indexes live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub kb_dir: String,
    pub vector_dir: String,
    pub lexical_dir: String,
    pub table_name: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            kb_dir: "data/kb".to_string(),
            vector_dir: "data/indexes/lancedb".to_string(),
            lexical_dir: "data/indexes/tantivy".to_string(),
            table_name: "grape_vector_store".to_string(),
        }
    }
}

impl DataSettings {
    pub fn kb_path(&self) -> PathBuf { expand_path(&self.kb_dir) }
    pub fn vector_path(&self) -> PathBuf { expand_path(&self.vector_dir) }
    pub fn lexical_path(&self) -> PathBuf { expand_path(&self.lexical_dir) }
}

/// Fusion parameters. The weight pair is a tunable, not a law: earlier
/// deployments ran 0.7/0.3 and 0.5/0.5.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k_vector: usize,
    pub k_lexical: usize,
    pub weight_vector: f32,
    pub weight_lexical: f32,
    /// Smoothing constant `c` in `w / (rank + c)`; 0 gives plain reciprocal rank.
    pub rank_constant: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k_vector: 5, k_lexical: 8, weight_vector: 0.8, weight_lexical: 0.2, rank_constant: 60.0 }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> Result<(), Error> {
        let (wv, wl) = (self.weight_vector, self.weight_lexical);
        if !wv.is_finite() || !wl.is_finite() || wv < 0.0 || wl < 0.0 {
            return Err(Error::InvalidConfig(format!("fusion weights must be finite and non-negative, got {wv}/{wl}")));
        }
        if wv + wl <= 0.0 {
            return Err(Error::InvalidConfig("fusion weights must not both be zero".into()));
        }
        if !self.rank_constant.is_finite() || self.rank_constant < 0.0 {
            return Err(Error::InvalidConfig(format!("retrieval.rank_constant must be >= 0, got {}", self.rank_constant)));
        }
        if self.k_vector == 0 || self.k_lexical == 0 {
            return Err(Error::InvalidConfig("retrieval.k_vector and retrieval.k_lexical must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSettings {
    /// Directory holding `tokenizer.json`, `config.json` and the weights.
    pub model_dir: Option<String>,
    pub max_len: usize,
}

impl Default for EmbedSettings {
    fn default() -> Self { Self { model_dir: None, max_len: 256 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable that holds the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub temperature: Option<f32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            timeout_secs: 30,
            max_attempts: 2,
            backoff_ms: 500,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Classifier confidence above which an image result triggers RAG.
    pub image_confidence_threshold: f32,
}

impl Default for ChatSettings {
    fn default() -> Self { Self { image_confidence_threshold: 0.45 } }
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
