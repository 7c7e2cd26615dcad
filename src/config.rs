//! Service configuration.
//!
//! Settings layer three sources, later ones winning: serde defaults, an
//! optional TOML file, and `SNIPPETD_`-prefixed environment variables
//! (double-underscore separated, e.g. `SNIPPETD_STORE__HOST`).

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Top-level service settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address the HTTP server binds to.
    pub bind: SocketAddr,
    /// Bearer token expected on authenticated routes.
    pub api_key: String,
    /// When false, all routes are open (local development).
    pub require_auth: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".parse().expect("static bind address"),
            api_key: String::new(),
            require_auth: true,
        }
    }
}

/// Connection settings for the external search engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub api_key: String,
    /// Collection holding the embedded snippets.
    pub collection: String,
    pub connection_timeout_secs: u64,
}

impl StoreConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8108,
            protocol: "http".to_string(),
            api_key: "xyz".to_string(),
            collection: "snippets".to_string(),
            connection_timeout_secs: 10,
        }
    }
}

/// Embedding backend selection and cache bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Vector length; must match what the backend produces and what the
    /// store schema declares.
    pub dimension: usize,
    /// Use the remote OpenAI embeddings API instead of the local model.
    pub use_openai: bool,
    pub openai_api_key: String,
    pub openai_model: String,
    /// Where the local model files are downloaded to.
    pub model_cache_dir: String,
    /// Tag recorded alongside every stored vector.
    pub model_version: String,
    pub cache: CacheConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            use_openai: false,
            openai_api_key: String::new(),
            openai_model: "text-embedding-ada-002".to_string(),
            model_cache_dir: ".fastembed_cache".to_string(),
            model_version: "v1.0".to_string(),
            cache: CacheConfig::default(),
        }
    }
}

/// Embedding cache bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
        }
    }
}

/// Answer-generation providers for the chat endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub openai_api_key: String,
    pub openai_model: String,
    /// Optional fallback provider; empty key disables the fallback.
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Number of context passages retrieved per chat request.
    pub default_k: usize,
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".to_string(),
            temperature: 0.2,
            max_tokens: 512,
            default_k: 5,
            system_prompt: "You are a helpful assistant. Answer the user's \
                            question using only the provided context snippets. \
                            If the context does not contain the answer, say so."
                .to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file plus environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let merged = builder
            .add_source(config::Environment::with_prefix("SNIPPETD").separator("__"))
            .build()?;

        Ok(merged.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;

    #[test]
    fn defaults_are_complete_without_a_file() {
        let settings = Settings::load(None).expect("load defaults");
        assert_eq!(settings.store.collection, "snippets");
        assert_eq!(settings.embedding.dimension, 384);
        assert_eq!(settings.embedding.cache.max_entries, 1000);
        assert!(settings.api.require_auth);
        assert_eq!(settings.llm.default_k, 5);
    }

    #[test]
    fn store_base_url_joins_protocol_host_port() {
        let settings = Settings::default();
        assert_eq!(settings.store.base_url(), "http://localhost:8108");
    }
}
