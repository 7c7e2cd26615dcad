//! Embedding generation: a provider with pluggable local/remote backends.
//!
//! The local backend runs fastembed behind `spawn_blocking` so CPU-bound
//! encoding never stalls the async runtime. The remote backend calls the
//! OpenAI embeddings API. Backend selection happens once, at startup.

pub mod cache;

use crate::config::EmbeddingConfig;
use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub use cache::{CacheStats, EmbeddingCache};

/// Anything that can turn text into a fixed-length vector.
///
/// Implemented by [`EmbeddingProvider`] and by [`EmbeddingCache`] (which
/// wraps another embedder), so orchestrators depend only on this trait.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Tag of the model producing the vectors.
    fn model_version(&self) -> &str;

    /// Whether initialization has completed.
    fn is_ready(&self) -> bool;
}

enum Backend {
    Local(LocalBackend),
    OpenAi(OpenAiBackend),
}

/// Embedding provider. Constructed unloaded; [`initialize`] must complete
/// before the first `embed` call or callers get
/// [`EmbeddingError::Uninitialized`].
///
/// [`initialize`]: EmbeddingProvider::initialize
pub struct EmbeddingProvider {
    config: EmbeddingConfig,
    backend: Option<Backend>,
}

impl EmbeddingProvider {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            backend: None,
        }
    }

    /// One-time backend setup. Idempotent; a second call is a no-op.
    ///
    /// Loading the local model is dispatched to the blocking pool — model
    /// download + ONNX session construction can take seconds.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.backend.is_some() {
            return Ok(());
        }

        let backend = if self.config.use_openai {
            tracing::info!(model = %self.config.openai_model, "using OpenAI embeddings");
            Backend::OpenAi(OpenAiBackend::new(&self.config))
        } else {
            tracing::info!(cache_dir = %self.config.model_cache_dir, "loading local embedding model");
            Backend::Local(LocalBackend::load(&self.config).await?)
        };

        self.backend = Some(backend);
        tracing::info!("embedding provider initialized");
        Ok(())
    }
}

#[async_trait]
impl TextEmbedder for EmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let backend = self.backend.as_ref().ok_or(EmbeddingError::Uninitialized)?;

        match backend {
            Backend::Local(local) => local.embed(text).await,
            Backend::OpenAi(remote) => remote.embed(text).await,
        }
    }

    fn model_version(&self) -> &str {
        &self.config.model_version
    }

    fn is_ready(&self) -> bool {
        self.backend.is_some()
    }
}

/// Local fastembed model.
///
/// fastembed's `TextEmbedding` is held behind an `Arc` and called via
/// `spawn_blocking` from async contexts.
struct LocalBackend {
    model: Arc<fastembed::TextEmbedding>,
}

impl LocalBackend {
    async fn load(config: &EmbeddingConfig) -> Result<Self> {
        let options = fastembed::InitOptions::default()
            .with_cache_dir(config.model_cache_dir.clone().into())
            .with_show_download_progress(true);

        let model = tokio::task::spawn_blocking(move || fastembed::TextEmbedding::try_new(options))
            .await
            .map_err(|e| EmbeddingError::TaskJoin(e.to_string()))?
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_string();
        let model = self.model.clone();

        let mut embeddings = tokio::task::spawn_blocking(move || {
            model
                .embed(vec![text], None)
                .map_err(|e| EmbeddingError::Upstream(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::TaskJoin(e.to_string()))??;

        if embeddings.is_empty() {
            return Err(EmbeddingError::Upstream("model returned no vectors".to_string()).into());
        }
        Ok(embeddings.remove(0))
    }
}

/// Remote embeddings over the OpenAI API.
struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingItem>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingItem {
    embedding: Vec<f32>,
}

impl OpenAiBackend {
    fn new(config: &EmbeddingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .http
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&json!({ "input": text, "model": self.model }))
            .send()
            .await
            .map_err(|e| EmbeddingError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Upstream(format!("{status}: {body}")).into());
        }

        let parsed: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Upstream(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| EmbeddingError::Upstream("empty embedding response".to_string()).into())
    }
}
