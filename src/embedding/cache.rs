//! Bounded, text-keyed memoization layer over an embedder.
//!
//! Keys are the exact input string — no normalization, so callers relying on
//! near-duplicate hits will miss. The cache is process-local, non-persistent,
//! and safe to share across concurrent requests.

use crate::embedding::TextEmbedder;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Introspection snapshot for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: u64,
    pub enabled: bool,
}

/// Get-or-compute wrapper around an inner embedder.
///
/// Bounded by entry count via moka; eviction keeps the cache at or below
/// `max_entries`. When disabled by configuration every call passes straight
/// through to the inner embedder.
pub struct EmbeddingCache {
    inner: Arc<dyn TextEmbedder>,
    cache: Option<moka::sync::Cache<String, Arc<Vec<f32>>>>,
}

impl EmbeddingCache {
    pub fn new(inner: Arc<dyn TextEmbedder>, config: &crate::config::CacheConfig) -> Self {
        let cache = config
            .enabled
            .then(|| moka::sync::Cache::new(config.max_entries));

        Self { inner, cache }
    }

    pub fn stats(&self) -> CacheStats {
        match &self.cache {
            Some(cache) => {
                // Flush pending maintenance so entry_count is accurate.
                cache.run_pending_tasks();
                CacheStats {
                    size: cache.entry_count(),
                    enabled: true,
                }
            }
            None => CacheStats {
                size: 0,
                enabled: false,
            },
        }
    }
}

#[async_trait]
impl TextEmbedder for EmbeddingCache {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let Some(cache) = &self.cache else {
            return self.inner.embed(text).await;
        };

        if let Some(hit) = cache.get(text) {
            tracing::debug!("embedding cache hit");
            return Ok((*hit).clone());
        }

        let embedding = self.inner.embed(text).await?;
        cache.insert(text.to_string(), Arc::new(embedding.clone()));
        Ok(embedding)
    }

    fn model_version(&self) -> &str {
        self.inner.model_version()
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }
}
