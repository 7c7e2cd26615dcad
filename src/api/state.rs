//! Shared state for the HTTP API.

use crate::chat::ChatOrchestrator;
use crate::embedding::EmbeddingCache;
use crate::index::SnippetIndexer;
use crate::search::HybridSearcher;
use crate::store::SearchStore;
use std::sync::Arc;

/// State shared across all API handlers. Built once at startup, after every
/// collaborator has initialized successfully (fail-fast: no listener is
/// bound otherwise).
pub struct ApiState {
    /// Bearer token expected on authenticated routes.
    pub api_key: String,
    pub require_auth: bool,
    pub embedder: Arc<EmbeddingCache>,
    pub store: Arc<dyn SearchStore>,
    pub searcher: HybridSearcher,
    pub indexer: Arc<SnippetIndexer>,
    pub chat: ChatOrchestrator,
}
