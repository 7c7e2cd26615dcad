//! Mock-backed state for handler and router tests.

use super::state::ApiState;
use crate::chat::ChatOrchestrator;
use crate::chat::generator::mock::MockGenerator;
use crate::config::CacheConfig;
use crate::embedding::EmbeddingCache;
use crate::embedding::mock::MockEmbedder;
use crate::index::SnippetIndexer;
use crate::search::HybridSearcher;
use crate::store::SearchStore;
use crate::store::mock::MockStore;
use std::sync::Arc;

pub(super) const TEST_API_KEY: &str = "test-token";

/// Full `ApiState` over mock collaborators, with auth enabled and
/// [`TEST_API_KEY`] as the expected bearer token.
pub(super) fn test_state() -> Arc<ApiState> {
    let embedder = Arc::new(EmbeddingCache::new(
        Arc::new(MockEmbedder::new()),
        &CacheConfig::default(),
    ));
    let store: Arc<dyn SearchStore> = Arc::new(MockStore::new());

    let searcher = HybridSearcher::new(store.clone(), embedder.clone());
    let indexer = Arc::new(SnippetIndexer::new(embedder.clone(), store.clone()));
    let chat = ChatOrchestrator::new(
        embedder.clone(),
        store.clone(),
        Arc::new(MockGenerator::answering("canned answer")),
        "You are a snippet assistant.".to_string(),
        5,
    );

    Arc::new(ApiState {
        api_key: TEST_API_KEY.to_string(),
        require_auth: true,
        embedder,
        store,
        searcher,
        indexer,
        chat,
    })
}
