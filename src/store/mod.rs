//! Search store boundary: the trait orchestrators talk to, plus the result
//! shapes coming back from the engine.
//!
//! The engine itself (schema storage, lexical ranking, nearest-neighbor
//! index) is an external collaborator reached over its query-and-document
//! API; see [`typesense::TypesenseClient`].

pub mod typesense;

use crate::error::Result;
use crate::models::{ChatTurn, EmbeddedSnippet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use typesense::TypesenseClient;

/// Equality/set-membership filters shared by every search kind.
///
/// Composition rule: all clauses AND together; category ids form an OR-group
/// that is itself ANDed with the rest.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub snippet_type: Option<String>,
    pub published_only: bool,
    pub category_ids: Vec<i64>,
}

/// A stored document as returned by the engine. The embedding vector is
/// elided from results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_on: i64,
    pub snippet_type: String,
    pub published: bool,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    #[serde(default)]
    pub model_version: String,
}

/// One underlying query's results plus its measured wall time.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub hits: Vec<StoreDocument>,
    /// The engine's total match count, which can exceed `hits.len()`.
    pub found: usize,
    pub took_ms: f64,
}

/// Output of the engine's retrieval-augmented query capability.
#[derive(Debug, Clone, Default)]
pub struct RagRetrieval {
    pub contexts: Vec<String>,
    pub docs: Vec<StoreDocument>,
}

/// Adapter to the external document/vector search engine.
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Create-if-absent of the target collection. Safe to call concurrently;
    /// an "already exists" response from the engine counts as success.
    async fn ensure_schema(&self) -> Result<()>;

    /// Replace-or-insert by id. Never propagates errors past this boundary:
    /// failures are logged with the snippet id and reported as `false`.
    async fn upsert(&self, snippet: &EmbeddedSnippet) -> bool;

    /// Token-based relevance search over title/description.
    async fn lexical_search(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<ResultSet>;

    /// Nearest-neighbor search over the embedding field.
    async fn vector_search(
        &self,
        vector: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<ResultSet>;

    /// Idempotent removal by id.
    async fn delete(&self, id: &str) -> bool;

    /// Engine liveness probe.
    async fn health(&self) -> bool;

    /// The engine's conversational retrieval call: returns extracted context
    /// passages and top documents for a query + history.
    async fn retrieve_contexts(
        &self,
        query: &str,
        vector: &[f32],
        history: &[ChatTurn],
        filters: &SearchFilters,
        k: usize,
    ) -> Result<RagRetrieval>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::{RagRetrieval, ResultSet, SearchFilters, SearchStore, StoreDocument};
    use crate::error::Result;
    use crate::models::{ChatTurn, EmbeddedSnippet};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub fn doc(id: &str, title: &str) -> StoreDocument {
        StoreDocument {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("{title} description"),
            created_on: 1_700_000_000,
            snippet_type: "faq".to_string(),
            published: true,
            category_ids: Vec::new(),
            model_version: "v1.0".to_string(),
        }
    }

    /// Canned-response store with call counters, for orchestrator tests.
    pub struct MockStore {
        pub lexical_hits: Vec<StoreDocument>,
        /// Overrides the engine-reported total; defaults to `lexical_hits.len()`.
        pub lexical_found: Option<usize>,
        pub vector_hits: Vec<StoreDocument>,
        pub lexical_calls: AtomicUsize,
        pub vector_calls: AtomicUsize,
        pub upsert_calls: AtomicUsize,
        /// Snippet ids whose upsert reports failure.
        pub fail_upsert_ids: Vec<String>,
        pub upserted_ids: Mutex<Vec<String>>,
        pub retrieval: RagRetrieval,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self {
                lexical_hits: Vec::new(),
                lexical_found: None,
                vector_hits: Vec::new(),
                lexical_calls: AtomicUsize::new(0),
                vector_calls: AtomicUsize::new(0),
                upsert_calls: AtomicUsize::new(0),
                fail_upsert_ids: Vec::new(),
                upserted_ids: Mutex::new(Vec::new()),
                retrieval: RagRetrieval::default(),
            }
        }
    }

    #[async_trait]
    impl SearchStore for MockStore {
        async fn ensure_schema(&self) -> Result<()> {
            Ok(())
        }

        async fn upsert(&self, snippet: &EmbeddedSnippet) -> bool {
            self.upsert_calls.fetch_add(1, Ordering::SeqCst);
            self.upserted_ids
                .lock()
                .expect("upserted_ids lock")
                .push(snippet.snippet.id.clone());
            !self.fail_upsert_ids.contains(&snippet.snippet.id)
        }

        async fn lexical_search(
            &self,
            _query: &str,
            _filters: &SearchFilters,
            _limit: usize,
        ) -> Result<ResultSet> {
            self.lexical_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ResultSet {
                hits: self.lexical_hits.clone(),
                found: self.lexical_found.unwrap_or(self.lexical_hits.len()),
                took_ms: 3.0,
            })
        }

        async fn vector_search(
            &self,
            _vector: &[f32],
            _filters: &SearchFilters,
            _limit: usize,
        ) -> Result<ResultSet> {
            self.vector_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ResultSet {
                hits: self.vector_hits.clone(),
                found: self.vector_hits.len(),
                took_ms: 5.0,
            })
        }

        async fn delete(&self, _id: &str) -> bool {
            true
        }

        async fn health(&self) -> bool {
            true
        }

        async fn retrieve_contexts(
            &self,
            _query: &str,
            _vector: &[f32],
            _history: &[ChatTurn],
            _filters: &SearchFilters,
            _k: usize,
        ) -> Result<RagRetrieval> {
            Ok(self.retrieval.clone())
        }
    }
}
