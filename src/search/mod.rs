//! Hybrid search orchestration.
//!
//! A single logical query fans out to at most two underlying engine calls
//! (lexical, vector). Hybrid mode runs lexical first and only pays for the
//! vector call when lexical alone cannot fill the requested limit; merged
//! results are deduplicated by id with lexical occurrences winning.

use crate::embedding::TextEmbedder;
use crate::error::Result;
use crate::store::{ResultSet, SearchFilters, SearchStore, StoreDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Provenance tags reported in `query_by`.
const QUERY_BY_TEXT: &str = "title,description";
const QUERY_BY_VECTOR: &str = "vector_similarity";
const QUERY_BY_HYBRID: &str = "hybrid_text_vector";

/// Which underlying queries a search request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Text,
    Vector,
    #[default]
    Hybrid,
}

/// A parsed search request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub filters: SearchFilters,
}

/// Which underlying query produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Text,
    Vector,
}

/// One hit in relevance order.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub document: StoreDocument,
    pub source: SearchSource,
}

/// The unified response across all modes.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total_found: usize,
    /// Cumulative wall time of the underlying engine calls, not of the
    /// orchestration itself.
    pub search_time_ms: f64,
    pub query_by: String,
}

/// Runs text/vector/hybrid searches over the store and embedder.
pub struct HybridSearcher {
    store: Arc<dyn SearchStore>,
    embedder: Arc<dyn TextEmbedder>,
}

impl HybridSearcher {
    pub fn new(store: Arc<dyn SearchStore>, embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { store, embedder }
    }

    pub async fn search(&self, request: &SearchRequest, mode: SearchMode) -> Result<SearchResponse> {
        match mode {
            SearchMode::Text => {
                let lexical = self
                    .store
                    .lexical_search(&request.query, &request.filters, request.limit)
                    .await?;
                Ok(single_source_response(
                    lexical,
                    SearchSource::Text,
                    QUERY_BY_TEXT,
                ))
            }
            SearchMode::Vector => {
                let vector = self.embedder.embed(&request.query).await?;
                let results = self
                    .store
                    .vector_search(&vector, &request.filters, request.limit)
                    .await?;
                Ok(single_source_response(
                    results,
                    SearchSource::Vector,
                    QUERY_BY_VECTOR,
                ))
            }
            SearchMode::Hybrid => self.hybrid_search(request).await,
        }
    }

    /// Lexical first; the vector call is skipped entirely when lexical
    /// already satisfies the limit. Otherwise results are merged
    /// lexical-first and deduplicated by id.
    async fn hybrid_search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let lexical = self
            .store
            .lexical_search(&request.query, &request.filters, request.limit)
            .await?;

        // Cost-saving short circuit, not a quality judgment.
        if lexical.found >= request.limit {
            return Ok(single_source_response(
                lexical,
                SearchSource::Text,
                QUERY_BY_TEXT,
            ));
        }

        let query_vector = self.embedder.embed(&request.query).await?;
        let vector = self
            .store
            .vector_search(&query_vector, &request.filters, request.limit)
            .await?;

        let search_time_ms = lexical.took_ms + vector.took_ms;

        let mut seen: HashSet<String> = HashSet::new();
        let mut results = Vec::new();

        let tagged = lexical
            .hits
            .into_iter()
            .map(|doc| (doc, SearchSource::Text))
            .chain(vector.hits.into_iter().map(|doc| (doc, SearchSource::Vector)));

        // Lexical-first ordering is the fixed tie-break: for any id present
        // in both sources the lexical occurrence is retained.
        for (document, source) in tagged {
            if !seen.insert(document.id.clone()) {
                continue;
            }
            results.push(SearchResult { document, source });
            if results.len() >= request.limit {
                break;
            }
        }

        Ok(SearchResponse {
            total_found: results.len(),
            results,
            search_time_ms,
            query_by: QUERY_BY_HYBRID.to_string(),
        })
    }
}

fn single_source_response(
    results: ResultSet,
    source: SearchSource,
    query_by: &str,
) -> SearchResponse {
    SearchResponse {
        results: results
            .hits
            .into_iter()
            .map(|document| SearchResult { document, source })
            .collect(),
        total_found: results.found,
        search_time_ms: results.took_ms,
        query_by: query_by.to_string(),
    }
}
