//! Search handlers.

use super::server::ApiError;
use super::state::ApiState;
use crate::embedding::TextEmbedder;
use crate::search::{SearchMode, SearchRequest, SearchResponse};
use crate::store::SearchFilters;
use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub(super) struct SearchModeQuery {
    #[serde(default)]
    mode: SearchMode,
}

fn default_limit() -> usize {
    10
}

fn default_published_only() -> bool {
    true
}

#[derive(Deserialize)]
pub(super) struct SearchApiRequest {
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    snippet_type: Option<String>,
    #[serde(default = "default_published_only")]
    published_only: bool,
    #[serde(default)]
    category_ids: Vec<i64>,
}

pub(super) async fn search_snippets(
    State(state): State<Arc<ApiState>>,
    Query(mode): Query<SearchModeQuery>,
    Json(request): Json<SearchApiRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let parsed = SearchRequest {
        query: request.query,
        limit: request.limit,
        filters: SearchFilters {
            snippet_type: request.snippet_type,
            published_only: request.published_only,
            category_ids: request.category_ids,
        },
    };

    let response = state
        .searcher
        .search(&parsed, mode.mode)
        .await
        .map_err(|error| {
            tracing::error!(%error, "search failed");
            ApiError::internal(error)
        })?;

    Ok(Json(response))
}

pub(super) async fn search_stats(
    State(state): State<Arc<ApiState>>,
) -> Json<serde_json::Value> {
    let cache_stats = state.embedder.stats();
    let store_up = state.store.health().await;

    Json(serde_json::json!({
        "embedding_cache": cache_stats,
        "store_status": if store_up { "healthy" } else { "unhealthy" },
        "model_version": state.embedder.model_version(),
    }))
}
