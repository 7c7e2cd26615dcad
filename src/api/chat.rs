//! Chat handler.

use super::server::ApiError;
use super::state::ApiState;
use crate::models::ChatTurn;
use crate::store::{SearchFilters, StoreDocument};
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_snippet_type() -> Option<String> {
    Some("faq".to_string())
}

#[derive(Deserialize)]
pub(super) struct ChatApiRequest {
    query: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
    #[serde(default = "default_snippet_type")]
    snippet_type: Option<String>,
    #[serde(default)]
    category_ids: Vec<i64>,
}

#[derive(Serialize)]
pub(super) struct ChatApiResponse {
    answer: String,
    contexts: Vec<String>,
    docs: Vec<StoreDocument>,
}

pub(super) async fn chat(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ChatApiRequest>,
) -> Result<Json<ChatApiResponse>, ApiError> {
    let filters = SearchFilters {
        snippet_type: request.snippet_type,
        published_only: false,
        category_ids: request.category_ids,
    };

    let reply = state
        .chat
        .chat(&request.query, &request.history, &filters)
        .await
        .map_err(|error| {
            tracing::error!(%error, "chat request failed");
            ApiError::internal(error)
        })?;

    Ok(Json(ChatApiResponse {
        answer: reply.answer,
        contexts: reply.contexts,
        docs: reply.docs,
    }))
}
