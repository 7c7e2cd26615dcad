//! Embedding and indexing handlers.

use super::server::ApiError;
use super::state::ApiState;
use crate::embedding::TextEmbedder;
use crate::index::SYNC_BATCH_LIMIT;
use crate::models::Snippet;
use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

// -- /embed --

#[derive(Deserialize)]
pub(super) struct EmbedRequest {
    text: String,
}

#[derive(Serialize)]
pub(super) struct EmbedResponse {
    embedding: Vec<f32>,
    model_version: String,
    processing_time_ms: f64,
}

pub(super) async fn embed(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let started = Instant::now();

    let embedding = state.embedder.embed(&request.text).await.map_err(|error| {
        tracing::error!(%error, "embedding generation failed");
        ApiError::internal(error)
    })?;

    Ok(Json(EmbedResponse {
        embedding,
        model_version: state.embedder.model_version().to_string(),
        processing_time_ms: elapsed_ms(started),
    }))
}

// -- /index --

#[derive(Deserialize)]
pub(super) struct IndexRequest {
    snippet: Snippet,
}

#[derive(Serialize)]
pub(super) struct IndexResponse {
    success: bool,
    snippet_id: String,
    message: String,
    processing_time_ms: f64,
}

pub(super) async fn index_snippet(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<IndexRequest>,
) -> Result<Json<IndexResponse>, ApiError> {
    let started = Instant::now();
    let snippet_id = request.snippet.id.clone();

    let success = state
        .indexer
        .index_one(&request.snippet)
        .await
        .map_err(|error| {
            tracing::error!(snippet_id = %snippet_id, %error, "indexing failed");
            ApiError::internal(error)
        })?;

    Ok(Json(IndexResponse {
        success,
        snippet_id,
        message: if success {
            "Successfully indexed".to_string()
        } else {
            "Failed to index".to_string()
        },
        processing_time_ms: elapsed_ms(started),
    }))
}

// -- /batch-index --

fn default_batch_size() -> usize {
    10
}

#[derive(Deserialize)]
pub(super) struct BatchIndexRequest {
    snippets: Vec<Snippet>,
    #[serde(default = "default_batch_size")]
    batch_size: usize,
}

#[derive(Serialize)]
pub(super) struct BatchIndexResponse {
    success: bool,
    total_processed: usize,
    successful: usize,
    failed: usize,
    errors: Vec<String>,
    processing_time_ms: f64,
    /// Present only for batches handed to the background path.
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<Uuid>,
}

pub(super) async fn batch_index(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<BatchIndexRequest>,
) -> Json<BatchIndexResponse> {
    let started = Instant::now();

    if request.snippets.len() <= SYNC_BATCH_LIMIT {
        let outcome = state.indexer.index_batch_sync(&request.snippets).await;

        return Json(BatchIndexResponse {
            success: outcome.failed == 0,
            total_processed: outcome.total_processed,
            successful: outcome.successful,
            failed: outcome.failed,
            errors: outcome.errors,
            processing_time_ms: elapsed_ms(started),
            job_id: None,
        });
    }

    // Large batch: ack immediately, process in the background. Totals land
    // in the job registry and the logs.
    let total = request.snippets.len();
    let (job_id, _handle) = state
        .indexer
        .spawn_background_batch(request.snippets, request.batch_size);

    Json(BatchIndexResponse {
        success: true,
        total_processed: total,
        successful: 0,
        failed: 0,
        errors: Vec::new(),
        processing_time_ms: elapsed_ms(started),
        job_id: Some(job_id),
    })
}

// -- /batch-jobs/{id} --

#[derive(Serialize)]
pub(super) struct BatchJobResponse {
    job_id: Uuid,
    state: crate::index::JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<crate::index::BatchOutcome>,
}

pub(super) async fn batch_job_status(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchJobResponse>, ApiError> {
    let job = state
        .indexer
        .jobs()
        .get(&id)
        .ok_or_else(|| ApiError::not_found(format!("unknown batch job {id}")))?;

    Ok(Json(BatchJobResponse {
        job_id: id,
        state: job.state,
        outcome: job.outcome,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::testutil::test_state;
    use super::{BatchIndexRequest, batch_index};
    use crate::models::Snippet;
    use axum::Json;
    use axum::extract::State;

    fn snippets(count: usize) -> Vec<Snippet> {
        (0..count)
            .map(|i| Snippet {
                id: format!("s{i}"),
                title: format!("Title {i}"),
                description: format!("Description {i}"),
                created_on: chrono::Utc::now(),
                snippet_type: "faq".to_string(),
                published: true,
                category_ids: Vec::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn small_batch_completes_inline_without_a_job_handle() {
        let state = test_state();
        let request = BatchIndexRequest {
            snippets: snippets(5),
            batch_size: 10,
        };

        let Json(response) = batch_index(State(state), Json(request)).await;

        assert!(response.success);
        assert_eq!(response.total_processed, 5);
        assert_eq!(response.successful, 5);
        assert_eq!(response.failed, 0);
        assert!(response.job_id.is_none());
    }

    #[tokio::test]
    async fn large_batch_acks_immediately_with_zero_counts_and_a_job_id() {
        let state = test_state();
        let request = BatchIndexRequest {
            snippets: snippets(6),
            batch_size: 10,
        };

        let Json(response) = batch_index(State(state.clone()), Json(request)).await;

        // The ack reports the submitted total with zero successes/failures;
        // real counts land in the job registry once processing finishes.
        assert!(response.success);
        assert_eq!(response.total_processed, 6);
        assert_eq!(response.successful, 0);
        assert_eq!(response.failed, 0);
        assert!(response.errors.is_empty());

        let job_id = response.job_id.expect("async ack carries a job id");
        assert!(state.indexer.jobs().get(&job_id).is_some());
    }
}
