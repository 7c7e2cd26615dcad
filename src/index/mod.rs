//! Indexing orchestration: embed-then-upsert per snippet, with a sync path
//! for small batches and a background path for large ones.
//!
//! Small batches (≤ [`SYNC_BATCH_LIMIT`] items) complete before the caller
//! gets a response; larger batches are acked immediately and processed in
//! chunks, items within a chunk concurrently and chunks strictly in order.
//! One item's failure never aborts its siblings or later chunks.

use crate::embedding::TextEmbedder;
use crate::error::Result;
use crate::models::{EmbeddedSnippet, Snippet};
use crate::store::SearchStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Largest batch processed synchronously. External contract: callers and
/// tests depend on batches of up to five items completing inline.
pub const SYNC_BATCH_LIMIT: usize = 5;

/// Aggregate accounting over one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    /// One human-readable message per failure, in processing order within
    /// each chunk.
    pub errors: Vec<String>,
}

/// Lifecycle of a background batch job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Finished,
}

/// Status-lookup record for a background batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchJob {
    pub state: JobState,
    pub outcome: Option<BatchOutcome>,
}

/// In-process registry of background batch jobs, keyed by job id.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, BatchJob>>,
}

impl JobRegistry {
    fn start(&self, id: Uuid) {
        self.jobs.lock().expect("job registry lock").insert(
            id,
            BatchJob {
                state: JobState::Running,
                outcome: None,
            },
        );
    }

    fn finish(&self, id: Uuid, outcome: BatchOutcome) {
        self.jobs.lock().expect("job registry lock").insert(
            id,
            BatchJob {
                state: JobState::Finished,
                outcome: Some(outcome),
            },
        );
    }

    pub fn get(&self, id: &Uuid) -> Option<BatchJob> {
        self.jobs.lock().expect("job registry lock").get(id).cloned()
    }
}

/// Embeds snippets and upserts them into the store.
pub struct SnippetIndexer {
    embedder: Arc<dyn TextEmbedder>,
    store: Arc<dyn SearchStore>,
    jobs: JobRegistry,
}

impl SnippetIndexer {
    pub fn new(embedder: Arc<dyn TextEmbedder>, store: Arc<dyn SearchStore>) -> Self {
        Self {
            embedder,
            store,
            jobs: JobRegistry::default(),
        }
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Embed one snippet and upsert it. `Ok(false)` means the store
    /// rejected the upsert; `Err` means embedding (or another step before
    /// the store boundary) failed.
    pub async fn index_one(&self, snippet: &Snippet) -> Result<bool> {
        let embedding = self.embedder.embed(&snippet.embed_text()).await?;
        let embedded = EmbeddedSnippet {
            snippet: snippet.clone(),
            embedding,
            model_version: self.embedder.model_version().to_string(),
        };
        Ok(self.store.upsert(&embedded).await)
    }

    /// Process a small batch inline, item by item in input order.
    pub async fn index_batch_sync(&self, snippets: &[Snippet]) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            total_processed: snippets.len(),
            ..BatchOutcome::default()
        };

        for snippet in snippets {
            match self.index_one(snippet).await {
                Ok(true) => outcome.successful += 1,
                Ok(false) => {
                    outcome.failed += 1;
                    outcome
                        .errors
                        .push(format!("Failed to index snippet {}", snippet.id));
                }
                Err(error) => {
                    outcome.failed += 1;
                    outcome
                        .errors
                        .push(format!("Error processing snippet {}: {error}", snippet.id));
                }
            }
        }

        outcome
    }

    /// Kick off background processing for a large batch. Returns the job id
    /// for status lookup and the task handle (the API layer drops it; tests
    /// await it).
    pub fn spawn_background_batch(
        self: &Arc<Self>,
        snippets: Vec<Snippet>,
        chunk_size: usize,
    ) -> (Uuid, tokio::task::JoinHandle<()>) {
        let job_id = Uuid::new_v4();
        self.jobs.start(job_id);

        let indexer = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let outcome = indexer.process_chunks(&snippets, chunk_size).await;
            tracing::info!(
                %job_id,
                successful = outcome.successful,
                failed = outcome.failed,
                "batch indexing completed"
            );
            indexer.jobs.finish(job_id, outcome);
        });

        (job_id, handle)
    }

    /// Chunked fan-out: items within a chunk run concurrently behind a
    /// gather barrier; chunk N+1 starts only after chunk N fully resolves.
    async fn process_chunks(&self, snippets: &[Snippet], chunk_size: usize) -> BatchOutcome {
        let chunk_size = chunk_size.max(1);
        let mut outcome = BatchOutcome {
            total_processed: snippets.len(),
            ..BatchOutcome::default()
        };

        for chunk in snippets.chunks(chunk_size) {
            let results =
                futures::future::join_all(chunk.iter().map(|snippet| self.index_one(snippet)))
                    .await;

            for (snippet, result) in chunk.iter().zip(results) {
                match result {
                    Ok(true) => outcome.successful += 1,
                    Ok(false) => {
                        outcome.failed += 1;
                        outcome
                            .errors
                            .push(format!("Failed to index snippet {}", snippet.id));
                    }
                    Err(error) => {
                        tracing::error!(snippet_id = %snippet.id, %error, "failed to process snippet");
                        outcome.failed += 1;
                        outcome
                            .errors
                            .push(format!("Error processing snippet {}: {error}", snippet.id));
                    }
                }
            }
        }

        outcome
    }
}
