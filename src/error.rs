//! Error types for the snippetd service.
//!
//! Domain-specific enums (`EmbeddingError`, `StoreError`, `LlmError`) fold
//! into the crate-level [`Error`] via `From`. Handlers at the API boundary
//! convert these into structured error responses; core code propagates them
//! with `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for all service operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the embedding provider and its backends.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// `embed` was called before `initialize` completed.
    #[error("embedding service not initialized")]
    Uninitialized,

    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    /// The remote embedding API or local model failed to produce a vector.
    #[error("embedding generation failed: {0}")]
    Upstream(String),

    #[error("embedding task failed: {0}")]
    TaskJoin(String),
}

/// Errors from the external search engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("search engine request failed: {0}")]
    Request(String),

    #[error("search engine returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("unexpected search engine response: {0}")]
    BadResponse(String),
}

/// Errors from the answer-generation providers.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("chat completion failed: {0}")]
    Completion(String),

    #[error("unexpected completion response: {0}")]
    BadResponse(String),
}
