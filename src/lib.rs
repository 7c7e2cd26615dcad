//! snippetd: embedding generation, hybrid snippet search, and RAG chat.
//!
//! Core pieces: an embedding provider with pluggable local/remote backends
//! behind a bounded cache, a thin client for the external search engine, the
//! hybrid search orchestrator (lexical-first with a vector fallback merge),
//! batch indexing with a sync/background split, and a retrieval-augmented
//! chat flow with a primary/fallback answer generator.

pub mod api;
pub mod chat;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod search;
pub mod store;

pub use error::{Error, Result};
