//! HTTP API for the snippet service.
//!
//! Wires the orchestrators behind an axum router: embedding, indexing,
//! search, chat, stats, and health, with bearer-token auth on everything
//! under `/api/v1`.

mod chat;
mod embedding;
mod search;
mod server;
mod state;
#[cfg(test)]
mod testutil;

pub use server::start_http_server;
pub use state::ApiState;
