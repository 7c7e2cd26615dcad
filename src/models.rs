//! Domain records: snippets and their embedded form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A content record submitted for indexing. Identity is `id`; re-upserting
/// the same id replaces the stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_on: DateTime<Utc>,
    /// Categorical tag, e.g. "faq" or "tutorial".
    pub snippet_type: String,
    pub published: bool,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

impl Snippet {
    /// The text fed to the embedding provider for this snippet.
    pub fn embed_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// A snippet paired with its embedding vector, ready for upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedSnippet {
    #[serde(flatten)]
    pub snippet: Snippet,
    /// Fixed-length vector; length must match the configured dimension,
    /// enforced by the store schema.
    pub embedding: Vec<f32>,
    /// Tag of the model that produced the vector.
    pub model_version: String,
}

/// One turn of chat history passed through to retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}
