//! Retrieval-augmented chat orchestration.
//!
//! Composes the same primitives as search — embed the query, filter, hit the
//! store — then hands a context-stuffed prompt to an answer generator. Any
//! step's failure surfaces as a single error; no partial answer is returned.

pub mod generator;

use crate::embedding::TextEmbedder;
use crate::error::Result;
use crate::models::ChatTurn;
use crate::store::{SearchFilters, SearchStore, StoreDocument};
use std::sync::Arc;

pub use generator::{AnswerGenerator, FallbackGenerator, GeminiGenerator, OpenAiGenerator};

/// Answer plus the retrieval evidence behind it.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub answer: String,
    pub contexts: Vec<String>,
    pub docs: Vec<StoreDocument>,
}

/// Orchestrates one chat request end to end.
pub struct ChatOrchestrator {
    embedder: Arc<dyn TextEmbedder>,
    store: Arc<dyn SearchStore>,
    generator: Arc<dyn AnswerGenerator>,
    system_prompt: String,
    retrieval_k: usize,
}

impl ChatOrchestrator {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        store: Arc<dyn SearchStore>,
        generator: Arc<dyn AnswerGenerator>,
        system_prompt: String,
        retrieval_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            system_prompt,
            retrieval_k,
        }
    }

    pub async fn chat(
        &self,
        query: &str,
        history: &[ChatTurn],
        filters: &SearchFilters,
    ) -> Result<ChatReply> {
        let vector = self.embedder.embed(query).await?;

        let retrieval = self
            .store
            .retrieve_contexts(query, &vector, history, filters, self.retrieval_k)
            .await?;

        let prompt = compose_prompt(&self.system_prompt, &retrieval.contexts, query);

        // History already shaped the retrieval; the generator gets the
        // composed prompt on its own.
        let answer = self.generator.generate(&prompt, &[]).await?;

        Ok(ChatReply {
            answer,
            contexts: retrieval.contexts,
            docs: retrieval.docs,
        })
    }
}

fn compose_prompt(system_prompt: &str, contexts: &[String], query: &str) -> String {
    let context_block = contexts.join("\n\n");
    format!(
        "{system_prompt}\n\n---\nRelevant Contexts:\n{context_block}\n---\nUser: {query}\nAssistant:"
    )
}
