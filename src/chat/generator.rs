//! Answer generation: two provider implementations behind one trait, plus a
//! fixed try-primary-then-fallback composition.

use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use crate::models::ChatTurn;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Produces a chat answer from a composed prompt and optional history.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, history: &[ChatTurn]) -> Result<String>;
}

/// OpenAI chat completions.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

impl OpenAiGenerator {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
        let mut messages: Vec<serde_json::Value> = history
            .iter()
            .map(|turn| json!({ "role": turn.role, "content": turn.content }))
            .collect();
        messages.push(json!({ "role": "user", "content": prompt }));

        let response = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
            }))
            .send()
            .await
            .map_err(|e| LlmError::Completion(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Completion(format!("{status}: {body}")).into());
        }

        let parsed: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::BadResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::BadResponse("no choices returned".to_string()).into())
    }
}

/// Google Gemini generateContent.
pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: String,
}

impl GeminiGenerator {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
        }
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
        // Gemini's role vocabulary is user/model rather than user/assistant.
        let mut contents: Vec<serde_json::Value> = history
            .iter()
            .map(|turn| {
                let role = if turn.role == "assistant" { "model" } else { "user" };
                json!({ "role": role, "parts": [{ "text": turn.content }] })
            })
            .collect();
        contents.push(json!({ "role": "user", "parts": [{ "text": prompt }] }));

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let response = self
            .http
            .post(url)
            .json(&json!({ "contents": contents }))
            .send()
            .await
            .map_err(|e| LlmError::Completion(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Completion(format!("{status}: {body}")).into());
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::BadResponse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| LlmError::BadResponse("no candidates returned".to_string()).into())
    }
}

/// Tries the primary generator; on error, falls back to the secondary when
/// one is configured, otherwise the primary's error is returned.
pub struct FallbackGenerator {
    primary: Box<dyn AnswerGenerator>,
    fallback: Option<Box<dyn AnswerGenerator>>,
}

impl FallbackGenerator {
    pub fn new(primary: Box<dyn AnswerGenerator>, fallback: Option<Box<dyn AnswerGenerator>>) -> Self {
        Self { primary, fallback }
    }

    /// Build the provider chain from configuration: OpenAI primary, Gemini
    /// fallback when a Gemini key is present.
    pub fn from_config(config: &LlmConfig) -> Self {
        let fallback: Option<Box<dyn AnswerGenerator>> = (!config.gemini_api_key.is_empty())
            .then(|| Box::new(GeminiGenerator::new(config)) as Box<dyn AnswerGenerator>);

        if fallback.is_some() {
            tracing::info!(model = %config.gemini_model, "Gemini fallback configured");
        }

        Self::new(Box::new(OpenAiGenerator::new(config)), fallback)
    }
}

#[async_trait]
impl AnswerGenerator for FallbackGenerator {
    async fn generate(&self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
        match self.primary.generate(prompt, history).await {
            Ok(answer) => Ok(answer),
            Err(error) => match &self.fallback {
                Some(fallback) => {
                    tracing::warn!(%error, "primary answer generator failed, trying fallback");
                    fallback.generate(prompt, history).await
                }
                None => Err(error),
            },
        }
    }
}
