//! HTTP client for the Typesense-style search engine.
//!
//! Everything here is a thin adapter over the engine's query-and-document
//! API: collection schema management, upserts, lexical and vector search,
//! deletes, and the conversational retrieval call used by chat.

use super::{RagRetrieval, ResultSet, SearchFilters, SearchStore, StoreDocument};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::models::{ChatTurn, EmbeddedSnippet};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

/// Thin adapter over the engine's HTTP API.
pub struct TypesenseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    collection: String,
    embedding_dim: usize,
}

#[derive(Deserialize)]
struct SearchApiResponse {
    #[serde(default)]
    found: usize,
    #[serde(default)]
    hits: Vec<SearchApiHit>,
}

#[derive(Deserialize)]
struct SearchApiHit {
    document: StoreDocument,
}

#[derive(Deserialize)]
struct HealthApiResponse {
    #[serde(default)]
    ok: bool,
}

#[derive(Deserialize)]
struct ConversationalApiResponse {
    #[serde(default)]
    contexts: Vec<ContextPassage>,
    #[serde(default)]
    top_documents: Vec<StoreDocument>,
}

#[derive(Deserialize)]
struct ContextPassage {
    text: String,
}

/// Render filters into the engine's filter expression. All clauses join with
/// `&&`; the category group joins with `||` internally.
pub(crate) fn build_filter_by(filters: &SearchFilters) -> Option<String> {
    let mut clauses = Vec::new();

    if filters.published_only {
        clauses.push("published:=true".to_string());
    }
    if let Some(snippet_type) = &filters.snippet_type {
        clauses.push(format!("snippet_type:={snippet_type}"));
    }
    if !filters.category_ids.is_empty() {
        let group = filters
            .category_ids
            .iter()
            .map(|id| format!("category_ids:={id}"))
            .collect::<Vec<_>>()
            .join(" || ");
        clauses.push(format!("({group})"));
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" && "))
    }
}

fn format_vector_query(vector: &[f32], k: usize) -> String {
    let components = vector
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("embedding:([{components}], k:{k})")
}

impl TypesenseClient {
    pub fn new(config: &StoreConfig, embedding_dim: usize) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.connection_timeout_secs))
            .build()
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
            embedding_dim,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn documents_url(&self) -> String {
        format!("{}/documents", self.collection_url())
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "name": self.collection,
            "fields": [
                { "name": "id", "type": "string" },
                { "name": "title", "type": "string" },
                { "name": "description", "type": "string" },
                { "name": "created_on", "type": "int64" },
                { "name": "snippet_type", "type": "string", "facet": true },
                { "name": "published", "type": "bool", "facet": true },
                { "name": "category_ids", "type": "int64[]", "facet": true, "optional": true },
                { "name": "embedding", "type": "float[]", "num_dim": self.embedding_dim },
                { "name": "model_version", "type": "string", "facet": true }
            ]
        })
    }

    async fn run_search(&self, params: Vec<(&str, String)>) -> Result<ResultSet> {
        let started = Instant::now();

        let response = self
            .http
            .get(format!("{}/search", self.documents_url()))
            .header(API_KEY_HEADER, &self.api_key)
            .query(&params)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::BadStatus { status, body }.into());
        }

        let parsed: SearchApiResponse = response
            .json()
            .await
            .map_err(|e| StoreError::BadResponse(e.to_string()))?;

        Ok(ResultSet {
            hits: parsed.hits.into_iter().map(|hit| hit.document).collect(),
            found: parsed.found,
            took_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }
}

#[async_trait]
impl SearchStore for TypesenseClient {
    async fn ensure_schema(&self) -> Result<()> {
        let response = self
            .http
            .get(self.collection_url())
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if response.status().is_success() {
            tracing::debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        if response.status().as_u16() != 404 {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::BadStatus { status, body }.into());
        }

        let create = self
            .http
            .post(format!("{}/collections", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&self.schema())
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        // Concurrent callers can race on create; the engine's "already
        // exists" response counts as success.
        if create.status().is_success() || create.status().as_u16() == 409 {
            tracing::info!(collection = %self.collection, "collection ready");
            return Ok(());
        }

        let status = create.status().as_u16();
        let body = create.text().await.unwrap_or_default();
        Err(StoreError::BadStatus { status, body }.into())
    }

    async fn upsert(&self, snippet: &EmbeddedSnippet) -> bool {
        if let Err(error) = self.ensure_schema().await {
            tracing::error!(snippet_id = %snippet.snippet.id, %error, "failed to ensure collection before upsert");
            return false;
        }

        let document = json!({
            "id": snippet.snippet.id,
            "title": snippet.snippet.title,
            "description": snippet.snippet.description,
            "created_on": snippet.snippet.created_on.timestamp(),
            "snippet_type": snippet.snippet.snippet_type,
            "published": snippet.snippet.published,
            "category_ids": snippet.snippet.category_ids,
            "embedding": snippet.embedding,
            "model_version": snippet.model_version,
        });

        let result = self
            .http
            .post(self.documents_url())
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("action", "upsert")])
            .json(&document)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(snippet_id = %snippet.snippet.id, "upserted snippet");
                true
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                tracing::error!(snippet_id = %snippet.snippet.id, status, body, "failed to upsert snippet");
                false
            }
            Err(error) => {
                tracing::error!(snippet_id = %snippet.snippet.id, %error, "failed to upsert snippet");
                false
            }
        }
    }

    async fn lexical_search(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<ResultSet> {
        let mut params = vec![
            ("q", query.to_string()),
            ("query_by", "title,description".to_string()),
            ("per_page", limit.to_string()),
            ("page", "1".to_string()),
        ];
        if let Some(filter_by) = build_filter_by(filters) {
            params.push(("filter_by", filter_by));
        }

        self.run_search(params).await
    }

    async fn vector_search(
        &self,
        vector: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<ResultSet> {
        let mut params = vec![
            ("q", "*".to_string()),
            ("vector_query", format_vector_query(vector, limit)),
            ("per_page", limit.to_string()),
            ("page", "1".to_string()),
        ];
        if let Some(filter_by) = build_filter_by(filters) {
            params.push(("filter_by", filter_by));
        }

        self.run_search(params).await
    }

    async fn delete(&self, id: &str) -> bool {
        let result = self
            .http
            .delete(format!("{}/{}", self.documents_url(), id))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(snippet_id = %id, "deleted snippet");
                true
            }
            // Already gone; removal is idempotent.
            Ok(response) if response.status().as_u16() == 404 => true,
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::error!(snippet_id = %id, status, "failed to delete snippet");
                false
            }
            Err(error) => {
                tracing::error!(snippet_id = %id, %error, "failed to delete snippet");
                false
            }
        }
    }

    async fn health(&self) -> bool {
        let result = self
            .http
            .get(format!("{}/health", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await;

        match result {
            Ok(response) => response
                .json::<HealthApiResponse>()
                .await
                .map(|health| health.ok)
                .unwrap_or(false),
            Err(error) => {
                tracing::error!(%error, "search engine health check failed");
                false
            }
        }
    }

    async fn retrieve_contexts(
        &self,
        query: &str,
        vector: &[f32],
        history: &[ChatTurn],
        filters: &SearchFilters,
        k: usize,
    ) -> Result<RagRetrieval> {
        let mut request = json!({
            "q": query,
            "history": history,
            "vector_query": format_vector_query(vector, k),
            "semantic_ranker": true,
            "include_contexts": true,
        });
        if let Some(filter_by) = build_filter_by(filters) {
            request["filter_by"] = json!(filter_by);
        }

        let response = self
            .http
            .post(format!("{}/conversational_search", self.documents_url()))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::BadStatus { status, body }.into());
        }

        let parsed: ConversationalApiResponse = response
            .json()
            .await
            .map_err(|e| StoreError::BadResponse(e.to_string()))?;

        Ok(RagRetrieval {
            contexts: parsed.contexts.into_iter().map(|c| c.text).collect(),
            docs: parsed.top_documents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{TypesenseClient, build_filter_by};
    use crate::config::StoreConfig;
    use crate::models::{EmbeddedSnippet, Snippet};
    use crate::store::{SearchFilters, SearchStore};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TypesenseClient {
        let address = server.address();
        let config = StoreConfig {
            host: address.ip().to_string(),
            port: address.port(),
            ..StoreConfig::default()
        };
        TypesenseClient::new(&config, 4).expect("build client")
    }

    fn sample_snippet() -> EmbeddedSnippet {
        EmbeddedSnippet {
            snippet: Snippet {
                id: "s1".to_string(),
                title: "Intro to ML".to_string(),
                description: "basics of machine learning".to_string(),
                created_on: chrono::Utc::now(),
                snippet_type: "tutorial".to_string(),
                published: true,
                category_ids: vec![1, 2],
            },
            embedding: vec![0.1, 0.2, 0.3, 0.4],
            model_version: "v1.0".to_string(),
        }
    }

    async fn mount_collection_exists(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/collections/snippets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "snippets"})))
            .mount(server)
            .await;
    }

    #[test]
    fn filter_composition_joins_with_and_and_or_group() {
        let filters = SearchFilters {
            snippet_type: Some("faq".to_string()),
            published_only: true,
            category_ids: vec![1, 2],
        };

        assert_eq!(
            build_filter_by(&filters).expect("filter"),
            "published:=true && snippet_type:=faq && (category_ids:=1 || category_ids:=2)"
        );
    }

    #[test]
    fn empty_filters_produce_no_expression() {
        assert_eq!(build_filter_by(&SearchFilters::default()), None);
    }

    #[tokio::test]
    async fn ensure_schema_creates_collection_when_missing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/collections/snippets"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "snippets"})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).ensure_schema().await.expect("schema");
    }

    #[tokio::test]
    async fn ensure_schema_treats_create_race_as_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/collections/snippets"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"message": "collection already exists"})),
            )
            .mount(&server)
            .await;

        client_for(&server).ensure_schema().await.expect("schema");
    }

    #[tokio::test]
    async fn upsert_converts_engine_errors_to_false() {
        let server = MockServer::start().await;
        mount_collection_exists(&server).await;

        Mock::given(method("POST"))
            .and(path("/collections/snippets/documents"))
            .respond_with(ResponseTemplate::new(500).set_body_string("engine exploded"))
            .mount(&server)
            .await;

        let success = client_for(&server).upsert(&sample_snippet()).await;
        assert!(!success);
    }

    #[tokio::test]
    async fn upsert_sends_document_with_epoch_timestamp() {
        let server = MockServer::start().await;
        mount_collection_exists(&server).await;

        Mock::given(method("POST"))
            .and(path("/collections/snippets/documents"))
            .and(query_param("action", "upsert"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "s1"})))
            .expect(1)
            .mount(&server)
            .await;

        let success = client_for(&server).upsert(&sample_snippet()).await;
        assert!(success);
    }

    #[tokio::test]
    async fn lexical_search_parses_hits_and_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/collections/snippets/documents/search"))
            .and(query_param("query_by", "title,description"))
            .and(query_param("per_page", "10"))
            .and(query_param("filter_by", "published:=true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "found": 27,
                "hits": [
                    { "document": {
                        "id": "s1",
                        "title": "Intro to ML",
                        "description": "basics of machine learning",
                        "created_on": 1700000000_i64,
                        "snippet_type": "tutorial",
                        "published": true,
                        "category_ids": [1],
                        "model_version": "v1.0"
                    }}
                ]
            })))
            .mount(&server)
            .await;

        let filters = SearchFilters {
            published_only: true,
            ..SearchFilters::default()
        };
        let results = client_for(&server)
            .lexical_search("machine learning", &filters, 10)
            .await
            .expect("search");

        assert_eq!(results.found, 27);
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].id, "s1");
        assert!(results.took_ms >= 0.0);
    }

    #[tokio::test]
    async fn vector_search_sends_wildcard_query_and_vector() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/collections/snippets/documents/search"))
            .and(query_param("q", "*"))
            .and(query_param(
                "vector_query",
                "embedding:([0.1,0.2,0.3,0.4], k:5)",
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "found": 0, "hits": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server)
            .vector_search(&[0.1, 0.2, 0.3, 0.4], &SearchFilters::default(), 5)
            .await
            .expect("vector search");

        assert_eq!(results.found, 0);
    }

    #[tokio::test]
    async fn delete_is_idempotent_on_missing_documents() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/collections/snippets/documents/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(client_for(&server).delete("ghost").await);
    }

    #[tokio::test]
    async fn health_reflects_engine_flag() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        assert!(client_for(&server).health().await);
    }

    #[tokio::test]
    async fn retrieve_contexts_extracts_passages_and_documents() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/collections/snippets/documents/conversational_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contexts": [ { "text": "passage one" }, { "text": "passage two" } ],
                "top_documents": [ {
                    "id": "s1",
                    "title": "Intro to ML",
                    "description": "basics",
                    "created_on": 1700000000_i64,
                    "snippet_type": "faq",
                    "published": true
                } ]
            })))
            .mount(&server)
            .await;

        let retrieval = client_for(&server)
            .retrieve_contexts("what is ml", &[0.1, 0.2], &[], &SearchFilters::default(), 5)
            .await
            .expect("retrieval");

        assert_eq!(retrieval.contexts, vec!["passage one", "passage two"]);
        assert_eq!(retrieval.docs.len(), 1);
        assert_eq!(retrieval.docs[0].id, "s1");
    }
}
