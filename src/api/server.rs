//! HTTP server setup: router, bearer-token auth, and error responses.

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::state::ApiState;
use super::{chat, embedding, search};
use crate::embedding::TextEmbedder;

/// Structured error body for every failure path: `{"detail": "..."}` with an
/// appropriate status code.
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn internal(detail: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.to_string(),
        }
    }

    pub fn not_found(detail: impl ToString) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.to_string(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            detail: "invalid authentication credentials".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

/// Start the HTTP server on the given address.
///
/// Returns the bound address and a handle that resolves when the server
/// shuts down. The caller passes a `tokio::sync::watch::Receiver<bool>` for
/// graceful shutdown.
pub async fn start_http_server(
    bind: SocketAddr,
    state: Arc<ApiState>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "HTTP server listening");

    let handle = tokio::spawn(async move {
        let mut shutdown = shutdown_rx;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|v| *v).await;
            })
            .await
            .ok();
    });

    Ok((addr, handle))
}

fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/embed", post(embedding::embed))
        .route("/index", post(embedding::index_snippet))
        .route("/batch-index", post(embedding::batch_index))
        .route("/batch-jobs/{id}", get(embedding::batch_job_status))
        .route("/search", post(search::search_snippets))
        .route("/search-stats", get(search::search_stats))
        .route("/chat", post(chat::chat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer_auth,
        ));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

/// Bearer-token check for all `/api/v1` routes. A no-op when auth is
/// disabled by configuration.
async fn require_bearer_auth(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.require_auth {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == state.api_key);

    if authorized {
        next.run(request).await
    } else {
        ApiError::unauthorized().into_response()
    }
}

/// Liveness of the service and its collaborators. Unauthenticated.
async fn health(State(state): State<Arc<ApiState>>) -> Json<serde_json::Value> {
    let store_up = state.store.health().await;
    let embedding_ready = state.embedder.is_ready();

    Json(serde_json::json!({
        "status": if store_up && embedding_ready { "healthy" } else { "unhealthy" },
        "services": {
            "store": if store_up { "up" } else { "down" },
            "embedding": if embedding_ready { "ready" } else { "not_ready" },
        }
    }))
}
