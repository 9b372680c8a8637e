//! HTTP query service
//!
//! `POST /ask` takes `{"question": "..."}` and answers with
//! `{"answer": "...", "sources": [...]}`. Failures are reported as
//! `{"error": "..."}` carrying a fixed user-facing message; internal error
//! text is only logged. `GET /health` reports whether the index is loaded.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rig::completion::CompletionModel;
use rig::embeddings::EmbeddingModel;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::search::{SearchError, SearchSystem};

/// Shown when the index could not be loaded at startup
pub const INDEX_NOT_LOADED: &str = "Veritabanı yüklü değil.";

/// Shown when the question is missing or blank
pub const EMPTY_QUESTION: &str = "Soru boş olamaz.";

/// Shown for any other failure
pub const INTERNAL_ERROR: &str = "Bir hata oluştu.";

/// Where the service listens and which index it serves
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub index_path: PathBuf,
}

/// Shared handler state. `search` is `None` when the index failed to load.
pub struct AppState<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    search: Option<Arc<SearchSystem<C, E>>>,
}

impl<C, E> AppState<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    pub fn new(search: Option<SearchSystem<C, E>>) -> Self {
        Self {
            search: search.map(Arc::new),
        }
    }
}

impl<C, E> Clone for AppState<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    fn clone(&self) -> Self {
        Self {
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    index_loaded: bool,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Pull a non-blank `question` string out of a JSON body
fn question_from_body(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let question = value.get("question")?.as_str()?.trim();
    if question.is_empty() {
        None
    } else {
        Some(question.to_string())
    }
}

async fn ask<C, E>(State(state): State<AppState<C, E>>, body: Bytes) -> Response
where
    C: CompletionModel + 'static,
    E: EmbeddingModel + 'static,
{
    let Some(search) = state.search.as_ref() else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, INDEX_NOT_LOADED);
    };

    let Some(question) = question_from_body(&body) else {
        return error_response(StatusCode::BAD_REQUEST, EMPTY_QUESTION);
    };

    match search.ask(&question).await {
        Ok(answer) => Json(answer).into_response(),
        Err(SearchError::EmptyQuestion) => error_response(StatusCode::BAD_REQUEST, EMPTY_QUESTION),
        Err(e) => {
            error!("Failed to answer question: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
        }
    }
}

async fn health<C, E>(State(state): State<AppState<C, E>>) -> Json<HealthResponse>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel + 'static,
{
    let index_loaded = state.search.is_some();
    Json(HealthResponse {
        status: if index_loaded { "ok" } else { "degraded" },
        index_loaded,
    })
}

/// Build the router with CORS open to any origin
pub fn router<C, E>(state: AppState<C, E>) -> Router
where
    C: CompletionModel + 'static,
    E: EmbeddingModel + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/ask", post(ask::<C, E>))
        .route("/health", get(health::<C, E>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the process is stopped
pub async fn serve<C, E>(config: &ServerConfig, state: AppState<C, E>) -> Result<()>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel + 'static,
{
    if state.search.is_none() {
        warn!("Serving without an index; /ask will fail until it is rebuilt");
    }

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", config.bind);
    axum::serve(listener, router(state))
        .await
        .map_err(|e| Error::Other(format!("Server error: {}", e)))
}
