//! Thin HTTP transport over the ingestion and query orchestrators (§6).
//!
//! | Method   | Path               | Description                          |
//! |----------|--------------------|---------------------------------------|
//! | `POST`   | `/documents`       | Upload and ingest a document          |
//! | `GET`    | `/documents`       | List documents (paginated)            |
//! | `GET`    | `/documents/:uuid` | Retrieve a document and its chunks    |
//! | `DELETE` | `/documents/:uuid` | Delete a document                     |
//! | `POST`   | `/query`           | Hybrid search with optional reranking |
//! | `GET`    | `/health`          | Vector-store / object-store liveness  |
//!
//! Every error response carries a single human-readable message
//! ([`CoreError::user_message`]), with client errors ([`CoreError::is_client_error`])
//! mapped to 400/404 and everything else to 500.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::config::Config;
use crate::error::CoreError;
use crate::get::{get_document, DocumentResponse};
use crate::health::{self, HealthReport};
use crate::ingestion::{self, IngestOutcome, IngestRequest};
use crate::models::{Document, Metadata};
use crate::objectstore::ObjectStoreAdapter;
use crate::query::{run_query, QueryRequest};
use crate::store::VectorStore;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<VectorStore>,
    objects: Arc<ObjectStoreAdapter>,
}

pub async fn run_server(config: &Config, store: VectorStore, objects: ObjectStoreAdapter) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(store),
        objects: Arc::new(objects),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/documents", post(handle_upload).get(handle_list))
        .route("/documents/{uuid}", get(handle_get).delete(handle_delete))
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    tracing::info!(bind = %bind_addr, "starting server");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

struct AppError(CoreError);

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        AppError(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            match &self.0 {
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorBody {
            error: ErrorDetail {
                message: self.0.user_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct UploadRequest {
    filename: String,
    file_type: String,
    content_base64: String,
    uploaded_by: String,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Serialize)]
struct UploadResponse {
    document: Document,
    deduplicated: bool,
}

#[axum::debug_handler]
async fn handle_upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&req.content_base64)
        .map_err(|e| AppError(CoreError::UnsupportedFormat(format!("invalid base64: {e}"))))?;

    let request = IngestRequest {
        filename: req.filename,
        extension: req.file_type,
        bytes,
        uploaded_by: req.uploaded_by,
        metadata: req.metadata,
    };

    let outcome = ingestion::ingest_document(&state.config, &state.store, &state.objects, request).await?;

    let (document, deduplicated) = match outcome {
        IngestOutcome::Committed(d) => (d, false),
        IngestOutcome::Deduplicated(d) => (d, true),
    };

    Ok(Json(UploadResponse { document, deduplicated }))
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(default = "default_list_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_list_limit() -> i64 {
    50
}

#[derive(Serialize)]
struct ListResponse {
    documents: Vec<Document>,
}

#[axum::debug_handler]
async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    let documents = state.store.list_documents(params.limit, params.offset).await?;
    Ok(Json(ListResponse { documents }))
}

async fn handle_get(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    let doc = get_document(&state.store, &state.objects, uuid).await?;
    Ok(Json(doc))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: bool,
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = ingestion::delete_document(&state.store, &state.objects, uuid).await?;
    Ok(Json(DeleteResponse { deleted }))
}

#[derive(Deserialize)]
struct QueryBody {
    query: String,
    #[serde(default = "default_true")]
    hybrid: bool,
    #[serde(default)]
    rerank: bool,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    filter: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct QueryResponse {
    results: Vec<crate::models::SearchResultItem>,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(req): Json<QueryBody>,
) -> Result<Json<QueryResponse>, AppError> {
    let request = QueryRequest {
        query: req.query,
        hybrid: req.hybrid,
        rerank: req.rerank,
        top_k: req.top_k,
        filter: req.filter,
    };
    let results = run_query(&state.config, &state.store, &state.objects, request).await?;
    Ok(Json(QueryResponse { results }))
}

async fn handle_health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = health::check_health(&state.store, &state.objects).await;
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
