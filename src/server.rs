//! HTTP API over the knowledge base.
//!
//! Every route delegates to the shared [`RagService`]; handlers only decode
//! requests, stage uploads on disk, and map [`RagError`]s to responses.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/` | Service banner |
//! | `POST`   | `/api/upload` | Multipart `file` upload (pdf, txt, md, docx) |
//! | `POST`   | `/api/query` | `{query, max_chunks?, conversation_history?}` |
//! | `GET`    | `/api/documents` | All registered documents |
//! | `DELETE` | `/api/documents/{id}` | Remove a document and its chunks |
//! | `GET`    | `/api/stats` | Knowledge-base totals |
//! | `GET`    | `/api/health` | Health check |
//! | `GET`    | `/api/version` | Crate and API version |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unsupported_format` (400),
//! `not_found` (404), `payload_too_large` (413), `extraction_failed` (422),
//! `embedding_failed` (502), `generation_failed` (502),
//! `persistence_failed` (500), `internal` (500).
//!
//! # CORS
//!
//! Only the origins listed in `[server].cors_origins` are allowed.

use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, Multipart, Path,
        State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use uuid::Uuid;

use crate::config::{Config, ServerConfig};
use crate::error::RagError;
use crate::models::{
    ChatMessage, DocumentListResponse, FileType, KnowledgeBaseStats, QueryResponse, UploadResponse,
};
use crate::rag::RagService;

const SERVICE_NAME: &str = "askdocs";
const API_VERSION: &str = "v1";

#[derive(Clone)]
struct AppState {
    service: Arc<RagService>,
    /// Uploads are staged here under generated names.
    upload_dir: Arc<PathBuf>,
}

/// Starts the HTTP server with providers and storage built from `config`.
///
/// This is the entry point used by `askdocs serve`. Runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(RagService::from_config(config).await?);
    run_server_with_service(config, service).await
}

/// Starts the HTTP server around an already-built [`RagService`].
///
/// Binds `[server].bind` and stages uploads in `[storage].upload_dir`,
/// which is created if missing.
pub async fn run_server_with_service(
    config: &Config,
    service: Arc<RagService>,
) -> anyhow::Result<()> {
    let upload_dir = config.storage.upload_dir.clone();
    tokio::fs::create_dir_all(&upload_dir).await?;

    let app = router(service, &config.server, upload_dir);

    println!("askdocs API listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// The full route table with CORS and the body size limit applied.
pub fn router(service: Arc<RagService>, server: &ServerConfig, upload_dir: PathBuf) -> Router {
    let state = AppState {
        service,
        upload_dir: Arc::new(upload_dir),
    };

    Router::new()
        .route("/", get(handle_root))
        .route("/api/upload", post(handle_upload))
        .route("/api/query", post(handle_query))
        .route("/api/documents", get(handle_list_documents))
        .route("/api/documents/{id}", delete(handle_delete_document))
        .route("/api/stats", get(handle_stats))
        .route("/api/health", get(handle_health))
        .route("/api/version", get(handle_version))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors_layer(&server.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let status = match &err {
            RagError::UnsupportedFormat(_) | RagError::ValidationFailure(_) => {
                StatusCode::BAD_REQUEST
            }
            RagError::NotFound(_) => StatusCode::NOT_FOUND,
            RagError::ExtractionFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RagError::EmbeddingFailure(_) | RagError::GenerationFailure(_) => {
                StatusCode::BAD_GATEWAY
            }
            RagError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if !err.is_client_error() {
            tracing::error!(code = err.code(), error = %err, "request failed");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Body-limit overruns surface as 413; anything else is a malformed form.
fn multipart_error(err: MultipartError) -> AppError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError {
            status,
            code: "payload_too_large".to_string(),
            message: err.body_text(),
        }
    } else {
        bad_request(err.body_text())
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct BannerResponse {
    message: String,
    version: String,
    health: String,
}

async fn handle_root() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: "askdocs document Q&A API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        health: "/api/health".to_string(),
    })
}

// ============ POST /api/upload ============

/// Handler for `POST /api/upload`.
///
/// Reads the multipart `file` field, rejects unsupported extensions before
/// touching disk, streams the body to a generated file name in the upload
/// directory, and runs the upload pipeline. The staged file is removed
/// whether or not processing succeeds.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| bad_request("file field has no filename"))?;
        let file_type = FileType::from_filename(&filename)?;

        let staged = state
            .upload_dir
            .join(format!("{}.{}", Uuid::new_v4(), file_type.as_str()));

        let written = async {
            let mut file = tokio::fs::File::create(&staged)
                .await
                .map_err(|e| internal(format!("failed to stage upload: {}", e)))?;
            while let Some(bytes) = field.chunk().await.map_err(multipart_error)? {
                file.write_all(&bytes)
                    .await
                    .map_err(|e| internal(format!("failed to stage upload: {}", e)))?;
            }
            file.flush()
                .await
                .map_err(|e| internal(format!("failed to stage upload: {}", e)))?;
            Ok::<(), AppError>(())
        }
        .await;

        let result = match written {
            Ok(()) => state
                .service
                .upload_document(&staged, &filename)
                .await
                .map_err(AppError::from),
            Err(e) => Err(e),
        };

        if let Err(e) = tokio::fs::remove_file(&staged).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %staged.display(), error = %e, "failed to remove staged upload");
            }
        }

        return result.map(Json);
    }

    Err(bad_request("multipart field 'file' is required"))
}

// ============ POST /api/query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    max_chunks: Option<usize>,
    #[serde(default)]
    conversation_history: Vec<ChatMessage>,
}

/// Handler for `POST /api/query`. Undecodable bodies are a `bad_request`
/// with the usual error envelope.
async fn handle_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(req) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    let response = state
        .service
        .query(&req.query, req.max_chunks, &req.conversation_history)
        .await?;
    Ok(Json(response))
}

// ============ /api/documents ============

async fn handle_list_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentListResponse>, AppError> {
    Ok(Json(state.service.list_documents().await?))
}

#[derive(Serialize)]
struct DeleteResponse {
    message: String,
}

/// Handler for `DELETE /api/documents/{id}`. Unknown ids are a 404.
async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    if state.service.delete_document(&id).await {
        Ok(Json(DeleteResponse {
            message: format!("Document {} deleted successfully", id),
        }))
    } else {
        Err(not_found(format!("document not found: {}", id)))
    }
}

// ============ GET /api/stats ============

async fn handle_stats(
    State(state): State<AppState>,
) -> Result<Json<KnowledgeBaseStats>, AppError> {
    Ok(Json(state.service.stats().await?))
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

// ============ GET /api/version ============

#[derive(Serialize)]
struct VersionResponse {
    version: String,
    api: String,
}

async fn handle_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        api: API_VERSION.to_string(),
    })
}
