//! Simple REST API server example for the reconciliation pipeline.
//!
//! Run with: `ANTHROPIC_API_KEY=... cargo run --example server`
//!
//! ## Endpoints
//!
//! - `POST /process` - Run one batch and return its result
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/process \
//!   -H "Content-Type: application/json" \
//!   -d "[{\"filename\": \"toll.pdf\", \"content_base64\": \"$(base64 -w0 toll.pdf)\"}]"
//! ```
//!
//! Artifacts are written to `outputs/` (or `TICKET_LEDGER_OUTPUT_DIR`).

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use ticket_ledger::{
    AnthropicClient, BatchResult, DirectorySink, ExtractionAdapter, Pipeline, PipelineConfig,
    PipelineError, ServiceConfig, ServiceError, SubmittedDocument,
};
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// One uploaded document:
/// ```json
/// {"filename": "toll.pdf", "content_base64": "JVBERi0xLjUK..."}
/// ```
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    pub content_base64: String,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ServiceConfig>,
    pub output_dir: PathBuf,
}

// === Error Handling ===

pub enum AppError {
    InvalidUpload(String),
    Service(ServiceError),
    Pipeline(PipelineError),
    Internal(String),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = match self {
            AppError::InvalidUpload(error) => (StatusCode::BAD_REQUEST, "INVALID_UPLOAD", error),
            AppError::Service(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERVICE_UNAVAILABLE",
                err.to_string(),
            ),
            AppError::Pipeline(err @ PipelineError::MalformedDocument { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MALFORMED_DOCUMENT",
                err.to_string(),
            ),
            AppError::Pipeline(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PIPELINE_FAILED",
                err.to_string(),
            ),
            AppError::Internal(error) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", error),
        };

        (
            status,
            Json(ErrorResponse {
                error,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /process - Run one batch over the uploaded documents.
async fn process(
    State(state): State<AppState>,
    Json(uploads): Json<Vec<UploadRequest>>,
) -> Result<Json<BatchResult>, AppError> {
    let documents = uploads
        .into_iter()
        .map(|upload| {
            STANDARD
                .decode(upload.content_base64.as_bytes())
                .map(|bytes| SubmittedDocument::new(upload.filename.clone(), bytes))
                .map_err(|e| AppError::InvalidUpload(format!("{}: {}", upload.filename, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Extraction calls block, keep them off the async workers.
    let result = tokio::task::spawn_blocking(move || {
        let client = AnthropicClient::new((*state.service).clone()).map_err(AppError::Service)?;
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            ExtractionAdapter::new(client),
            DirectorySink::new(state.output_dir),
        );
        pipeline.run(documents).map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(format!("batch task failed: {e}")))??;

    Ok(Json(result))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/process", post(process))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ticket_ledger=info")),
        )
        .init();

    let state = AppState {
        service: Arc::new(ServiceConfig {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            ..ServiceConfig::default()
        }),
        output_dir: std::env::var("TICKET_LEDGER_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("outputs")),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Ticket ledger server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST /process  - Reconcile a batch of receipts");

    axum::serve(listener, app).await.unwrap();
}
