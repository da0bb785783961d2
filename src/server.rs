//! PDF file server.
//!
//! A small HTTP process serving the stored tender PDFs so citation links in
//! chat output and filled spreadsheets open the right document and page
//! (`/pdf/tender.pdf#page=7`; the fragment is interpreted by the viewer).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/pdf/{filename}` | Raw PDF bytes with inline disposition |
//! | `GET`  | `/pdf/{filename}/info` | Existence/size probe for one PDF |
//! | `GET`  | `/pdfs` | List stored PDF filenames |
//! | `GET`  | `/health` | Health check (version, storage dir, file count) |
//!
//! # Error Contract
//!
//! All error responses are JSON:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no such PDF: missing.pdf" } }
//! ```
//!
//! Error codes: `forbidden` (403), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the chat UI and
//! browser-based PDF viewers can fetch across origins.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;

#[derive(Clone)]
struct AppState {
    pdf_dir: Arc<PathBuf>,
}

/// Starts the PDF file server on `[server].bind`. Runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.storage.pdf_dir)?;

    let state = AppState {
        pdf_dir: Arc::new(config.storage.pdf_dir.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/pdf/{filename}", get(handle_pdf))
        .route("/pdf/{filename}/info", get(handle_pdf_info))
        .route("/pdfs", get(handle_list_pdfs))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    tracing::info!(
        "PDF server listening on http://{} (storage: {})",
        config.server.bind,
        config.storage.pdf_dir.display()
    );
    println!("PDF server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
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

fn forbidden(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::FORBIDDEN,
        code: "forbidden".to_string(),
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

/// Only plain `.pdf` filenames are served; anything resembling a path is
/// rejected before touching the filesystem.
fn validate_filename(filename: &str) -> Result<(), AppError> {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(forbidden(format!("invalid filename: {}", filename)));
    }
    let lower = filename.to_lowercase();
    if !lower.ends_with(".pdf") || lower == ".pdf" {
        return Err(forbidden(format!("not a PDF filename: {}", filename)));
    }
    Ok(())
}

fn list_stored_pdfs(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|name| name.to_lowercase().ends_with(".pdf"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    storage_dir: String,
    files_count: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage_dir: state.pdf_dir.display().to_string(),
        files_count: list_stored_pdfs(&state.pdf_dir).len(),
    })
}

// ============ GET /pdfs ============

#[derive(Serialize)]
struct PdfListResponse {
    pdfs: Vec<String>,
}

async fn handle_list_pdfs(State(state): State<AppState>) -> Json<PdfListResponse> {
    Json(PdfListResponse {
        pdfs: list_stored_pdfs(&state.pdf_dir),
    })
}

// ============ GET /pdf/{filename} ============

async fn handle_pdf(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    validate_filename(&filename).map_err(|e| {
        tracing::warn!("rejected PDF request: {}", filename);
        e
    })?;

    let path = state.pdf_dir.join(&filename);
    if !path.is_file() {
        return Err(not_found(format!("no such PDF: {}", filename)));
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| internal(format!("failed to read {}: {}", filename, e)))?;

    tracing::info!("serving PDF: {} ({} bytes)", filename, bytes.len());

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename),
        ),
        (header::ACCEPT_RANGES, "bytes".to_string()),
        (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
    ];

    Ok((headers, bytes).into_response())
}

// ============ GET /pdf/{filename}/info ============

#[derive(Serialize)]
struct PdfInfoResponse {
    filename: String,
    exists: bool,
    size_bytes: u64,
    url: String,
}

async fn handle_pdf_info(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<PdfInfoResponse>, AppError> {
    validate_filename(&filename)?;

    let path = state.pdf_dir.join(&filename);
    let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    Ok(Json(PdfInfoResponse {
        exists: path.is_file(),
        size_bytes,
        url: format!("/pdf/{}", filename),
        filename,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn filenames_with_path_parts_are_forbidden() {
        assert!(validate_filename("../secrets.pdf").is_err());
        assert!(validate_filename("a/b.pdf").is_err());
        assert!(validate_filename("a\\b.pdf").is_err());
        assert!(validate_filename("..pdf").is_err());
    }

    #[test]
    fn non_pdf_filenames_are_forbidden() {
        assert!(validate_filename("notes.txt").is_err());
        assert!(validate_filename("archive.pdf.zip").is_err());
        assert!(validate_filename(".pdf").is_err());
    }

    #[test]
    fn plain_pdf_filenames_pass() {
        assert!(validate_filename("tender.pdf").is_ok());
        assert!(validate_filename("Tender Spec.PDF").is_ok());
    }

    #[test]
    fn listing_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(tmp.path().join("sub.pdf")).unwrap();

        assert_eq!(list_stored_pdfs(tmp.path()), vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn listing_missing_dir_is_empty() {
        assert!(list_stored_pdfs(std::path::Path::new("/nonexistent-dir")).is_empty());
    }
}
