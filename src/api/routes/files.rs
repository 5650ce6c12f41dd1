//! Artifact handlers: serving, listing, deletion and cleanup.

use super::{CleanupResponse, FileListResponse, MessageResponse};
use crate::api::AppState;
use crate::error::{Error, Result};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// GET /api/download/file/*filename - Stream a stored artifact
#[utoipa::path(
    get,
    path = "/api/download/file/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "Percent-encoded artifact filename")
    ),
    responses(
        (status = 200, description = "Artifact contents", content_type = "application/octet-stream"),
        (status = 400, description = "Unsafe filename", body = crate::error::ApiError),
        (status = 404, description = "Artifact not found", body = crate::error::ApiError),
        (status = 413, description = "Artifact exceeds the single-file limit", body = crate::error::ApiError)
    )
)]
pub async fn serve_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let (file, record) = state.service.fetch_artifact(&filename).await?;
    tracing::debug!(filename = %record.filename, size_bytes = record.size_bytes, "Serving artifact");

    let body = Body::from_stream(ReaderStream::new(file));
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(record.size_bytes));
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(&record.filename),
    );
    Ok(response)
}

/// `attachment` disposition with an ASCII fallback name and the UTF-8 original
fn content_disposition(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let value = format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// GET /api/files - List stored artifacts
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 200, description = "Stored artifacts, most recent first", body = FileListResponse),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FileListResponse>> {
    let files = state.service.list_artifacts().await?;
    let count = files.len();
    Ok(Json(FileListResponse { files, count }))
}

/// DELETE /api/files/:filename - Delete one artifact
#[utoipa::path(
    delete,
    path = "/api/files/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "Artifact filename")
    ),
    responses(
        (status = 200, description = "Artifact deleted", body = MessageResponse),
        (status = 400, description = "Unsafe filename", body = crate::error::ApiError),
        (status = 404, description = "Artifact not found", body = crate::error::ApiError)
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>> {
    if state.service.delete_artifact(&filename).await? {
        Ok(Json(MessageResponse {
            message: format!("File {filename} deleted"),
        }))
    } else {
        Err(Error::NotFound(filename))
    }
}

/// POST /api/cleanup - Run one retention pass now
#[utoipa::path(
    post,
    path = "/api/cleanup",
    tag = "files",
    responses(
        (status = 200, description = "Cleanup pass completed", body = CleanupResponse),
        (status = 500, description = "Cleanup pass failed", body = crate::error::ApiError)
    )
)]
pub async fn trigger_cleanup(State(state): State<AppState>) -> Result<Json<CleanupResponse>> {
    let summary = state.service.trigger_cleanup().await?;
    let deleted_count = summary.total();
    Ok(Json(CleanupResponse {
        message: format!("Cleanup completed, {deleted_count} file(s) deleted"),
        deleted_count,
        summary,
    }))
}
