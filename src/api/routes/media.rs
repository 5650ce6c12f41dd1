//! Extraction and download handlers.

use super::{DownloadRequest, ExtractRequest};
use crate::api::AppState;
use crate::error::Result;
use crate::types::{DownloadOutcome, VideoMetadata};
use axum::{Json, extract::State};

/// POST /api/extract-fast - Basic metadata without formats
#[utoipa::path(
    post,
    path = "/api/extract-fast",
    tag = "media",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Basic video metadata (formats always empty)", body = VideoMetadata),
        (status = 400, description = "Unsupported URL", body = crate::error::ApiError),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ApiError),
        (status = 502, description = "Backend reported a failure", body = crate::error::ApiError),
        (status = 504, description = "Backend timed out", body = crate::error::ApiError)
    )
)]
pub async fn extract_fast(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<VideoMetadata>> {
    let metadata = state.service.extract_fast(&request.url).await?;
    Ok(Json(metadata))
}

/// POST /api/extract - Full metadata including formats
#[utoipa::path(
    post,
    path = "/api/extract",
    tag = "media",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Video metadata with available formats", body = VideoMetadata),
        (status = 400, description = "Unsupported URL", body = crate::error::ApiError),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ApiError),
        (status = 502, description = "Backend reported a failure", body = crate::error::ApiError),
        (status = 504, description = "Backend timed out", body = crate::error::ApiError)
    )
)]
pub async fn extract_full(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<VideoMetadata>> {
    let metadata = state.service.extract_full(&request.url).await?;
    Ok(Json(metadata))
}

/// POST /api/download - Download a format into the store
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "media",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "File stored and ready to fetch", body = DownloadOutcome),
        (status = 400, description = "Unsupported URL or format", body = crate::error::ApiError),
        (status = 429, description = "Rate limit exceeded", body = crate::error::ApiError),
        (status = 502, description = "Download failed", body = crate::error::ApiError),
        (status = 503, description = "Backend unavailable or shutting down", body = crate::error::ApiError),
        (status = 504, description = "Backend timed out", body = crate::error::ApiError)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<DownloadOutcome>> {
    let outcome = state
        .service
        .download(&request.url, &request.format_id, request.kind)
        .await?;
    Ok(Json(outcome))
}
