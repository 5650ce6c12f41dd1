//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`media`] - Metadata extraction and downloads (rate limited)
//! - [`files`] - Serving, listing and deleting stored artifacts, cleanup
//! - [`system`] - Health, statistics, OpenAPI, frontend index

use serde::{Deserialize, Serialize};

mod files;
mod media;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use files::*;
pub use media::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /api/extract and /api/extract-fast
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ExtractRequest {
    /// Page URL of the video
    pub url: String,
}

/// Request body for POST /api/download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadRequest {
    /// Page URL of the video
    pub url: String,
    /// Format identifier from extraction (ignored for audio)
    #[serde(rename = "itag", default)]
    pub format_id: String,
    /// "video" or "audio" (default: video)
    #[serde(rename = "format", default)]
    pub kind: crate::types::MediaKind,
}

/// Response for GET /api/files
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct FileListResponse {
    /// Stored artifacts, most recently modified first
    pub files: Vec<crate::types::ArtifactRecord>,
    /// Number of artifacts
    pub count: usize,
}

/// Response for POST /api/cleanup
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CleanupResponse {
    /// Human-readable summary
    pub message: String,
    /// Total number of deleted artifacts
    pub deleted_count: usize,
    /// Breakdown by reason
    pub summary: crate::types::SweepSummary,
}

/// Plain message response
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    /// Human-readable message
    pub message: String,
}
