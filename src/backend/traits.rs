//! Traits and types for extraction backends

use crate::types::DownloadJob;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Metadata lookup without downloading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Page URL
    pub url: String,
    /// Skip format enumeration where the backend supports it
    pub flat: bool,
    /// Socket timeout handed to the backend
    pub socket_timeout: Duration,
    /// Backend-level connection retries
    pub retries: u32,
}

/// One download attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// What to fetch and where to write it
    pub job: DownloadJob,
    /// Browser to borrow cookies from, `None` for an anonymous attempt
    pub cookies_from_browser: Option<String>,
    /// Socket timeout handed to the backend
    pub socket_timeout: Duration,
    /// Backend-level connection retries
    pub retries: u32,
    /// Backend-level fragment retries
    pub fragment_retries: u32,
    /// Codec for audio extraction
    pub audio_codec: String,
    /// Bitrate for audio extraction
    pub audio_quality: String,
}

/// Metadata as reported by the backend, before defaults are applied
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawMetadata {
    /// Title
    #[serde(default)]
    pub title: Option<String>,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Uploader name
    #[serde(default)]
    pub uploader: Option<String>,
    /// Duration in seconds (may be fractional)
    #[serde(default)]
    pub duration: Option<f64>,
    /// Available formats
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// One format entry as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFormat {
    /// Format identifier
    #[serde(default)]
    pub format_id: Option<String>,
    /// Human label such as "720p" or "medium"
    #[serde(default)]
    pub format_note: Option<String>,
    /// Resolution such as "1280x720" or "audio only"
    #[serde(default)]
    pub resolution: Option<String>,
    /// Container extension
    #[serde(default)]
    pub ext: Option<String>,
    /// Video codec, "none" for audio-only formats
    #[serde(default)]
    pub vcodec: Option<String>,
    /// Audio codec, "none" for video-only formats
    #[serde(default)]
    pub acodec: Option<String>,
    /// Exact size in bytes when known
    #[serde(default)]
    pub filesize: Option<f64>,
}

impl RawFormat {
    /// Carries a video stream (an absent codec field counts as present)
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }

    /// Carries an audio stream (an absent codec field counts as present)
    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref() != Some("none")
    }
}

/// A media extraction engine
///
/// Implementations may fail transiently; the orchestrator owns timeouts,
/// retries and the credential fallback.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Get the name of this implementation
    fn name(&self) -> &'static str;

    /// Version string of the underlying engine
    async fn version(&self) -> crate::Result<String>;

    /// Fetch metadata for a URL
    async fn extract(&self, request: &ExtractRequest) -> crate::Result<RawMetadata>;

    /// Download into the job's output template and return the produced path
    async fn download(&self, request: &DownloadRequest) -> crate::Result<PathBuf>;
}
