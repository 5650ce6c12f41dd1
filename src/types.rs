//! Core types for vinyltube

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use utoipa::ToSchema;

/// What a download produces
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Video stream in the selected format
    #[default]
    Video,
    /// Best audio stream, transcoded to mp3
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// How much metadata an extraction asks the backend for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractMode {
    /// Flat extraction: title, thumbnail, author, duration; no formats
    Fast,
    /// Full extraction with format enumeration
    Full,
}

impl ExtractMode {
    /// Operation name used in timeout errors and logs
    pub fn operation(&self) -> &'static str {
        match self {
            ExtractMode::Fast => "fast extraction",
            ExtractMode::Full => "extraction",
        }
    }
}

/// A file in the artifact store, derived from its metadata on demand
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ArtifactRecord {
    /// Name of the file directly under the store root
    pub filename: String,
    /// Size on disk
    pub size_bytes: u64,
    /// Size in megabytes, rounded to two decimals
    pub size_mb: f64,
    /// Creation time (falls back to the modification time where unsupported)
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
    /// Relative URL serving the file
    pub download_url: String,
}

/// One download request, constructed per call and never stored
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadJob {
    /// Page URL of the media
    pub source_url: String,
    /// Backend format selector (`bestaudio/best` for audio jobs)
    pub format_selector: String,
    /// Video or audio
    pub media_kind: MediaKind,
    /// Backend output template rooted in the store directory
    pub output_template: String,
    /// Video id derived from the URL, used to find leftovers of this job
    pub video_id: String,
}

impl DownloadJob {
    /// Audio jobs ignore the requested format and take the best audio stream
    pub const AUDIO_SELECTOR: &'static str = "bestaudio/best";

    /// Build a job writing into `root`
    pub fn new(
        source_url: impl Into<String>,
        video_id: impl Into<String>,
        format_id: &str,
        media_kind: MediaKind,
        root: &Path,
    ) -> Self {
        let format_selector = match media_kind {
            MediaKind::Audio => Self::AUDIO_SELECTOR.to_string(),
            MediaKind::Video => format_id.to_string(),
        };
        Self {
            source_url: source_url.into(),
            format_selector,
            media_kind,
            output_template: root
                .join("%(title)s_[%(id)s].%(ext)s")
                .to_string_lossy()
                .into_owned(),
            video_id: video_id.into(),
        }
    }
}

/// A downloadable format reported by full extraction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormatInfo {
    /// Backend format identifier, passed back as the download selector
    #[serde(rename = "itag")]
    pub format_id: String,
    /// Format note, else resolution, else "Unknown"
    pub quality: String,
    /// Container extension
    pub container: String,
    /// Carries an audio stream
    pub has_audio: bool,
    /// Carries a video stream
    pub has_video: bool,
    /// `"12.3 MB"` when the backend knows the size
    #[serde(rename = "fileSize")]
    pub size_label: Option<String>,
    /// Video when a video codec is present, else audio
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

/// Metadata returned by extraction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    /// Title
    pub title: String,
    /// Thumbnail URL
    pub thumbnail: String,
    /// Uploader
    pub author: String,
    /// Duration in seconds
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
    /// Video id derived from the URL
    pub video_id: String,
    /// The URL as submitted
    #[serde(rename = "url")]
    pub source_url: String,
    /// Available formats (always empty in fast mode)
    pub formats: Vec<FormatInfo>,
    /// Whether this came from fast extraction
    pub fast_mode: bool,
}

/// Result of a successful download
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOutcome {
    /// Always true; failures are errors
    pub success: bool,
    /// Percent-encoded URL serving the artifact
    pub download_url: String,
    /// Artifact filename
    pub filename: String,
    /// `"12.3 MB"`
    #[serde(rename = "fileSize")]
    pub size_label: String,
    /// Duration of the media when known
    pub duration: Option<u64>,
    /// Status message
    pub message: String,
    /// Full record of the stored artifact
    pub record: ArtifactRecord,
}

/// Aggregate figures for the store directory
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DirectoryStats {
    /// Number of artifacts
    pub count: usize,
    /// Sum of artifact sizes
    pub total_bytes: u64,
    /// Free bytes on the filesystem holding the store
    pub free_bytes: u64,
}

/// Thresholds applied by one retention pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Artifacts older than this are expired
    pub max_age: Duration,
    /// Aggregate size cap (0 disables eviction)
    pub max_total_bytes: u64,
    /// Whether empty or unreadable files are removed
    pub sweep_orphans: bool,
    /// In-progress files untouched for longer than this are removed (zero disables)
    pub stale_partial_age: Duration,
}

/// Deletions performed by one retention pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SweepSummary {
    /// Removed for exceeding the age threshold
    pub expired: usize,
    /// Removed to get under the size cap
    pub evicted: usize,
    /// Removed for being empty or unreadable
    pub orphans: usize,
    /// Abandoned in-progress backend files
    #[serde(default)]
    pub partials: usize,
}

impl SweepSummary {
    /// Total number of deleted artifacts
    pub fn total(&self) -> usize {
        self.expired + self.evicted + self.orphans + self.partials
    }
}

/// Age entry in a cleanup report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AgedArtifact {
    /// Artifact filename
    pub filename: String,
    /// Age in hours, one decimal
    pub age_hours: f64,
    /// Size in megabytes, two decimals
    pub size_mb: f64,
}

/// Snapshot of the store's age distribution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CleanupReport {
    /// Number of artifacts
    pub total_files: usize,
    /// Sum of artifact sizes in megabytes
    pub total_size_mb: f64,
    /// Free space in megabytes
    pub free_space_mb: f64,
    /// Five oldest artifacts, oldest first
    pub oldest_files: Vec<AgedArtifact>,
    /// Artifacts older than 24 hours
    pub files_older_than_24h: usize,
    /// Artifacts older than one week
    pub files_older_than_1week: usize,
    /// Configured retention in hours
    pub retention_hours: f64,
}

/// Overall service health
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Backend reachable and store usable
    Healthy,
    /// Backend missing or store unusable
    Unhealthy,
}

/// Health report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    /// healthy or unhealthy
    pub status: HealthState,
    /// Crate version
    pub version: String,
    /// Version string reported by the extraction backend
    pub backend_version: Option<String>,
    /// Free bytes in the store directory
    pub disk_free_bytes: Option<u64>,
    /// Seconds since the service was created
    pub uptime_seconds: f64,
    /// Reason for an unhealthy status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    /// Whether the status is healthy
    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

/// Service statistics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceStats {
    /// Number of stored artifacts
    pub downloads_count: usize,
    /// Sum of artifact sizes in megabytes
    pub total_size_mb: f64,
    /// Seconds since the service was created
    pub uptime_seconds: f64,
    /// Store directory
    #[schema(value_type = String)]
    pub download_dir: PathBuf,
    /// Free space in megabytes
    pub free_space_mb: f64,
}

/// State of the background cleanup loop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Loop is active
    Running,
    /// Loop is not active
    Stopped,
}
