//! Download orchestration
//!
//! Runs extraction and download jobs against an [`ExtractionBackend`]:
//! - URLs are validated and a video id is derived before the backend is called
//! - every backend call runs on its own task, gated by a semaphore and bounded
//!   by a timeout; a timed-out call is dropped, which kills the child process
//! - downloads fall back to an anonymous attempt when browser cookies are the
//!   problem, and transient failures are retried with backoff
//! - the produced file must be a complete, non-empty regular file directly in
//!   the store root; anything else is deleted and reported as a failure

use crate::backend::{DownloadRequest, ExtractRequest, ExtractionBackend, RawMetadata, is_credential_failure};
use crate::config::{BackendConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::store::ArtifactStore;
use crate::types::{
    DownloadJob, DownloadOutcome, ExtractMode, FormatInfo, MediaKind, VideoMetadata,
};
use crate::utils::{format_size_label, is_partial_file};
use regex::Regex;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const DEFAULT_TITLE: &str = "Untitled video";
const DEFAULT_AUTHOR: &str = "YouTube";
const DEFAULT_QUALITY: &str = "Unknown";
const DEFAULT_CONTAINER: &str = "mp4";
const READY_MESSAGE: &str = "File ready for download";

/// Time budget for the backend version probe
const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend retries during metadata extraction
const EXTRACT_RETRIES: u32 = 1;

/// Recognized page URL shapes and video id patterns
#[derive(Debug)]
struct UrlRules {
    accepted: Vec<Regex>,
    video_id: Vec<Regex>,
}

impl UrlRules {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Config {
                message: format!("invalid URL pattern {pattern:?}: {e}"),
                key: None,
            })
        };
        Ok(Self {
            accepted: [
                r"^https?://(?:www\.)?youtube\.com/watch\?v=[\w-]+",
                r"^https?://(?:www\.)?youtu\.be/[\w-]+",
                r"^https?://(?:www\.)?youtube\.com/embed/[\w-]+",
            ]
            .into_iter()
            .map(compile)
            .collect::<Result<_>>()?,
            video_id: [
                r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&?\n]+)",
                r"youtube\.com/watch\?.*v=([^&?\n]+)",
            ]
            .into_iter()
            .map(compile)
            .collect::<Result<_>>()?,
        })
    }

    fn video_id(&self, url: &str) -> Option<String> {
        self.video_id
            .iter()
            .find_map(|re| re.captures(url))
            .and_then(|c| c.get(1))
            // yt-dlp's id never carries a fragment or a trailing path segment
            .and_then(|m| m.as_str().split(['#', '/']).next())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// Executes extraction and download jobs against the backend
pub struct DownloadOrchestrator {
    backend: Arc<dyn ExtractionBackend>,
    store: ArtifactStore,
    config: BackendConfig,
    retry: RetryConfig,
    permits: Arc<Semaphore>,
    rules: UrlRules,
}

impl DownloadOrchestrator {
    /// Create an orchestrator writing into `store`
    pub fn new(
        backend: Arc<dyn ExtractionBackend>,
        store: ArtifactStore,
        config: BackendConfig,
        retry: RetryConfig,
    ) -> Result<Self> {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Ok(Self {
            backend,
            store,
            config,
            retry,
            permits,
            rules: UrlRules::new()?,
        })
    }

    /// Name of the backend implementation
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Validate a page URL and derive its video id
    pub fn video_id(&self, url: &str) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::InvalidInput("URL is required".into()));
        }
        let parsed =
            url::Url::parse(url).map_err(|e| Error::InvalidInput(format!("malformed URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidInput(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }
        if !self.rules.accepted.iter().any(|re| re.is_match(url)) {
            return Err(Error::InvalidInput("not a supported YouTube URL".into()));
        }
        self.rules
            .video_id(url)
            .ok_or_else(|| Error::InvalidInput("no video id in URL".into()))
    }

    /// Fetch metadata for a page URL
    pub async fn extract(&self, url: &str, mode: ExtractMode) -> Result<VideoMetadata> {
        let video_id = self.video_id(url)?;
        let limit = match mode {
            ExtractMode::Fast => self.config.fast_extract_timeout,
            ExtractMode::Full => self.config.full_extract_timeout,
        };
        let request = ExtractRequest {
            url: url.trim().to_string(),
            flat: mode == ExtractMode::Fast,
            socket_timeout: limit / 2,
            retries: EXTRACT_RETRIES,
        };

        debug!(video_id = %video_id, ?mode, "Extracting metadata");
        let backend = self.backend.clone();
        let raw = self
            .run_job(mode.operation(), limit, async move { backend.extract(&request).await })
            .await
            .inspect_err(|e| warn!(video_id = %video_id, error = %e, "Extraction failed"))?;

        Ok(build_metadata(raw, &video_id, url.trim(), mode))
    }

    /// Download a format into the store and return the stored artifact
    pub async fn download(
        &self,
        url: &str,
        format_id: &str,
        kind: MediaKind,
    ) -> Result<DownloadOutcome> {
        let video_id = self.video_id(url)?;
        if kind == MediaKind::Video {
            validate_format_selector(format_id)?;
        }
        let job = DownloadJob::new(url.trim(), &video_id, format_id, kind, self.store.root());
        let marker = format!("[{video_id}]");

        info!(video_id = %video_id, format = %job.format_selector, kind = %kind, "Starting download");

        let produced = with_retry(&self.retry, || self.attempt_with_fallback(&job)).await;
        let produced = match produced {
            Ok(path) => path,
            Err(e) => {
                let removed = self.store.remove_partials(&marker).await;
                error!(video_id = %video_id, error = %e, partials_removed = removed, "Download failed");
                return Err(match e {
                    Error::BackendFailure(msg) => {
                        Error::BackendFailure(format!("download failed: {msg}"))
                    }
                    other => other,
                });
            }
        };

        match self.verify_artifact(&produced).await {
            Ok(record) => {
                info!(
                    filename = %record.filename,
                    size_bytes = record.size_bytes,
                    "Download complete"
                );
                Ok(DownloadOutcome {
                    success: true,
                    download_url: record.download_url.clone(),
                    filename: record.filename.clone(),
                    size_label: format_size_label(Some(record.size_bytes)).unwrap_or_default(),
                    duration: None,
                    message: READY_MESSAGE.to_string(),
                    record,
                })
            }
            Err(e) => {
                self.store.remove_partials(&marker).await;
                error!(video_id = %video_id, path = %produced.display(), error = %e, "Rejected produced file");
                Err(Error::BackendFailure(format!("download failed: {e}")))
            }
        }
    }

    /// Version string of the backend, for health reporting
    pub async fn backend_version(&self) -> Result<String> {
        // Health checks must answer while the pool is saturated
        let backend = self.backend.clone();
        run_until(
            "version check",
            VERSION_TIMEOUT,
            Instant::now() + VERSION_TIMEOUT,
            None,
            async move { backend.version().await },
        )
        .await
    }

    /// One download attempt, repeated once without cookies on a credential failure
    async fn attempt_with_fallback(&self, job: &DownloadJob) -> Result<std::path::PathBuf> {
        let first = self.attempt(job, self.config.cookies_from_browser.clone()).await;
        match first {
            Err(Error::BackendFailure(msg))
                if self.config.cookies_from_browser.is_some() && is_credential_failure(&msg) =>
            {
                warn!(error = %msg, "Browser credentials rejected, retrying without cookies");
                self.attempt(job, None).await
            }
            other => other,
        }
    }

    async fn attempt(
        &self,
        job: &DownloadJob,
        cookies_from_browser: Option<String>,
    ) -> Result<std::path::PathBuf> {
        let request = DownloadRequest {
            job: job.clone(),
            cookies_from_browser,
            socket_timeout: self.config.socket_timeout,
            retries: self.config.connection_retries,
            fragment_retries: self.config.fragment_retries,
            audio_codec: self.config.audio_codec.clone(),
            audio_quality: self.config.audio_quality.clone(),
        };
        let backend = self.backend.clone();
        self.run_job("download", self.config.download_timeout, async move {
            backend.download(&request).await
        })
        .await
    }

    /// Check that the backend's file is a finished, non-empty artifact in the root
    async fn verify_artifact(&self, produced: &Path) -> Result<crate::types::ArtifactRecord> {
        let name = produced
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| Error::BackendFailure("produced path has no file name".into()))?;

        if is_partial_file(&name) {
            discard(produced).await;
            return Err(Error::BackendFailure(format!("{name} is incomplete")));
        }

        let contained = match self.store.contain(produced).await {
            Ok(path) => path,
            Err(e @ Error::PathTraversal { .. }) => {
                discard(produced).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let filename = contained
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .unwrap_or(name);
        let record = self.store.stat(&filename).await?;
        if record.size_bytes == 0 {
            self.store.delete(&filename).await?;
            return Err(Error::BackendFailure(format!("{filename} is empty")));
        }
        Ok(record)
    }

    /// Run one backend call on its own task under a permit and a timeout
    ///
    /// The deadline starts before the permit is requested, so time spent
    /// queued behind other jobs counts against `limit`.
    async fn run_job<T, F>(&self, operation: &'static str, limit: Duration, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let deadline = Instant::now() + limit;
        let permit = match tokio::time::timeout_at(deadline, self.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_closed)) => return Err(Error::ShuttingDown),
            Err(_elapsed) => {
                warn!(operation, timeout_secs = limit.as_secs(), "Backend call timed out waiting for a slot");
                return Err(timed_out(operation, limit));
            }
        };
        run_until(operation, limit, deadline, Some(permit), job).await
    }

    /// Stop admitting new backend jobs
    pub fn close(&self) {
        self.permits.close();
    }
}

/// Spawn `job` and wait for it until `deadline`
///
/// Dropping the job on timeout kills the child process.
async fn run_until<T, F>(
    operation: &'static str,
    limit: Duration,
    deadline: Instant,
    permit: Option<OwnedSemaphorePermit>,
    job: F,
) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let _permit = permit;
        tokio::time::timeout_at(deadline, job).await
    });

    match handle.await {
        Ok(Ok(result)) => result,
        Ok(Err(_elapsed)) => {
            warn!(operation, timeout_secs = limit.as_secs(), "Backend call timed out");
            Err(timed_out(operation, limit))
        }
        Err(e) => Err(Error::BackendFailure(format!("{operation} task failed: {e}"))),
    }
}

fn timed_out(operation: &'static str, limit: Duration) -> Error {
    Error::BackendTimeout {
        operation,
        seconds: limit.as_secs(),
    }
}

/// Apply defaults and format rules to raw backend metadata
fn build_metadata(raw: RawMetadata, video_id: &str, url: &str, mode: ExtractMode) -> VideoMetadata {
    let formats = match mode {
        ExtractMode::Fast => Vec::new(),
        ExtractMode::Full => raw
            .formats
            .iter()
            .filter(|f| f.has_video() || f.has_audio())
            .map(|f| FormatInfo {
                format_id: f.format_id.clone().unwrap_or_default(),
                quality: f
                    .format_note
                    .clone()
                    .or_else(|| f.resolution.clone())
                    .unwrap_or_else(|| DEFAULT_QUALITY.to_string()),
                container: f
                    .ext
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
                has_audio: f.has_audio(),
                has_video: f.has_video(),
                size_label: format_size_label(f.filesize.map(|s| s.max(0.0) as u64)),
                kind: if f.has_video() {
                    MediaKind::Video
                } else {
                    MediaKind::Audio
                },
            })
            .collect(),
    };

    VideoMetadata {
        title: raw.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        thumbnail: raw
            .thumbnail
            .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")),
        author: raw.uploader.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        duration_seconds: raw.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0),
        video_id: video_id.to_string(),
        source_url: url.to_string(),
        formats,
        fast_mode: mode == ExtractMode::Fast,
    }
}

fn validate_format_selector(format_id: &str) -> Result<()> {
    let format_id = format_id.trim();
    if format_id.is_empty() {
        return Err(Error::InvalidInput("format is required".into()));
    }
    if format_id.starts_with('-') || format_id.chars().any(char::is_control) {
        return Err(Error::InvalidInput(format!(
            "invalid format selector: {format_id:?}"
        )));
    }
    Ok(())
}

/// Best-effort removal of a rejected file
async fn discard(path: &Path) {
    match tokio::fs::symlink_metadata(path).await {
        Ok(m) if m.is_file() => {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove rejected file");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests;
