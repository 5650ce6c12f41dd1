//! yt-dlp backend using the external binary

use super::parser::{failure_message, parse_download_path, parse_metadata};
use super::traits::{DownloadRequest, ExtractRequest, ExtractionBackend, RawMetadata};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::types::MediaKind;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Backend that executes the `yt-dlp` binary
///
/// Every call spawns one child process with `kill_on_drop`, so dropping the
/// call's future (for example on timeout) terminates the process.
///
/// # Examples
///
/// ```no_run
/// use vinyltube::backend::{ExtractionBackend, YtDlpBackend};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit path
/// let backend = YtDlpBackend::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let backend = YtDlpBackend::from_path().expect("yt-dlp not found in PATH");
///
/// println!("yt-dlp {}", backend.version().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    binary_path: PathBuf,
}

impl YtDlpBackend {
    /// Create a backend with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Locate the binary according to configuration
    ///
    /// An explicit `binary_path` wins; otherwise PATH is searched when allowed.
    pub fn locate(config: &BackendConfig) -> Option<Self> {
        match &config.binary_path {
            Some(path) => Some(Self::new(path.clone())),
            None if config.search_path => Self::from_path(),
            None => None,
        }
    }

    /// Path of the binary this backend runs
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    async fn run(&self, args: Vec<OsString>) -> Result<Output> {
        tracing::debug!(binary = %self.binary_path.display(), ?args, "Running yt-dlp");
        Command::new(&self.binary_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::BackendUnavailable(format!(
                        "{} not found",
                        self.binary_path.display()
                    ))
                } else {
                    Error::BackendFailure(format!("failed to execute yt-dlp: {e}"))
                }
            })
    }
}

/// Arguments for a metadata lookup
pub(crate) fn extract_args(request: &ExtractRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--dump-single-json".into(),
        "--no-warnings".into(),
        "--no-playlist".into(),
        "--socket-timeout".into(),
        request.socket_timeout.as_secs().max(1).to_string().into(),
        "--retries".into(),
        request.retries.to_string().into(),
    ];
    if request.flat {
        args.push("--flat-playlist".into());
    }
    args.push("--".into());
    args.push(request.url.clone().into());
    args
}

/// Arguments for one download attempt
pub(crate) fn download_args(request: &DownloadRequest) -> Vec<OsString> {
    let job = &request.job;
    let mut args: Vec<OsString> = vec![
        "--no-warnings".into(),
        "--no-playlist".into(),
        "--no-progress".into(),
        "-f".into(),
        job.format_selector.clone().into(),
        "-o".into(),
        job.output_template.clone().into(),
        "--socket-timeout".into(),
        request.socket_timeout.as_secs().max(1).to_string().into(),
        "--retries".into(),
        request.retries.to_string().into(),
        "--fragment-retries".into(),
        request.fragment_retries.to_string().into(),
        "--retry-sleep".into(),
        "fragment:exp=1:20".into(),
    ];
    if let Some(browser) = &request.cookies_from_browser {
        args.push("--cookies-from-browser".into());
        args.push(browser.clone().into());
    }
    if job.media_kind == MediaKind::Audio {
        args.extend([
            OsString::from("--extract-audio"),
            "--audio-format".into(),
            request.audio_codec.clone().into(),
            "--audio-quality".into(),
            request.audio_quality.clone().into(),
        ]);
    }
    args.extend([
        OsString::from("--print"),
        "after_move:filepath".into(),
        "--no-simulate".into(),
        "--".into(),
        job.source_url.clone().into(),
    ]);
    args
}

#[async_trait]
impl ExtractionBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn version(&self) -> Result<String> {
        let output = self.run(vec!["--version".into()]).await?;
        if !output.status.success() {
            return Err(Error::BackendFailure(failure_message(
                &output.stderr,
                output.status.code(),
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<RawMetadata> {
        let output = self.run(extract_args(request)).await?;
        if !output.status.success() {
            return Err(Error::BackendFailure(failure_message(
                &output.stderr,
                output.status.code(),
            )));
        }
        parse_metadata(&output.stdout)
    }

    async fn download(&self, request: &DownloadRequest) -> Result<PathBuf> {
        let output = self.run(download_args(request)).await?;
        if !output.status.success() {
            return Err(Error::BackendFailure(failure_message(
                &output.stderr,
                output.status.code(),
            )));
        }
        parse_download_path(&output.stdout)
    }
}
