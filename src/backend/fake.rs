//! Scripted in-process backend for tests

use super::traits::{DownloadRequest, ExtractRequest, ExtractionBackend, RawFormat, RawMetadata};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Outcome of one scripted download call
#[derive(Debug, Clone)]
pub(crate) enum FakeDownload {
    /// Write `bytes` bytes to `<root>/<title>_[<id>].<ext>` and report it
    Write { title: String, ext: String, bytes: usize },
    /// Leave a `.part` file behind and fail with the message
    FailWithPartial(String),
    /// Fail with the message
    Fail(String),
    /// Sleep, then write like `Write`
    Hang(Duration),
    /// Write the file outside the store root and report that path
    Outside(PathBuf),
    /// Report a path that is still in progress
    ReportPartial,
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub metadata: Mutex<RawMetadata>,
    pub extract_error: Mutex<Option<String>>,
    pub extract_delay: Mutex<Option<Duration>>,
    pub script: Mutex<VecDeque<FakeDownload>>,
    pub requests: Mutex<Vec<DownloadRequest>>,
    pub extract_requests: Mutex<Vec<ExtractRequest>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            metadata: Mutex::new(sample_metadata()),
            ..Default::default()
        }
    }

    pub fn push(&self, step: FakeDownload) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn download_requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn output_dir(request: &DownloadRequest) -> PathBuf {
        Path::new(&request.job.output_template)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    fn write(request: &DownloadRequest, title: &str, ext: &str, bytes: usize) -> PathBuf {
        let path = Self::output_dir(request).join(format!("{title}_[{}].{ext}", request.job.video_id));
        std::fs::write(&path, vec![0xAB; bytes]).unwrap();
        path
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) fn sample_metadata() -> RawMetadata {
    RawMetadata {
        title: Some("Test Song".into()),
        thumbnail: Some("https://i.ytimg.com/vi/abc123/maxres.jpg".into()),
        uploader: Some("Test Artist".into()),
        duration: Some(212.4),
        formats: vec![
            RawFormat {
                format_id: Some("140".into()),
                format_note: Some("medium".into()),
                ext: Some("m4a".into()),
                vcodec: Some("none".into()),
                acodec: Some("mp4a.40.2".into()),
                filesize: Some(3_145_728.0),
                ..Default::default()
            },
            RawFormat {
                format_id: Some("137".into()),
                resolution: Some("1920x1080".into()),
                ext: Some("mp4".into()),
                vcodec: Some("avc1".into()),
                acodec: Some("none".into()),
                ..Default::default()
            },
            RawFormat {
                format_id: Some("sb0".into()),
                format_note: Some("storyboard".into()),
                ext: Some("mhtml".into()),
                vcodec: Some("none".into()),
                acodec: Some("none".into()),
                ..Default::default()
            },
        ],
    }
}

#[async_trait]
impl ExtractionBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn version(&self) -> crate::Result<String> {
        Ok("2024.08.06-fake".into())
    }

    async fn extract(&self, request: &ExtractRequest) -> crate::Result<RawMetadata> {
        self.extract_requests.lock().unwrap().push(request.clone());
        let delay = *self.extract_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(msg) = self.extract_error.lock().unwrap().clone() {
            return Err(crate::Error::BackendFailure(msg));
        }
        Ok(self.metadata.lock().unwrap().clone())
    }

    async fn download(&self, request: &DownloadRequest) -> crate::Result<PathBuf> {
        self.requests.lock().unwrap().push(request.clone());
        let step = self.script.lock().unwrap().pop_front().unwrap_or(FakeDownload::Write {
            title: "Test Song".into(),
            ext: "mp4".into(),
            bytes: 2048,
        });

        self.enter();
        let result = match step {
            FakeDownload::Write { title, ext, bytes } => Ok(Self::write(request, &title, &ext, bytes)),
            FakeDownload::FailWithPartial(msg) => {
                Self::write(request, "Test Song", "mp4.part", 512);
                Err(crate::Error::BackendFailure(msg))
            }
            FakeDownload::Fail(msg) => Err(crate::Error::BackendFailure(msg)),
            FakeDownload::Hang(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Self::write(request, "Test Song", "mp4", 2048))
            }
            FakeDownload::Outside(dir) => {
                let path = dir.join(format!("Escaped_[{}].mp4", request.job.video_id));
                std::fs::write(&path, b"outside").unwrap();
                Ok(path)
            }
            FakeDownload::ReportPartial => Ok(Self::write(request, "Test Song", "mp4.part", 512)),
        };
        self.leave();
        result
    }
}
