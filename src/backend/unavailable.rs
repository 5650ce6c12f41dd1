//! Backend used when no extraction engine could be located

use super::traits::{DownloadRequest, ExtractRequest, ExtractionBackend, RawMetadata};
use async_trait::async_trait;
use std::path::PathBuf;

/// Stand-in backend that fails every call with `BackendUnavailable`
///
/// Lets the service start without yt-dlp installed: file listing, serving and
/// cleanup keep working and the health check reports the problem.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    /// Create a stand-in that reports `reason`
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> crate::Error {
        crate::Error::BackendUnavailable(self.reason.clone())
    }
}

#[async_trait]
impl ExtractionBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn version(&self) -> crate::Result<String> {
        Err(self.error())
    }

    async fn extract(&self, _request: &ExtractRequest) -> crate::Result<RawMetadata> {
        Err(self.error())
    }

    async fn download(&self, _request: &DownloadRequest) -> crate::Result<PathBuf> {
        Err(self.error())
    }
}
