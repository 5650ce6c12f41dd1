//! Metadata extraction and downloads.

use crate::error::Result;
use crate::types::{DownloadOutcome, ExtractMode, MediaKind, VideoMetadata};

use super::MediaService;

impl MediaService {
    /// Basic metadata without format enumeration
    ///
    /// The returned `formats` list is always empty.
    pub async fn extract_fast(&self, url: &str) -> Result<VideoMetadata> {
        self.orchestrator.extract(url, ExtractMode::Fast).await
    }

    /// Full metadata including every format with audio or video
    pub async fn extract_full(&self, url: &str) -> Result<VideoMetadata> {
        self.orchestrator.extract(url, ExtractMode::Full).await
    }

    /// Download a format into the store
    ///
    /// `format_id` is ignored for audio, which always takes the best audio
    /// stream and transcodes it.
    pub async fn download(
        &self,
        url: &str,
        format_id: &str,
        kind: MediaKind,
    ) -> Result<DownloadOutcome> {
        self.orchestrator.download(url, format_id, kind).await
    }
}
