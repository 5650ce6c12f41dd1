//! Artifact serving, listing, deletion and cleanup.

use crate::error::Result;
use crate::types::{ArtifactRecord, SweepSummary};

use super::MediaService;

impl MediaService {
    /// Open an artifact for streaming to a client
    ///
    /// Fails with `NotFound` when the file is absent or still in progress and
    /// with `TooLarge` when it exceeds `store.max_file_size`.
    pub async fn fetch_artifact(&self, filename: &str) -> Result<(tokio::fs::File, ArtifactRecord)> {
        self.store
            .open_artifact(filename, self.config.store.max_file_size)
            .await
    }

    /// Every stored artifact, most recently modified first
    pub async fn list_artifacts(&self) -> Result<Vec<ArtifactRecord>> {
        self.store.list().await
    }

    /// Delete an artifact; false when it did not exist
    pub async fn delete_artifact(&self, filename: &str) -> Result<bool> {
        let deleted = self.store.delete(filename).await?;
        if deleted {
            tracing::info!(filename, "Artifact deleted on request");
        }
        Ok(deleted)
    }

    /// Run one retention pass now
    pub async fn trigger_cleanup(&self) -> Result<SweepSummary> {
        self.scheduler.force_cleanup().await
    }
}
