//! Health, statistics and retention reporting.

use crate::error::Result;
use crate::types::{CleanupReport, HealthState, HealthStatus, ServiceStats};
use crate::utils::bytes_to_mb;

use super::MediaService;

impl MediaService {
    /// Check the backend and the store filesystem
    ///
    /// Healthy only when the backend reports a version and free space on the
    /// store filesystem can be read. Never fails; problems are reported in
    /// the returned status.
    pub async fn health_status(&self) -> HealthStatus {
        let backend = self.orchestrator.backend_version().await;
        let disk = self.store.free_space();

        let error = match (&backend, &disk) {
            (Err(e), _) => Some(e.to_string()),
            (_, Err(e)) => Some(e.to_string()),
            _ => None,
        };
        if let Some(reason) = &error {
            tracing::warn!(error = %reason, "Health check failed");
        }

        HealthStatus {
            status: if error.is_none() {
                HealthState::Healthy
            } else {
                HealthState::Unhealthy
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            backend_version: backend.ok(),
            disk_free_bytes: disk.ok(),
            uptime_seconds: self.uptime_seconds(),
            error,
        }
    }

    /// Artifact count, sizes and uptime
    pub async fn stats(&self) -> Result<ServiceStats> {
        let stats = self.store.directory_stats().await?;
        Ok(ServiceStats {
            downloads_count: stats.count,
            total_size_mb: bytes_to_mb(stats.total_bytes),
            uptime_seconds: self.uptime_seconds(),
            download_dir: self.store.root().to_path_buf(),
            free_space_mb: bytes_to_mb(stats.free_bytes),
        })
    }

    /// Age distribution of stored artifacts
    pub async fn cleanup_report(&self) -> Result<CleanupReport> {
        self.retention.report().await
    }
}
