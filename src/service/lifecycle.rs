//! Construction, startup and shutdown.

use crate::backend::{ExtractionBackend, UnavailableBackend, YtDlpBackend};
use crate::cleanup_scheduler::CleanupScheduler;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::orchestrator::DownloadOrchestrator;
use crate::rate_limiter::RateLimiter;
use crate::retention::RetentionManager;
use crate::store::ArtifactStore;
use crate::types::{RetentionPolicy, SchedulerState};
use std::sync::Arc;
use std::time::Instant;

use super::MediaService;

impl MediaService {
    /// Create a new MediaService instance
    ///
    /// Validates the configuration, creates the store directories and locates
    /// the yt-dlp binary. When the binary cannot be found the service still
    /// starts: listing, serving and cleanup keep working, extraction and
    /// downloads fail with `BackendUnavailable` and health reports unhealthy.
    pub async fn new(config: Config) -> Result<Self> {
        let backend: Arc<dyn ExtractionBackend> = match YtDlpBackend::locate(&config.backend) {
            Some(backend) => {
                tracing::info!(binary = %backend.binary_path().display(), "Using yt-dlp backend");
                Arc::new(backend)
            }
            None => {
                tracing::warn!("yt-dlp not found, extraction and downloads are disabled");
                Arc::new(UnavailableBackend::new("yt-dlp not found in PATH"))
            }
        };
        Self::with_backend(config, backend).await
    }

    /// Create a MediaService around an explicit extraction backend
    pub async fn with_backend(config: Config, backend: Arc<dyn ExtractionBackend>) -> Result<Self> {
        config.validate()?;

        let store = ArtifactStore::new(&config.store.download_dir, &config.store.static_dir);
        store.ensure_directories().await.map_err(|e| match e {
            Error::Io(io) => Error::Io(std::io::Error::new(
                io.kind(),
                format!(
                    "Failed to create download directory '{}': {}",
                    config.store.download_dir.display(),
                    io
                ),
            )),
            other => other,
        })?;

        let policy = RetentionPolicy {
            max_age: config.retention.max_age,
            max_total_bytes: config.retention.max_total_bytes,
            sweep_orphans: config.retention.sweep_orphans,
            stale_partial_age: longest_download(&config),
        };
        let retention = Arc::new(RetentionManager::new(store.clone(), policy));
        let scheduler = Arc::new(CleanupScheduler::new(
            retention.clone(),
            store.clone(),
            config.retention.cleanup_interval,
            config.retention.error_backoff,
        ));
        let orchestrator = Arc::new(DownloadOrchestrator::new(
            backend,
            store.clone(),
            config.backend.clone(),
            config.retry.clone(),
        )?);
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        tracing::info!(
            download_dir = %config.store.download_dir.display(),
            backend = orchestrator.backend_name(),
            "Media service created"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            retention,
            scheduler,
            orchestrator,
            rate_limiter,
            started_at: Instant::now(),
        })
    }

    /// Start background work (the cleanup scheduler)
    ///
    /// Calling this on a running service is a no-op.
    pub async fn start(&self) -> Result<()> {
        self.store.ensure_directories().await?;
        self.scheduler.start().await;
        tracing::info!(
            interval_secs = self.config.retention.cleanup_interval.as_secs(),
            "Cleanup scheduler started"
        );
        Ok(())
    }

    /// Gracefully shut down the service
    ///
    /// Stops admitting backend jobs and stops the cleanup scheduler. A
    /// cleanup pass already in progress completes first.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");
        self.orchestrator.close();
        self.scheduler.stop().await;
        tracing::info!("Shutdown complete");
        Ok(())
    }

    /// State of the background cleanup loop
    pub async fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state().await
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on `api.bind_address` until the task is aborted or
    /// the listener fails.
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let service = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(service, config).await })
    }
}

/// Longest time one download can keep writing: every retry attempt plus its
/// cookie-less fallback, each under the full download timeout
fn longest_download(config: &Config) -> std::time::Duration {
    let attempts = config.retry.max_attempts.saturating_add(1).saturating_mul(2);
    config
        .backend
        .download_timeout
        .checked_mul(attempts)
        .unwrap_or(std::time::Duration::MAX)
}
