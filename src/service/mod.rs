//! Media service facade split into focused submodules.
//!
//! The `MediaService` struct and its methods are organized by domain:
//! - [`lifecycle`] - Construction, startup and shutdown
//! - [`media`] - Metadata extraction and downloads
//! - [`files`] - Artifact serving, listing, deletion and cleanup
//! - [`system`] - Health, statistics and retention reporting

mod files;
mod lifecycle;
mod media;
mod system;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::cleanup_scheduler::CleanupScheduler;
use crate::config::Config;
use crate::orchestrator::DownloadOrchestrator;
use crate::rate_limiter::RateLimiter;
use crate::retention::RetentionManager;
use crate::store::ArtifactStore;
use std::sync::Arc;
use std::time::Instant;

/// Main service instance (cloneable - all fields are Arc-wrapped)
///
/// Owns one instance of each component: the artifact store, the retention
/// manager and its background scheduler, the download orchestrator and the
/// per-client rate limiter.
#[derive(Clone)]
pub struct MediaService {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Directory-backed artifact registry
    pub(crate) store: ArtifactStore,
    /// Retention policy layer over the store
    pub(crate) retention: Arc<RetentionManager>,
    /// Background cleanup loop
    pub(crate) scheduler: Arc<CleanupScheduler>,
    /// Backend job executor
    pub(crate) orchestrator: Arc<DownloadOrchestrator>,
    /// Admission control for extraction and download requests
    pub(crate) rate_limiter: Arc<RateLimiter>,
    /// Creation time, for uptime reporting
    pub(crate) started_at: Instant,
}

impl MediaService {
    /// Configuration the service was built with
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The artifact store
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The rate limiter shared with the HTTP layer
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Seconds since the service was created
    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
