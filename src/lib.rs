//! # vinyltube
//!
//! Backend library for a media fetch-and-serve service: it extracts metadata
//! and downloads media through an external extraction backend (`yt-dlp`),
//! keeps the resulting files in a bounded, self-cleaning artifact store and
//! serves them back over HTTP.
//!
//! ## Components
//!
//! - [`RateLimiter`] - per-client sliding-window admission control
//! - [`ArtifactStore`] - directory-backed registry of downloaded files
//! - [`RetentionManager`] - expiry by age, eviction by size, orphan sweep
//! - [`CleanupScheduler`] - background loop applying the retention policy
//! - [`DownloadOrchestrator`] - backend jobs with timeout, retry and fallback
//! - [`MediaService`] - facade owning one of each, bound to HTTP by [`api`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use vinyltube::{Config, MediaService, run_with_shutdown};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.apply_env_overrides()?;
//!
//!     let service = Arc::new(MediaService::new(config).await?);
//!     service.start().await?;
//!     let _api = service.spawn_api_server();
//!
//!     run_with_shutdown((*service).clone()).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Extraction backend abstraction and the yt-dlp implementation
pub mod backend;
/// Background cleanup loop
pub mod cleanup_scheduler;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Backend job execution
pub mod orchestrator;
/// Per-client sliding-window rate limiting
pub mod rate_limiter;
/// Retention policy over the artifact store
pub mod retention;
/// Retry logic with exponential backoff
pub mod retry;
/// Media service facade (decomposed into focused submodules)
pub mod service;
/// Directory-backed artifact store
pub mod store;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use backend::{ExtractionBackend, UnavailableBackend, YtDlpBackend};
pub use cleanup_scheduler::CleanupScheduler;
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use orchestrator::DownloadOrchestrator;
pub use rate_limiter::RateLimiter;
pub use retention::RetentionManager;
pub use service::MediaService;
pub use store::ArtifactStore;
pub use types::{
    ArtifactRecord, CleanupReport, DownloadOutcome, ExtractMode, FormatInfo, HealthState,
    HealthStatus, MediaKind, RetentionPolicy, SchedulerState, ServiceStats, SweepSummary,
    VideoMetadata,
};

/// Helper function to run the service with graceful signal handling.
///
/// Waits for a termination signal and then calls the service's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use vinyltube::{MediaService, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = MediaService::new(Config::default()).await?;
///     service.start().await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(service).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(service: MediaService) -> Result<()> {
    wait_for_signal().await;
    service.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
