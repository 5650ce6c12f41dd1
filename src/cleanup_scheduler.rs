//! Background cleanup loop
//!
//! The scheduler runs one retention pass, sleeps for the cleanup interval and
//! repeats until stopped. A failed pass is logged and followed by a fixed
//! backoff; nothing but cancellation ends the loop. Cancellation is observed
//! only while sleeping, so a pass that has started always finishes.

use crate::error::Result;
use crate::retention::RetentionManager;
use crate::store::ArtifactStore;
use crate::types::{SchedulerState, SweepSummary};
use crate::utils::bytes_to_mb;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Shared pieces of one retention pass
#[derive(Clone)]
struct PassRunner {
    retention: Arc<RetentionManager>,
    store: ArtifactStore,
    // Serializes forced and scheduled passes
    pass_lock: Arc<Mutex<()>>,
}

impl PassRunner {
    async fn run(&self) -> Result<SweepSummary> {
        let _guard = self.pass_lock.lock().await;
        let policy = self.retention.policy();
        let summary = self.retention.sweep(&policy).await?;

        if summary.total() > 0 {
            match self.store.directory_stats().await {
                Ok(stats) => info!(
                    deleted = summary.total(),
                    files = stats.count,
                    total_mb = bytes_to_mb(stats.total_bytes),
                    free_mb = bytes_to_mb(stats.free_bytes),
                    "Cleanup removed artifacts"
                ),
                Err(e) => warn!(error = %e, "Cleanup finished but directory stats are unavailable"),
            }
        }
        Ok(summary)
    }
}

/// Periodically applies the retention policy in the background
pub struct CleanupScheduler {
    runner: PassRunner,
    interval: Duration,
    error_backoff: Duration,
    running: Mutex<Option<RunningLoop>>,
}

impl CleanupScheduler {
    /// Create a stopped scheduler
    pub fn new(
        retention: Arc<RetentionManager>,
        store: ArtifactStore,
        interval: Duration,
        error_backoff: Duration,
    ) -> Self {
        Self {
            runner: PassRunner {
                retention,
                store,
                pass_lock: Arc::new(Mutex::new(())),
            },
            interval,
            error_backoff,
            running: Mutex::new(None),
        }
    }

    /// Spawn the loop; a no-op when already running
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.runner.clone(),
            self.interval,
            self.error_backoff,
            cancel.clone(),
        ));
        *running = Some(RunningLoop { cancel, handle });
    }

    /// Stop the loop and wait for it to exit
    ///
    /// A pass already in progress completes first.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            warn!(error = %e, "Cleanup loop ended abnormally");
        }
    }

    /// Run one pass now, independent of the loop
    pub async fn force_cleanup(&self) -> Result<SweepSummary> {
        info!("Forced cleanup requested");
        self.runner.run().await
    }

    /// Whether the loop is running
    pub async fn state(&self) -> SchedulerState {
        match self.running.lock().await.as_ref() {
            Some(r) if !r.handle.is_finished() => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.try_lock()
            && let Some(running) = running.take()
        {
            running.cancel.cancel();
        }
    }
}

async fn run_loop(
    runner: PassRunner,
    interval: Duration,
    error_backoff: Duration,
    cancel: CancellationToken,
) {
    info!(
        interval_secs = interval.as_secs(),
        "Cleanup scheduler started"
    );

    loop {
        let wait = match runner.run().await {
            Ok(_) => interval,
            Err(e) => {
                error!(
                    error = %e,
                    backoff_secs = error_backoff.as_secs(),
                    "Cleanup pass failed"
                );
                error_backoff
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }

    info!("Cleanup scheduler stopped");
}
