//! Retention policy over the artifact store
//!
//! Three independent passes keep the store bounded:
//! - expiry by age, measured against the store directory's own mtime
//! - eviction by aggregate size, least recently modified first
//! - removal of empty or unreadable files
//! - removal of in-progress files a dead download left behind
//!
//! Deletions are best-effort. A file that cannot be removed is logged and left
//! for the next pass; it never aborts the current one.

use crate::error::Result;
use crate::store::ArtifactStore;
use crate::types::{AgedArtifact, CleanupReport, RetentionPolicy, SweepSummary};
use crate::utils::{bytes_to_mb, to_utc};
use chrono::Utc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Bytes read from each file when probing for corruption
const PROBE_BYTES: usize = 1024;

/// Number of entries in the report's oldest-files list
const REPORT_OLDEST: usize = 5;

/// Applies a [`RetentionPolicy`] to an [`ArtifactStore`]
#[derive(Clone, Debug)]
pub struct RetentionManager {
    store: ArtifactStore,
    policy: RetentionPolicy,
}

impl RetentionManager {
    /// Create a manager enforcing `policy` on `store`
    pub fn new(store: ArtifactStore, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    /// The configured policy
    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Delete artifacts older than `max_age`
    ///
    /// Age is the store directory's mtime minus the file's mtime. Files newer
    /// than the directory have age zero; a file exactly at the threshold stays.
    pub async fn expire_by_age(&self, max_age: Duration) -> Result<usize> {
        if !tokio::fs::try_exists(self.store.root()).await.unwrap_or(false) {
            return Ok(0);
        }
        let reference = to_utc(self.store.directory_modified().await?);
        let threshold = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);

        let mut deleted = 0;
        for record in self.store.list().await? {
            let age = (reference - record.modified_at).max(chrono::Duration::zero());
            if age <= threshold {
                continue;
            }
            if self.delete_logged(&record.filename, "expired").await {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Delete least recently modified artifacts until the total is at or below `max_total_bytes`
    pub async fn evict_by_size(&self, max_total_bytes: u64) -> Result<usize> {
        let mut records = self.store.list().await?;
        let mut total: u64 = records.iter().map(|r| r.size_bytes).sum();
        if total <= max_total_bytes {
            return Ok(0);
        }

        // Stable sort keeps listing order for equal mtimes
        records.sort_by_key(|r| r.modified_at);

        let mut deleted = 0;
        for record in records {
            if total <= max_total_bytes {
                break;
            }
            if self.delete_logged(&record.filename, "evicted").await {
                total = total.saturating_sub(record.size_bytes);
                deleted += 1;
            }
        }

        if total > max_total_bytes {
            tracing::warn!(
                total_bytes = total,
                max_total_bytes,
                "Store still above size cap after eviction"
            );
        }
        Ok(deleted)
    }

    /// Delete empty files and files whose first bytes cannot be read
    pub async fn sweep_orphans(&self) -> Result<usize> {
        let mut deleted = 0;
        for record in self.store.list().await? {
            let reason = if record.size_bytes == 0 {
                "empty"
            } else {
                match self.probe(&record.filename).await {
                    Ok(()) => continue,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => {
                        tracing::debug!(filename = %record.filename, error = %e, "Unreadable artifact");
                        "unreadable"
                    }
                }
            };
            if self.delete_logged(&record.filename, reason).await {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Delete in-progress files untouched for longer than `older_than`
    ///
    /// Idle time is measured against wall-clock time; a live download keeps
    /// touching its file.
    pub async fn sweep_partials(&self, older_than: Duration) -> Result<usize> {
        let mut deleted = 0;
        for name in self.store.stale_partials(older_than).await? {
            if self.delete_logged(&name, "abandoned").await {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Run expiry, eviction, the orphan sweep and the partial-file sweep in that order
    ///
    /// A zero `max_total_bytes` disables eviction; a zero `stale_partial_age`
    /// disables the partial-file sweep.
    pub async fn sweep(&self, policy: &RetentionPolicy) -> Result<SweepSummary> {
        let expired = self.expire_by_age(policy.max_age).await?;
        let evicted = if policy.max_total_bytes > 0 {
            self.evict_by_size(policy.max_total_bytes).await?
        } else {
            0
        };
        let orphans = if policy.sweep_orphans {
            self.sweep_orphans().await?
        } else {
            0
        };
        let partials = if policy.stale_partial_age.is_zero() {
            0
        } else {
            self.sweep_partials(policy.stale_partial_age).await?
        };

        let summary = SweepSummary {
            expired,
            evicted,
            orphans,
            partials,
        };
        if summary.total() > 0 {
            tracing::info!(expired, evicted, orphans, partials, "Retention pass deleted artifacts");
        } else {
            tracing::debug!("Retention pass found nothing to delete");
        }
        Ok(summary)
    }

    /// Age distribution of the store, measured against wall-clock time
    pub async fn report(&self) -> Result<CleanupReport> {
        let stats = self.store.directory_stats().await?;
        let now = Utc::now();

        let mut aged: Vec<AgedArtifact> = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|record| {
                let age_ms = (now - record.modified_at).num_milliseconds().max(0);
                AgedArtifact {
                    filename: record.filename,
                    age_hours: (age_ms as f64 / 360_000.0).round() / 10.0,
                    size_mb: record.size_mb,
                }
            })
            .collect();
        aged.sort_by(|a, b| b.age_hours.total_cmp(&a.age_hours));

        let files_older_than_24h = aged.iter().filter(|a| a.age_hours > 24.0).count();
        let files_older_than_1week = aged.iter().filter(|a| a.age_hours > 168.0).count();
        let total_files = aged.len();
        aged.truncate(REPORT_OLDEST);

        Ok(CleanupReport {
            total_files,
            total_size_mb: bytes_to_mb(stats.total_bytes),
            free_space_mb: bytes_to_mb(stats.free_bytes),
            oldest_files: aged,
            files_older_than_24h,
            files_older_than_1week,
            retention_hours: self.policy.max_age.as_secs_f64() / 3600.0,
        })
    }

    async fn probe(&self, filename: &str) -> std::io::Result<()> {
        let file = tokio::fs::File::open(self.store.root().join(filename)).await?;
        let mut buf = Vec::with_capacity(PROBE_BYTES);
        file.take(PROBE_BYTES as u64).read_to_end(&mut buf).await?;
        Ok(())
    }

    async fn delete_logged(&self, filename: &str, reason: &'static str) -> bool {
        match self.store.delete(filename).await {
            Ok(true) => {
                tracing::debug!(filename, reason, "Removed artifact");
                true
            }
            Ok(false) => {
                tracing::warn!(filename, reason, "Artifact could not be removed");
                false
            }
            Err(e) => {
                tracing::warn!(filename, reason, error = %e, "Artifact could not be removed");
                false
            }
        }
    }
}
