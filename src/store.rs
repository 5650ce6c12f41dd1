//! Directory-backed artifact store
//!
//! The store root is the only place artifacts live. Records are derived from
//! file metadata on every call, so there is no index to drift out of sync with
//! the disk. Every operation that takes a caller-supplied filename validates it
//! before touching the filesystem and re-checks the canonical path against the
//! canonical root.

use crate::error::{Error, Result};
use crate::types::{ArtifactRecord, DirectoryStats};
use crate::utils::{bytes_to_mb, download_url_for, get_available_space, is_partial_file, to_utc};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Registry of downloaded files under a single directory
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    static_dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store over `root`, with `static_dir` as its sibling asset directory
    pub fn new(root: impl Into<PathBuf>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            static_dir: static_dir.into(),
        }
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Static frontend directory
    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    /// Create the store root and the static directory if missing
    pub async fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.root, &self.static_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                tracing::error!(path = %dir.display(), error = %e, "Failed to create directory");
                Error::Io(e)
            })?;
        }
        Ok(())
    }

    /// Metadata record for one artifact
    pub async fn stat(&self, filename: &str) -> Result<ArtifactRecord> {
        let path = self.resolve_existing(filename).await?;
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| not_found(filename, e))?;
        if !metadata.is_file() || is_partial_file(filename) {
            return Err(Error::NotFound(filename.to_string()));
        }
        record_from(filename, &metadata)
    }

    /// All artifacts directly under the root, most recently modified first
    ///
    /// Subdirectories, symlinks, in-progress backend files and entries that
    /// vanish or cannot be read mid-scan are skipped.
    pub async fn list(&self) -> Result<Vec<ArtifactRecord>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut records = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if is_partial_file(&name) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(filename = %name, error = %e, "Entry vanished during scan");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            match record_from(&name, &metadata) {
                Ok(record) => records.push(record),
                Err(e) => tracing::debug!(filename = %name, error = %e, "Skipping entry"),
            }
        }

        records.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(records)
    }

    /// Remove one artifact
    ///
    /// Returns `Ok(false)` when the file is absent or the OS refuses the removal.
    pub async fn delete(&self, filename: &str) -> Result<bool> {
        validate_filename(filename)?;
        let path = self.root.join(filename);

        match tokio::fs::symlink_metadata(&path).await {
            Ok(m) if m.is_file() => {}
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                tracing::warn!(filename, error = %e, "Failed to inspect file for deletion");
                return Ok(false);
            }
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(filename, "Deleted artifact");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                tracing::warn!(filename, error = %e, "Failed to delete artifact");
                Ok(false)
            }
        }
    }

    /// Artifact count, total size and free space
    pub async fn directory_stats(&self) -> Result<DirectoryStats> {
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            return Ok(DirectoryStats::default());
        }
        let records = self.list().await?;
        let free_bytes = self.free_space()?;
        Ok(DirectoryStats {
            count: records.len(),
            total_bytes: records.iter().map(|r| r.size_bytes).sum(),
            free_bytes,
        })
    }

    /// Free bytes on the filesystem holding the root
    pub fn free_space(&self) -> Result<u64> {
        get_available_space(&self.root).map_err(|e| Error::DiskSpaceCheckFailed {
            path: self.root.clone(),
            reason: e.to_string(),
        })
    }

    /// Open an artifact for serving
    ///
    /// Fails with `TooLarge` when the file exceeds `max_size`.
    pub async fn open_artifact(
        &self,
        filename: &str,
        max_size: u64,
    ) -> Result<(tokio::fs::File, ArtifactRecord)> {
        let record = self.stat(filename).await?;
        if record.size_bytes > max_size {
            return Err(Error::TooLarge {
                size: record.size_bytes,
                max: max_size,
            });
        }
        let path = self.resolve_existing(filename).await?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| not_found(filename, e))?;
        Ok((file, record))
    }

    /// Canonicalize a path produced by the backend and require it to sit directly in the root
    pub async fn contain(&self, path: &Path) -> Result<PathBuf> {
        let root = self.canonical_root().await?;
        let canonical = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| not_found(&path.display().to_string(), e))?;
        if canonical.parent() != Some(root.as_path()) {
            tracing::warn!(
                path = %path.display(),
                root = %root.display(),
                "Produced file lies outside the store root"
            );
            return Err(Error::PathTraversal {
                name: path.display().to_string(),
            });
        }
        Ok(canonical)
    }

    /// Delete in-progress files whose names contain `marker`
    pub async fn remove_partials(&self, marker: &str) -> usize {
        let Ok(mut entries) = tokio::fs::read_dir(&self.root).await else {
            return 0;
        };
        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !name.contains(marker) || !is_partial_file(&name) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    removed += 1;
                    tracing::debug!(filename = %name, "Removed partial download");
                }
                Err(e) => tracing::warn!(filename = %name, error = %e, "Failed to remove partial download"),
            }
        }
        removed
    }

    /// In-progress files not modified for longer than `older_than`
    ///
    /// These are never listed as artifacts, so retention finds abandoned ones
    /// through this scan instead.
    pub async fn stale_partials(&self, older_than: Duration) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };
        let now = SystemTime::now();

        let mut stale = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !is_partial_file(&name) {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let idle = metadata
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or_default();
            if idle > older_than {
                stale.push(name);
            }
        }
        Ok(stale)
    }

    /// Modification time of the root directory itself
    pub async fn directory_modified(&self) -> Result<SystemTime> {
        Ok(tokio::fs::metadata(&self.root).await?.modified()?)
    }

    async fn canonical_root(&self) -> Result<PathBuf> {
        Ok(tokio::fs::canonicalize(&self.root).await?)
    }

    /// Validate, join and canonicalize an existing artifact path
    async fn resolve_existing(&self, filename: &str) -> Result<PathBuf> {
        validate_filename(filename)?;
        let root = self.canonical_root().await?;
        let canonical = tokio::fs::canonicalize(self.root.join(filename))
            .await
            .map_err(|e| not_found(filename, e))?;
        if !canonical.starts_with(&root) {
            return Err(Error::PathTraversal {
                name: filename.to_string(),
            });
        }
        Ok(canonical)
    }
}

/// Reject names that could address anything other than a direct child of the root
pub fn validate_filename(filename: &str) -> Result<()> {
    let rejected = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0'])
        || Path::new(filename).is_absolute();
    if rejected {
        tracing::warn!(filename, "Rejected unsafe artifact name");
        return Err(Error::PathTraversal {
            name: filename.to_string(),
        });
    }
    Ok(())
}

fn not_found(filename: &str, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(filename.to_string())
    } else {
        Error::Io(e)
    }
}

fn record_from(filename: &str, metadata: &Metadata) -> Result<ArtifactRecord> {
    let modified = metadata.modified()?;
    let created = metadata.created().unwrap_or(modified);
    Ok(ArtifactRecord {
        filename: filename.to_string(),
        size_bytes: metadata.len(),
        size_mb: bytes_to_mb(metadata.len()),
        created_at: to_utc(created),
        modified_at: to_utc(modified),
        download_url: download_url_for(filename),
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ArtifactStore {
        ArtifactStore::new(dir.path().join("downloads"), dir.path().join("static"))
    }

    async fn ready_store(dir: &TempDir) -> ArtifactStore {
        let store = store_in(dir);
        store.ensure_directories().await.unwrap();
        store
    }

    fn write_with_mtime(path: &Path, bytes: usize, mtime: SystemTime) {
        std::fs::write(path, vec![7u8; bytes]).unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(mtime).unwrap();
    }

    #[tokio::test]
    async fn ensure_directories_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.ensure_directories().await.unwrap();
        store.ensure_directories().await.unwrap();

        assert!(store.root().is_dir());
        assert!(store.static_dir().is_dir());
    }

    #[tokio::test]
    async fn stat_reports_size_and_url() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        std::fs::write(store.root().join("My Song_[abc].mp3"), vec![0u8; 2048]).unwrap();

        let record = store.stat("My Song_[abc].mp3").await.unwrap();
        assert_eq!(record.size_bytes, 2048);
        assert_eq!(record.download_url, "/api/download/file/My%20Song_%5Babc%5D.mp3");
    }

    #[tokio::test]
    async fn stat_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;

        assert!(matches!(store.stat("nope.mp4").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn traversal_names_are_rejected_by_every_operation() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        for name in ["../secret.txt", "..", "", "a/b", "a\\b", "/etc/passwd", "x\0y"] {
            assert!(
                matches!(store.stat(name).await, Err(Error::PathTraversal { .. })),
                "stat accepted {name:?}"
            );
            assert!(
                matches!(store.delete(name).await, Err(Error::PathTraversal { .. })),
                "delete accepted {name:?}"
            );
            assert!(
                matches!(
                    store.open_artifact(name, u64::MAX).await,
                    Err(Error::PathTraversal { .. })
                ),
                "open accepted {name:?}"
            );
        }
        assert!(dir.path().join("secret.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escaping_the_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let outside = dir.path().join("outside.mp4");
        std::fs::write(&outside, b"data").unwrap();
        std::os::unix::fs::symlink(&outside, store.root().join("link.mp4")).unwrap();

        assert!(matches!(
            store.stat("link.mp4").await,
            Err(Error::PathTraversal { .. })
        ));
        // symlinks are never listed
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_orders_by_mtime_and_skips_non_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let now = SystemTime::now();

        write_with_mtime(&store.root().join("old.mp4"), 10, now - Duration::from_secs(300));
        write_with_mtime(&store.root().join("new.mp3"), 10, now - Duration::from_secs(10));
        write_with_mtime(&store.root().join("mid.webm"), 10, now - Duration::from_secs(100));
        std::fs::write(store.root().join("live_[id].mp4.part"), b"x").unwrap();
        std::fs::write(store.root().join("live_[id].mp4.part-Frag2"), b"x").unwrap();
        std::fs::create_dir(store.root().join("subdir")).unwrap();

        let names: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect();
        assert_eq!(names, vec!["new.mp3", "mid.webm", "old.mp4"]);
    }

    #[tokio::test]
    async fn list_of_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.directory_stats().await.unwrap(), DirectoryStats::default());
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        std::fs::write(store.root().join("clip.mp4"), b"data").unwrap();

        assert!(store.delete("clip.mp4").await.unwrap());
        assert!(!store.delete("clip.mp4").await.unwrap());
        assert!(!store.delete("never-existed.mp4").await.unwrap());
    }

    #[tokio::test]
    async fn stale_partials_reports_only_idle_in_progress_files() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let now = SystemTime::now();
        let hour = Duration::from_secs(3_600);
        write_with_mtime(&store.root().join("Song_[zzz].mp4.part"), 4096, now - hour * 24 * 30);
        write_with_mtime(&store.root().join("Clip_[a1].webm.part-Frag3"), 10, now - hour * 2);
        write_with_mtime(&store.root().join("Live_[b2].mp4.part"), 10, now);
        write_with_mtime(&store.root().join("Done_[c3].mp4"), 10, now - hour * 24 * 30);
        std::fs::create_dir(store.root().join("old.part")).unwrap();

        let mut stale = store.stale_partials(hour).await.unwrap();
        stale.sort();

        assert_eq!(stale, vec!["Clip_[a1].webm.part-Frag3", "Song_[zzz].mp4.part"]);
    }

    #[tokio::test]
    async fn stale_partials_of_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.stale_partials(Duration::ZERO).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_leaves_directories_alone() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        std::fs::create_dir(store.root().join("nested")).unwrap();

        assert!(!store.delete("nested").await.unwrap());
        assert!(store.root().join("nested").is_dir());
    }

    #[tokio::test]
    async fn directory_stats_sums_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        std::fs::write(store.root().join("a.mp4"), vec![0u8; 1000]).unwrap();
        std::fs::write(store.root().join("b.mp3"), vec![0u8; 500]).unwrap();

        let stats = store.directory_stats().await.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_bytes, 1500);
        assert!(stats.free_bytes > 0);
    }

    #[tokio::test]
    async fn open_artifact_enforces_size_limit() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        std::fs::write(store.root().join("big.mp4"), vec![0u8; 2048]).unwrap();

        match store.open_artifact("big.mp4", 1024).await {
            Err(Error::TooLarge { size, max }) => {
                assert_eq!(size, 2048);
                assert_eq!(max, 1024);
            }
            other => panic!("expected TooLarge, got {:?}", other.map(|(_, r)| r)),
        }

        let (_file, record) = store.open_artifact("big.mp4", 4096).await.unwrap();
        assert_eq!(record.size_bytes, 2048);
    }

    #[tokio::test]
    async fn contain_accepts_direct_children_only() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let inside = store.root().join("ok.mp4");
        std::fs::write(&inside, b"x").unwrap();
        std::fs::create_dir(store.root().join("nested")).unwrap();
        let nested = store.root().join("nested").join("deep.mp4");
        std::fs::write(&nested, b"x").unwrap();
        let outside = dir.path().join("escape.mp4");
        std::fs::write(&outside, b"x").unwrap();

        let contained = store.contain(&inside).await.unwrap();
        assert_eq!(contained.file_name().unwrap(), "ok.mp4");
        assert!(matches!(
            store.contain(&nested).await,
            Err(Error::PathTraversal { .. })
        ));
        assert!(matches!(
            store.contain(&outside).await,
            Err(Error::PathTraversal { .. })
        ));
        assert!(matches!(
            store.contain(&store.root().join("missing.mp4")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_partials_only_touches_matching_in_progress_files() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        for name in [
            "Song_[abc].webm.part",
            "Song_[abc].webm.ytdl",
            "Song_[abc].mp3",
            "Other_[xyz].webm.part",
        ] {
            std::fs::write(store.root().join(name), b"x").unwrap();
        }

        assert_eq!(store.remove_partials("[abc]").await, 2);
        assert!(store.root().join("Song_[abc].mp3").exists());
        assert!(store.root().join("Other_[xyz].webm.part").exists());
    }
}
