//! Shared test helpers for creating MediaService instances in tests.

use crate::backend::fake::FakeBackend;
use crate::config::Config;
use crate::service::MediaService;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Configuration rooted in `dir` with fast retries and no browser cookies
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.store.download_dir = dir.join("downloads");
    config.store.static_dir = dir.join("static");
    config.backend.cookies_from_browser = None;
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.max_delay = Duration::from_millis(20);
    config.retry.jitter = false;
    config
}

/// Helper to create a test MediaService backed by a scripted fake backend.
/// Returns the service, the fake and the tempdir (which must be kept alive).
pub(crate) async fn create_test_service() -> (MediaService, Arc<FakeBackend>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    create_test_service_with(config, temp_dir).await
}

/// Same as [`create_test_service`] with a caller-adjusted configuration
pub(crate) async fn create_test_service_with(
    config: Config,
    temp_dir: tempfile::TempDir,
) -> (MediaService, Arc<FakeBackend>, tempfile::TempDir) {
    let backend = Arc::new(FakeBackend::new());
    let service = MediaService::with_backend(config, backend.clone())
        .await
        .unwrap();
    (service, backend, temp_dir)
}

/// Write an artifact of `bytes` bytes into the service's store
pub(crate) fn write_artifact(service: &MediaService, name: &str, bytes: usize) -> std::path::PathBuf {
    let path = service.store().root().join(name);
    std::fs::write(&path, vec![b'x'; bytes]).unwrap();
    path
}
