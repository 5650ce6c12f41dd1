// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::backend::fake::{FakeBackend, FakeDownload};
use std::sync::atomic::Ordering;
use tempfile::TempDir;

const URL: &str = "https://www.youtube.com/watch?v=abc123";

struct Harness {
    _dir: TempDir,
    store: ArtifactStore,
    backend: Arc<FakeBackend>,
    orchestrator: DownloadOrchestrator,
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

async fn harness_with(config: BackendConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = ArtifactStore::new(dir.path().join("downloads"), dir.path().join("static"));
    store.ensure_directories().await.unwrap();
    let backend = Arc::new(FakeBackend::new());
    let orchestrator =
        DownloadOrchestrator::new(backend.clone(), store.clone(), config, fast_retry()).unwrap();
    Harness {
        _dir: dir,
        store,
        backend,
        orchestrator,
    }
}

async fn harness() -> Harness {
    harness_with(BackendConfig::default()).await
}

// -----------------------------------------------------------------------------
// URL validation
// -----------------------------------------------------------------------------

#[tokio::test]
async fn video_id_from_supported_shapes() {
    let h = harness().await;
    let o = &h.orchestrator;

    assert_eq!(o.video_id("https://www.youtube.com/watch?v=abc123").unwrap(), "abc123");
    assert_eq!(o.video_id("https://youtube.com/watch?v=abc123&t=42").unwrap(), "abc123");
    assert_eq!(o.video_id("http://youtu.be/xyz_-9").unwrap(), "xyz_-9");
    assert_eq!(o.video_id("https://www.youtube.com/embed/e1?x=1").unwrap(), "e1");
}

#[tokio::test]
async fn video_id_stops_at_fragment_and_path() {
    let h = harness().await;
    let o = &h.orchestrator;

    assert_eq!(o.video_id("https://youtu.be/abc123#t=1").unwrap(), "abc123");
    assert_eq!(o.video_id("https://www.youtube.com/watch?v=abc123#t=30").unwrap(), "abc123");
    assert_eq!(o.video_id("https://www.youtube.com/embed/e1/extra").unwrap(), "e1");
}

#[tokio::test]
async fn failed_download_from_fragment_url_removes_partials() {
    let h = harness().await;
    h.backend
        .push(FakeDownload::FailWithPartial("ERROR: aborted".into()));

    let result = h
        .orchestrator
        .download("https://youtu.be/abc123#t=1", "22", MediaKind::Video)
        .await;

    assert!(result.is_err());
    let leftovers: Vec<_> = std::fs::read_dir(h.store.root())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "left behind {leftovers:?}");
}

#[tokio::test]
async fn unsupported_urls_fail_fast() {
    let h = harness().await;
    for url in [
        "",
        "   ",
        "not a url",
        "ftp://youtube.com/watch?v=abc",
        "https://vimeo.com/12345",
        "https://www.youtube.com/watch?feature=share&v=abc",
        "https://www.youtube.com/channel/UC123",
    ] {
        assert!(
            matches!(h.orchestrator.video_id(url), Err(Error::InvalidInput(_))),
            "{url:?} was accepted"
        );
    }
    assert!(h.backend.extract_requests.lock().unwrap().is_empty());
}

// -----------------------------------------------------------------------------
// Extraction
// -----------------------------------------------------------------------------

#[tokio::test]
async fn fast_extraction_has_no_formats() {
    let h = harness().await;

    let metadata = h.orchestrator.extract(URL, ExtractMode::Fast).await.unwrap();

    assert_eq!(metadata.title, "Test Song");
    assert_eq!(metadata.author, "Test Artist");
    assert_eq!(metadata.duration_seconds, 212);
    assert_eq!(metadata.video_id, "abc123");
    assert!(metadata.formats.is_empty());
    assert!(metadata.fast_mode);

    let requests = h.backend.extract_requests.lock().unwrap();
    assert!(requests[0].flat);
    assert_eq!(requests[0].socket_timeout, Duration::from_secs(5));
}

#[tokio::test]
async fn full_extraction_keeps_streams_with_audio_or_video() {
    let h = harness().await;

    let metadata = h.orchestrator.extract(URL, ExtractMode::Full).await.unwrap();

    assert_eq!(metadata.formats.len(), 2, "storyboard must be dropped");
    let audio = &metadata.formats[0];
    assert_eq!(audio.format_id, "140");
    assert_eq!(audio.quality, "medium");
    assert_eq!(audio.kind, MediaKind::Audio);
    assert_eq!(audio.size_label.as_deref(), Some("3.0 MB"));

    let video = &metadata.formats[1];
    assert_eq!(video.quality, "1920x1080");
    assert_eq!(video.kind, MediaKind::Video);
    assert!(!video.has_audio);
    assert_eq!(video.size_label, None);
    assert!(!metadata.fast_mode);
}

#[tokio::test]
async fn missing_metadata_falls_back_to_defaults() {
    let h = harness().await;
    *h.backend.metadata.lock().unwrap() = RawMetadata {
        formats: vec![crate::backend::RawFormat::default()],
        ..Default::default()
    };

    let metadata = h.orchestrator.extract(URL, ExtractMode::Full).await.unwrap();

    assert_eq!(metadata.title, "Untitled video");
    assert_eq!(metadata.author, "YouTube");
    assert_eq!(
        metadata.thumbnail,
        "https://i.ytimg.com/vi/abc123/hqdefault.jpg"
    );
    assert_eq!(metadata.duration_seconds, 0);
    assert_eq!(metadata.formats[0].quality, "Unknown");
    assert_eq!(metadata.formats[0].container, "mp4");
}

#[tokio::test]
async fn extraction_timeout_is_reported() {
    let h = harness_with(BackendConfig {
        fast_extract_timeout: Duration::from_millis(50),
        ..Default::default()
    })
    .await;
    *h.backend.extract_delay.lock().unwrap() = Some(Duration::from_secs(5));

    let started = std::time::Instant::now();
    let err = h.orchestrator.extract(URL, ExtractMode::Fast).await.unwrap_err();

    assert!(matches!(err, Error::BackendTimeout { operation: "fast extraction", .. }));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn extraction_failure_carries_backend_message() {
    let h = harness().await;
    *h.backend.extract_error.lock().unwrap() = Some("ERROR: Video unavailable".into());

    match h.orchestrator.extract(URL, ExtractMode::Full).await {
        Err(Error::BackendFailure(msg)) => assert_eq!(msg, "ERROR: Video unavailable"),
        other => panic!("expected backend failure, got {other:?}"),
    }
}

// -----------------------------------------------------------------------------
// Downloads
// -----------------------------------------------------------------------------

#[tokio::test]
async fn successful_download_is_listed() {
    let h = harness().await;
    h.backend.push(FakeDownload::Write {
        title: "Test Song".into(),
        ext: "mp4".into(),
        bytes: 4096,
    });

    let outcome = h.orchestrator.download(URL, "22", MediaKind::Video).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.filename, "Test Song_[abc123].mp4");
    assert_eq!(outcome.download_url, "/api/download/file/Test%20Song_%5Babc123%5D.mp4");
    assert_eq!(outcome.size_label, "0.0 MB");
    assert_eq!(outcome.record.size_bytes, 4096);

    let listed = h.store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].filename, outcome.filename);

    let request = &h.backend.download_requests()[0];
    assert_eq!(request.job.format_selector, "22");
    assert_eq!(request.cookies_from_browser.as_deref(), Some("firefox"));
    assert_eq!(request.retries, 3);
}

#[tokio::test]
async fn audio_download_uses_best_audio() {
    let h = harness().await;
    h.backend.push(FakeDownload::Write {
        title: "Test Song".into(),
        ext: "mp3".into(),
        bytes: 100,
    });

    let outcome = h.orchestrator.download(URL, "ignored", MediaKind::Audio).await.unwrap();

    assert!(outcome.filename.ends_with(".mp3"));
    let request = &h.backend.download_requests()[0];
    assert_eq!(request.job.format_selector, "bestaudio/best");
    assert_eq!(request.job.media_kind, MediaKind::Audio);
}

#[tokio::test]
async fn credential_failure_retries_without_cookies() {
    let h = harness().await;
    h.backend.push(FakeDownload::Fail(
        "ERROR: could not find firefox cookies database".into(),
    ));

    h.orchestrator.download(URL, "22", MediaKind::Video).await.unwrap();

    let requests = h.backend.download_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].cookies_from_browser.as_deref(), Some("firefox"));
    assert_eq!(requests[1].cookies_from_browser, None);
}

#[tokio::test]
async fn non_credential_failure_does_not_drop_cookies() {
    let h = harness().await;
    h.backend
        .push(FakeDownload::Fail("ERROR: Private video".into()));

    let err = h.orchestrator.download(URL, "22", MediaKind::Video).await.unwrap_err();

    match err {
        Error::BackendFailure(msg) => assert_eq!(msg, "download failed: ERROR: Private video"),
        other => panic!("expected backend failure, got {other:?}"),
    }
    assert_eq!(h.backend.download_requests().len(), 1);
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let h = harness().await;
    h.backend
        .push(FakeDownload::Fail("ERROR: HTTP Error 503: Service Unavailable".into()));

    let outcome = h.orchestrator.download(URL, "22", MediaKind::Video).await;

    assert!(outcome.is_ok());
    assert_eq!(h.backend.download_requests().len(), 2);
}

#[tokio::test]
async fn failed_download_leaves_no_partials() {
    let h = harness().await;
    h.backend
        .push(FakeDownload::FailWithPartial("ERROR: aborted".into()));

    assert!(h.orchestrator.download(URL, "22", MediaKind::Video).await.is_err());

    assert_eq!(std::fs::read_dir(h.store.root()).unwrap().count(), 0);
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn download_timeout_is_reported_and_cleaned_up() {
    let h = harness_with(BackendConfig {
        download_timeout: Duration::from_millis(50),
        ..Default::default()
    })
    .await;
    h.backend.push(FakeDownload::Hang(Duration::from_secs(5)));

    let err = h.orchestrator.download(URL, "22", MediaKind::Video).await.unwrap_err();

    assert!(matches!(err, Error::BackendTimeout { operation: "download", .. }));
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_output_is_rejected_and_deleted() {
    let h = harness().await;
    h.backend.push(FakeDownload::Write {
        title: "Empty".into(),
        ext: "mp4".into(),
        bytes: 0,
    });

    let err = h.orchestrator.download(URL, "22", MediaKind::Video).await.unwrap_err();

    assert!(matches!(err, Error::BackendFailure(ref m) if m.contains("empty")));
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn partial_output_is_rejected_and_deleted() {
    let h = harness().await;
    h.backend.push(FakeDownload::ReportPartial);

    assert!(h.orchestrator.download(URL, "22", MediaKind::Video).await.is_err());
    assert_eq!(std::fs::read_dir(h.store.root()).unwrap().count(), 0);
}

#[tokio::test]
async fn output_outside_root_is_rejected_and_deleted() {
    let h = harness().await;
    let elsewhere = TempDir::new().unwrap();
    h.backend
        .push(FakeDownload::Outside(elsewhere.path().to_path_buf()));

    let err = h.orchestrator.download(URL, "22", MediaKind::Video).await.unwrap_err();

    assert!(matches!(err, Error::BackendFailure(_)));
    assert_eq!(std::fs::read_dir(elsewhere.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn invalid_format_selector_is_rejected() {
    let h = harness().await;

    for format in ["", "  ", "--exec=rm"] {
        assert!(matches!(
            h.orchestrator.download(URL, format, MediaKind::Video).await,
            Err(Error::InvalidInput(_))
        ));
    }
    assert!(h.backend.download_requests().is_empty());
}

#[tokio::test]
async fn concurrent_jobs_are_bounded() {
    let h = Arc::new(
        harness_with(BackendConfig {
            max_concurrent_jobs: 2,
            ..Default::default()
        })
        .await,
    );
    for _ in 0..5 {
        h.backend.push(FakeDownload::Hang(Duration::from_millis(50)));
    }

    let mut handles = Vec::new();
    for i in 0..5 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            let url = format!("https://youtu.be/vid{i}");
            h.orchestrator.download(&url, "22", MediaKind::Video).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(h.backend.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert_eq!(h.store.list().await.unwrap().len(), 5);
}

async fn wait_for_busy_backend(backend: &FakeBackend) {
    for _ in 0..200 {
        if backend.in_flight.load(Ordering::SeqCst) > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("download never started");
}

#[tokio::test]
async fn extraction_times_out_while_waiting_for_a_slot() {
    let h = Arc::new(
        harness_with(BackendConfig {
            max_concurrent_jobs: 1,
            fast_extract_timeout: Duration::from_millis(100),
            ..Default::default()
        })
        .await,
    );
    h.backend.push(FakeDownload::Hang(Duration::from_secs(3)));

    let busy = h.clone();
    let download =
        tokio::spawn(async move { busy.orchestrator.download(URL, "22", MediaKind::Video).await });
    wait_for_busy_backend(&h.backend).await;

    let started = std::time::Instant::now();
    let err = h.orchestrator.extract(URL, ExtractMode::Fast).await.unwrap_err();

    assert!(matches!(err, Error::BackendTimeout { operation: "fast extraction", .. }));
    assert!(started.elapsed() < Duration::from_secs(1), "waited {:?}", started.elapsed());
    assert!(h.backend.extract_requests.lock().unwrap().is_empty());
    download.abort();
}

#[tokio::test]
async fn backend_version_skips_a_saturated_pool() {
    let h = Arc::new(
        harness_with(BackendConfig {
            max_concurrent_jobs: 1,
            ..Default::default()
        })
        .await,
    );
    h.backend.push(FakeDownload::Hang(Duration::from_secs(3)));

    let busy = h.clone();
    let download =
        tokio::spawn(async move { busy.orchestrator.download(URL, "22", MediaKind::Video).await });
    wait_for_busy_backend(&h.backend).await;

    let version = tokio::time::timeout(Duration::from_secs(1), h.orchestrator.backend_version())
        .await
        .expect("version check queued behind the download");
    assert_eq!(version.unwrap(), "2024.08.06-fake");
    download.abort();
}

#[tokio::test]
async fn closed_orchestrator_refuses_jobs() {
    let h = harness().await;
    h.orchestrator.close();

    assert!(matches!(
        h.orchestrator.extract(URL, ExtractMode::Fast).await,
        Err(Error::ShuttingDown)
    ));
}

#[tokio::test]
async fn backend_version_is_reported() {
    let h = harness().await;
    assert_eq!(h.orchestrator.backend_version().await.unwrap(), "2024.08.06-fake");
    assert_eq!(h.orchestrator.backend_name(), "fake");
}
