use super::*;
use crate::backend::fake::FakeBackend;
use crate::service::test_helpers::{create_test_service_with, test_config};
use axum::body::Body;
use axum::extract::Request;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::StatusCode;
use axum::response::Response;
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;


const CLIENT: ([u8; 4], u16) = ([127, 0, 0, 1], 40000);

/// Test application: router with a fake client address, plus the pieces behind it
struct TestApp {
    router: Router,
    service: Arc<MediaService>,
    backend: Arc<FakeBackend>,
    _temp_dir: tempfile::TempDir,
}

impl TestApp {
    async fn send(&self, request: Request) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Build a test app; `adjust` tweaks the configuration first
async fn create_test_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    adjust(&mut config);
    let config = Arc::new(config);

    let (service, backend, temp_dir) = create_test_service_with((*config).clone(), temp_dir).await;
    let service = Arc::new(service);
    let router = create_router(service.clone(), config)
        .layer(MockConnectInfo(SocketAddr::from(CLIENT)));

    TestApp {
        router,
        service,
        backend,
        _temp_dir: temp_dir,
    }
}

async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

fn get(uri: &str) -> Request {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn json_body(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    config.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let (service, _backend, _temp_dir) = create_test_service_with(config, temp_dir).await;
    let service = Arc::new(service);

    let api_handle = service.spawn_api_server();

    // Give it a moment to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be running");

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled_for_any_origin() {
    let app = create_test_app_with(|c| c.api.cors_origins = vec!["*".to_string()]).await;

    let request = Request::builder()
        .uri("/api/files")
        .header("Origin", "http://example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_restricted_to_listed_origins() {
    let app = create_test_app().await;

    let allowed = Request::builder()
        .uri("/api/files")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.send(allowed).await;
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );

    let other = Request::builder()
        .uri("/api/files")
        .header("Origin", "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.send(other).await;
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_disabled() {
    let app = create_test_app_with(|c| c.api.cors_enabled = false).await;

    let request = Request::builder()
        .uri("/api/files")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let enabled = create_test_app().await;
    let response = enabled.send(get("/api-docs/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let disabled = create_test_app_with(|c| c.api.swagger_ui = false).await;
    let response = disabled.send(get("/api-docs/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = create_test_app().await;
    let response = app.send(get("/api/v1/downloads")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
