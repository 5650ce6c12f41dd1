//! System handlers: health, statistics, reports, OpenAPI, frontend index.

use crate::api::AppState;
use crate::error::Result;
use crate::types::{CleanupReport, ServiceStats};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

/// GET /api/health - Health check
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = crate::types::HealthStatus),
        (status = 503, description = "Backend or store unusable", body = crate::types::HealthStatus)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.service.health_status().await;
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

/// GET /api/stats - Store statistics and uptime
#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "system",
    responses(
        (status = 200, description = "Service statistics", body = ServiceStats),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<ServiceStats>> {
    Ok(Json(state.service.stats().await?))
}

/// GET /api/cleanup/report - Age distribution of stored artifacts
#[utoipa::path(
    get,
    path = "/api/cleanup/report",
    tag = "system",
    responses(
        (status = 200, description = "Cleanup report", body = CleanupReport),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn cleanup_report(State(state): State<AppState>) -> Result<Json<CleanupReport>> {
    Ok(Json(state.service.cleanup_report().await?))
}

/// GET /api/openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/api/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// GET / - Frontend entry point
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Frontend index.html, or a JSON hint when no build is present")
    )
)]
pub async fn frontend_index(State(state): State<AppState>) -> Response {
    let index = state.service.store().static_dir().join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::debug!(path = %index.display(), error = %e, "Frontend index unavailable");
            Json(json!({
                "message": "Frontend not found. Build the frontend first."
            }))
            .into_response()
        }
    }
}
