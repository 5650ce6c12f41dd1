//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for extracting metadata,
//! downloading media into the artifact store and serving stored files.

use crate::{Config, MediaService, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Media (rate limited per client address)
/// - `POST /api/extract-fast` - Basic metadata, no formats
/// - `POST /api/extract` - Full metadata with formats
/// - `POST /api/download` - Download a format into the store
///
/// ## Files
/// - `GET /api/download/file/*filename` - Stream a stored artifact
/// - `GET /api/files` - List stored artifacts
/// - `DELETE /api/files/:filename` - Delete an artifact
/// - `POST /api/cleanup` - Run a retention pass now
///
/// ## System
/// - `GET /api/health` - Health check (503 when unhealthy)
/// - `GET /api/stats` - Store statistics
/// - `GET /api/cleanup/report` - Age distribution of stored artifacts
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /` - Frontend index.html
pub fn create_router(service: Arc<MediaService>, config: Arc<Config>) -> Router {
    let limiter = service.rate_limiter().clone();
    let state = AppState::new(service, config.clone());

    // Only extraction and downloads reach the backend, so only they are limited
    let media = Router::new()
        .route("/api/extract-fast", post(routes::extract_fast))
        .route("/api/extract", post(routes::extract_full))
        .route("/api/download", post(routes::download));
    let media = if config.rate_limit.enabled {
        media.route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit_middleware,
        ))
    } else {
        media
    };

    let router = Router::new()
        .merge(media)
        // Files
        .route("/api/download/file/*filename", get(routes::serve_file))
        .route("/api/files", get(routes::list_files))
        .route("/api/files/:filename", delete(routes::delete_file))
        .route("/api/cleanup", post(routes::trigger_cleanup))
        // System
        .route("/api/health", get(routes::health_check))
        .route("/api/stats", get(routes::get_stats))
        .route("/api/cleanup/report", get(routes::cleanup_report))
        .route("/api/openapi.json", get(routes::openapi_spec))
        .route("/", get(routes::frontend_index));

    // Merge Swagger UI routes if enabled in config (before applying state).
    // The UI serves its own copy of the document; /api/openapi.json is taken.
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config (outermost)
    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// "*" or an empty list allows any origin; otherwise only the listed
/// origins are allowed, with all methods and headers.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops. The service must have been started
/// separately if the cleanup scheduler should run.
///
/// # Example
///
/// ```no_run
/// use vinyltube::{Config, MediaService};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let service = Arc::new(MediaService::new((*config).clone()).await?);
/// service.start().await?;
///
/// // Start API server (blocks until shutdown)
/// vinyltube::api::start_api_server(service, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(service: Arc<MediaService>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(service, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(bind_address),
        "API server listening"
    );

    // Must use into_make_service_with_connect_info to provide ConnectInfo<SocketAddr>
    // for the rate limiting middleware
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
