//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the vinyltube REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the vinyltube REST API
///
/// The spec can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "vinyltube REST API",
        version = "1.0.0",
        description = "Fetch media through an extraction backend, store it for a bounded time and serve it back",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Media
        crate::api::routes::extract_fast,
        crate::api::routes::extract_full,
        crate::api::routes::download,

        // Files
        crate::api::routes::serve_file,
        crate::api::routes::list_files,
        crate::api::routes::delete_file,
        crate::api::routes::trigger_cleanup,

        // System
        crate::api::routes::health_check,
        crate::api::routes::get_stats,
        crate::api::routes::cleanup_report,
        crate::api::routes::openapi_spec,
        crate::api::routes::frontend_index,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::MediaKind,
        crate::types::ArtifactRecord,
        crate::types::FormatInfo,
        crate::types::VideoMetadata,
        crate::types::DownloadOutcome,
        crate::types::SweepSummary,
        crate::types::AgedArtifact,
        crate::types::CleanupReport,
        crate::types::HealthState,
        crate::types::HealthStatus,
        crate::types::ServiceStats,

        // Config types from config.rs
        crate::config::Config,
        crate::config::StoreConfig,
        crate::config::RetentionConfig,
        crate::config::RateLimitConfig,
        crate::config::BackendConfig,
        crate::config::RetryConfig,
        crate::config::ApiConfig,

        // API request/response types from routes
        crate::api::routes::ExtractRequest,
        crate::api::routes::DownloadRequest,
        crate::api::routes::FileListResponse,
        crate::api::routes::CleanupResponse,
        crate::api::routes::MessageResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "media", description = "Metadata extraction and downloads (rate limited per client)"),
        (name = "files", description = "Stored artifacts - Serve, list, delete, and trigger cleanup"),
        (name = "system", description = "System endpoints - Health, statistics, cleanup report, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
