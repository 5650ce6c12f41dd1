//! Error types for vinyltube
//!
//! This module provides the error taxonomy for the service, including:
//! - Client-side failures (invalid input, path traversal, rate limiting)
//! - Backend failures (timeouts, extraction/download failures)
//! - HTTP status code mapping for the API layer
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for vinyltube operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vinyltube
///
/// Every core operation returns this explicitly; the mapping to transport status
/// codes lives in [`ToHttpStatus`] and is only consulted by the HTTP layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unsupported input (bad URL, bad format selector)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A caller-supplied filename resolved outside the artifact store
    #[error("path traversal rejected for {name:?}")]
    PathTraversal {
        /// The rejected filename, as supplied by the caller
        name: String,
    },

    /// The client exceeded its request budget
    #[error("rate limited: retry after {retry_after_seconds} seconds")]
    RateLimited {
        /// Seconds until the oldest counted request leaves the window
        retry_after_seconds: u64,
    },

    /// Requested artifact does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Artifact exceeds the configured single-file maximum
    #[error("artifact too large: {size} bytes exceeds limit of {max} bytes")]
    TooLarge {
        /// Size of the artifact on disk
        size: u64,
        /// Configured maximum single-file size
        max: u64,
    },

    /// The extraction backend did not answer within its time budget
    #[error("{operation} timed out after {seconds} seconds")]
    BackendTimeout {
        /// The operation that timed out ("extraction", "download")
        operation: &'static str,
        /// The timeout that elapsed
        seconds: u64,
    },

    /// The extraction backend reported a failure
    #[error("{0}")]
    BackendFailure(String),

    /// The extraction backend binary could not be located or started
    #[error("extraction backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "store.download_dir")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to check disk space
    #[error("failed to check disk space at {path}: {reason}")]
    DiskSpaceCheckFailed {
        /// The directory that was queried
        path: PathBuf,
        /// The underlying OS error
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,
}

impl Error {
    /// Whether the error was caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "rate_limited",
///     "message": "rate limited: retry after 12 seconds",
///     "details": {
///       "retry_after_seconds": 12
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "path_traversal")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::InvalidInput(_) => 400,
            Error::PathTraversal { .. } => 400,
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 413 Payload Too Large
            Error::TooLarge { .. } => 413,

            // 429 Too Many Requests
            Error::RateLimited { .. } => 429,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::DiskSpaceCheckFailed { .. } => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,

            // 502 Bad Gateway - the backend answered with a failure
            Error::BackendFailure(_) => 502,

            // 503 Service Unavailable
            Error::BackendUnavailable(_) => 503,
            Error::ShuttingDown => 503,

            // 504 Gateway Timeout
            Error::BackendTimeout { .. } => 504,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::PathTraversal { .. } => "path_traversal",
            Error::RateLimited { .. } => "rate_limited",
            Error::NotFound(_) => "not_found",
            Error::TooLarge { .. } => "too_large",
            Error::BackendTimeout { .. } => "backend_timeout",
            Error::BackendFailure(_) => "backend_failure",
            Error::BackendUnavailable(_) => "backend_unavailable",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::DiskSpaceCheckFailed { .. } => "disk_space_check_failed",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::RateLimited {
                retry_after_seconds,
            } => Some(serde_json::json!({
                "retry_after_seconds": retry_after_seconds,
            })),
            Error::TooLarge { size, max } => Some(serde_json::json!({
                "size_bytes": size,
                "max_bytes": max,
            })),
            Error::BackendTimeout { operation, seconds } => Some(serde_json::json!({
                "operation": operation,
                "timeout_seconds": seconds,
            })),
            Error::PathTraversal { name } => Some(serde_json::json!({
                "filename": name,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
