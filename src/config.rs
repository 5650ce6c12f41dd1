//! Configuration types for vinyltube

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Artifact store configuration (directories and size limits)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreConfig {
    /// Directory holding downloaded artifacts (default: "downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Sibling directory for the static frontend build (default: "static")
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Largest single artifact that will be served, in bytes (default: 500 MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            static_dir: default_static_dir(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Retention policy and cleanup scheduling
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetentionConfig {
    /// Artifacts older than this are expired (default: 24 hours)
    #[serde(default = "default_max_age", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub max_age: Duration,

    /// Aggregate size cap for the store, in bytes (default: 10 GB, 0 = unlimited)
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: u64,

    /// Time between scheduled cleanup passes (default: 1 hour)
    #[serde(default = "default_cleanup_interval", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub cleanup_interval: Duration,

    /// Pause after a failed cleanup pass (default: 60 seconds)
    #[serde(default = "default_error_backoff", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub error_backoff: Duration,

    /// Remove empty and unreadable files during each pass (default: true)
    #[serde(default = "default_true")]
    pub sweep_orphans: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age: default_max_age(),
            max_total_bytes: default_max_total_bytes(),
            cleanup_interval: default_cleanup_interval(),
            error_backoff: default_error_backoff(),
            sweep_orphans: true,
        }
    }
}

/// Per-client rate limiting for extraction and download requests
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per client within one window (default: 10)
    #[serde(default = "default_rate_limit_requests")]
    pub requests: u32,

    /// Length of the sliding window (default: 60 seconds)
    #[serde(default = "default_rate_limit_window", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub window: Duration,

    /// Upper bound on distinct clients tracked at once (default: 10000)
    #[serde(default = "default_max_tracked_clients")]
    pub max_tracked_clients: usize,

    /// How often idle client entries are swept (default: 5 minutes)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub sweep_interval: Duration,

    /// IPs exempt from rate limiting
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub exempt_ips: Vec<std::net::IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: default_rate_limit_requests(),
            window: default_rate_limit_window(),
            max_tracked_clients: default_max_tracked_clients(),
            sweep_interval: default_sweep_interval(),
            exempt_ips: Vec::new(),
        }
    }
}

/// Extraction backend (yt-dlp) invocation settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BackendConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub binary_path: Option<PathBuf>,

    /// Whether to search PATH for the binary if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Timeout for fast (flat) metadata extraction (default: 10 seconds)
    #[serde(default = "default_fast_extract_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub fast_extract_timeout: Duration,

    /// Timeout for full metadata extraction with formats (default: 20 seconds)
    #[serde(default = "default_full_extract_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub full_extract_timeout: Duration,

    /// Timeout for one download attempt (default: 120 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub download_timeout: Duration,

    /// Socket timeout handed to the backend during downloads (default: 60 seconds)
    #[serde(default = "default_socket_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub socket_timeout: Duration,

    /// Backend-level connection retries (default: 3)
    #[serde(default = "default_connection_retries")]
    pub connection_retries: u32,

    /// Backend-level fragment retries, with exponential sleep between them (default: 10)
    #[serde(default = "default_fragment_retries")]
    pub fragment_retries: u32,

    /// Browser to borrow cookies from on the first download attempt (default: "firefox")
    #[serde(default = "default_cookies_browser")]
    pub cookies_from_browser: Option<String>,

    /// Codec for audio extraction (default: "mp3")
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate for extraction (default: "192K")
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    /// Maximum backend jobs running at once (default: 4)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            search_path: true,
            fast_extract_timeout: default_fast_extract_timeout(),
            full_extract_timeout: default_full_extract_timeout(),
            download_timeout: default_download_timeout(),
            socket_timeout: default_socket_timeout(),
            connection_retries: default_connection_retries(),
            fragment_retries: default_fragment_retries(),
            cookies_from_browser: default_cookies_browser(),
            audio_codec: default_audio_codec(),
            audio_quality: default_audio_quality(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

/// Retry configuration for transient backend failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 2 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["http://localhost:3000"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for [`MediaService`](crate::MediaService)
///
/// Settings are grouped by the component that consumes them:
/// - [`store`](StoreConfig) - artifact directory and single-file limit
/// - [`retention`](RetentionConfig) - expiry, size cap, cleanup schedule
/// - [`rate_limit`](RateLimitConfig) - per-client admission control
/// - [`backend`](BackendConfig) - yt-dlp invocation, timeouts, concurrency
/// - [`retry`](RetryConfig) - backoff for transient backend failures
/// - [`api`](ApiConfig) - HTTP binding
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Artifact store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Retention policy
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Extraction backend
    #[serde(default)]
    pub backend: BackendConfig,

    /// Retry policy for transient backend failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// REST API
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.store.download_dir
    }

    /// Check settings that would make the service misbehave at runtime
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> Error {
            Error::Config {
                message: message.to_string(),
                key: Some(key.to_string()),
            }
        }

        if self.store.max_file_size == 0 {
            return Err(invalid("store.max_file_size", "must be greater than zero"));
        }
        if self.retention.cleanup_interval.is_zero() {
            return Err(invalid(
                "retention.cleanup_interval",
                "must be greater than zero",
            ));
        }
        if self.rate_limit.enabled {
            if self.rate_limit.requests == 0 {
                return Err(invalid("rate_limit.requests", "must be greater than zero"));
            }
            if self.rate_limit.window.is_zero() {
                return Err(invalid("rate_limit.window", "must be greater than zero"));
            }
            if self.rate_limit.max_tracked_clients == 0 {
                return Err(invalid(
                    "rate_limit.max_tracked_clients",
                    "must be greater than zero",
                ));
            }
        }
        for (key, timeout) in [
            ("backend.fast_extract_timeout", self.backend.fast_extract_timeout),
            ("backend.full_extract_timeout", self.backend.full_extract_timeout),
            ("backend.download_timeout", self.backend.download_timeout),
        ] {
            if timeout.is_zero() {
                return Err(invalid(key, "must be greater than zero"));
            }
        }
        if self.backend.max_concurrent_jobs == 0 {
            return Err(invalid(
                "backend.max_concurrent_jobs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    ///
    /// Recognized variables: `DOWNLOAD_DIR`, `FRONTEND_BUILD_PATH`, `MAX_FILE_SIZE`,
    /// `MAX_TOTAL_SIZE`, `CLEANUP_INTERVAL`, `FILE_RETENTION`, `RATE_LIMIT_REQUESTS`,
    /// `RATE_LIMIT_WINDOW`. Sizes are bytes, intervals are seconds.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse_u64(key: &str, value: &str) -> Result<u64> {
            value.trim().parse::<u64>().map_err(|e| Error::Config {
                message: format!("expected an unsigned integer, got {value:?}: {e}"),
                key: Some(key.to_string()),
            })
        }

        if let Some(dir) = lookup("DOWNLOAD_DIR") {
            self.store.download_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("FRONTEND_BUILD_PATH") {
            self.store.static_dir = PathBuf::from(dir);
        }
        if let Some(v) = lookup("MAX_FILE_SIZE") {
            self.store.max_file_size = parse_u64("MAX_FILE_SIZE", &v)?;
        }
        if let Some(v) = lookup("MAX_TOTAL_SIZE") {
            self.retention.max_total_bytes = parse_u64("MAX_TOTAL_SIZE", &v)?;
        }
        if let Some(v) = lookup("CLEANUP_INTERVAL") {
            self.retention.cleanup_interval =
                Duration::from_secs(parse_u64("CLEANUP_INTERVAL", &v)?);
        }
        if let Some(v) = lookup("FILE_RETENTION") {
            self.retention.max_age = Duration::from_secs(parse_u64("FILE_RETENTION", &v)?);
        }
        if let Some(v) = lookup("RATE_LIMIT_REQUESTS") {
            let requests = parse_u64("RATE_LIMIT_REQUESTS", &v)?;
            self.rate_limit.requests = u32::try_from(requests).map_err(|_| Error::Config {
                message: format!("{requests} does not fit in 32 bits"),
                key: Some("RATE_LIMIT_REQUESTS".to_string()),
            })?;
        }
        if let Some(v) = lookup("RATE_LIMIT_WINDOW") {
            self.rate_limit.window = Duration::from_secs(parse_u64("RATE_LIMIT_WINDOW", &v)?);
        }
        Ok(())
    }
}

// Default value functions
fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_max_file_size() -> u64 {
    500 * 1024 * 1024 // 500 MB
}

fn default_max_age() -> Duration {
    Duration::from_secs(24 * 3600)
}

fn default_max_total_bytes() -> u64 {
    10 * 1024 * 1024 * 1024 // 10 GB
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_error_backoff() -> Duration {
    Duration::from_secs(60)
}

fn default_true() -> bool {
    true
}

fn default_rate_limit_requests() -> u32 {
    10
}

fn default_rate_limit_window() -> Duration {
    Duration::from_secs(60)
}

fn default_max_tracked_clients() -> usize {
    10_000
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_fast_extract_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_full_extract_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_socket_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connection_retries() -> u32 {
    3
}

fn default_fragment_retries() -> u32 {
    10
}

fn default_cookies_browser() -> Option<String> {
    Some("firefox".to_string())
}

fn default_audio_codec() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> String {
    "192K".to_string()
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
