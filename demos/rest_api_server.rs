//! REST API server example
//!
//! Runs the vinyltube backend with the cleanup scheduler and the HTTP API.
//! Environment variables such as `DOWNLOAD_DIR`, `FILE_RETENTION` or
//! `RATE_LIMIT_REQUESTS` override the defaults.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:8000/swagger-ui
//! - Extract metadata via POST http://localhost:8000/api/extract
//! - Download via POST http://localhost:8000/api/download
//! - Check health via GET http://localhost:8000/api/health

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vinyltube::{Config, MediaService, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vinyltube=info")),
        )
        .init();

    let mut config = Config::default();
    config.api.cors_origins = vec!["*".to_string()];
    config.apply_env_overrides()?;
    let address = config.api.bind_address;

    let service = Arc::new(MediaService::new(config).await?);
    service.start().await?;
    let _api = service.spawn_api_server();

    println!("Starting vinyltube REST API server");
    println!("Swagger UI: http://{address}/swagger-ui");
    println!();
    println!("Example commands:");
    println!("  # Fast metadata");
    println!("  curl -X POST http://{address}/api/extract-fast \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"url\": \"https://www.youtube.com/watch?v=jNQXAC9IVRw\"}}'");
    println!();
    println!("  # Download audio");
    println!("  curl -X POST http://{address}/api/download \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!(
        "    -d '{{\"url\": \"https://www.youtube.com/watch?v=jNQXAC9IVRw\", \"format\": \"audio\"}}'"
    );
    println!();
    println!("Press Ctrl+C to stop");

    run_with_shutdown((*service).clone()).await?;
    Ok(())
}
