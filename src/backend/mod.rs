//! Extraction backend abstraction
//!
//! The orchestrator never talks to a media host directly. It hands requests to
//! an [`ExtractionBackend`], which returns metadata or writes a file into the
//! store root and reports its path. Implementations:
//!
//! - [`YtDlpBackend`]: drives the external `yt-dlp` binary as a child process
//! - [`UnavailableBackend`]: stand-in when no binary could be located, so the
//!   service still starts and reports itself unhealthy
//!
//! ## Usage
//!
//! ```no_run
//! use vinyltube::backend::{ExtractionBackend, ExtractRequest, YtDlpBackend};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = YtDlpBackend::from_path().expect("yt-dlp not found");
//!     let metadata = backend
//!         .extract(&ExtractRequest {
//!             url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
//!             flat: true,
//!             socket_timeout: Duration::from_secs(5),
//!             retries: 1,
//!         })
//!         .await?;
//!     println!("{:?}", metadata.title);
//!     Ok(())
//! }
//! ```

#[cfg(test)]
pub(crate) mod fake;
mod parser;
mod traits;
mod unavailable;
mod ytdlp;

pub use parser::{failure_message, is_credential_failure, parse_download_path, parse_metadata};
pub use traits::{DownloadRequest, ExtractRequest, ExtractionBackend, RawFormat, RawMetadata};
pub use unavailable::UnavailableBackend;
pub use ytdlp::YtDlpBackend;
