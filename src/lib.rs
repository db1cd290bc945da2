//! # bt-recover
//!
//! Download BrightTalk (or any HLS) videos from m3u8 streams by handing the
//! playlist to ffmpeg for a lossless remux.
//!
//! ## Features
//!
//! - ffmpeg discovery: explicit path, `PATH`, then well-known install locations
//! - m3u8 URL validation with an optional HEAD probe
//! - Stream copy (no re-encoding), overwrite protection, dry runs
//!
//! ## Example
//!
//! ```rust,no_run
//! use bt_recover::{DownloadInvoker, DownloadRequest, ExecutableResolver, StreamUrlValidator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let url = "https://cdn.example.com/videos/stream.m3u8";
//!     StreamUrlValidator::new()?.validate(url).await?;
//!
//!     let ffmpeg = ExecutableResolver::new().resolve(None).await?;
//!     let outcome = DownloadInvoker::new()
//!         .invoke(&ffmpeg, DownloadRequest::new(url, "talk.mp4"))
//!         .await;
//!     println!("success: {}", outcome.success);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod utils;

// Re-export main types
pub use core::{
    DownloadInvoker, DownloadOutcome, DownloadRequest, ExecutableResolver, OutcomeStatus, Progress,
    ResolvedExecutable, StreamUrlValidator, ValidatedUrl, Verbosity,
};
pub use error::{BtRecoverError, ErrorKind, UrlValidationError};

/// Result type alias for bt-recover operations
pub type Result<T> = std::result::Result<T, BtRecoverError>;
