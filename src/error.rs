//! Error types for bt-recover

use std::path::PathBuf;
use thiserror::Error;

/// Failure category shared by errors and download outcomes.
///
/// Callers branch on the kind instead of matching every error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ExecutableNotFound,
    MalformedUrl,
    WrongExtension,
    Unreachable,
    DestinationConflict,
    SubprocessLaunchFailure,
    SubprocessNonzeroExit,
    /// Anything outside the taxonomy above (I/O, runtime setup)
    Unexpected,
}

impl ErrorKind {
    /// Short, stable label used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ExecutableNotFound => "executable-not-found",
            ErrorKind::MalformedUrl => "malformed-url",
            ErrorKind::WrongExtension => "wrong-extension",
            ErrorKind::Unreachable => "unreachable",
            ErrorKind::DestinationConflict => "destination-conflict",
            ErrorKind::SubprocessLaunchFailure => "subprocess-launch-failure",
            ErrorKind::SubprocessNonzeroExit => "subprocess-nonzero-exit",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a stream URL is rejected
#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    Malformed(String),

    #[error("URL must point to an m3u8 file: {0}")]
    WrongExtension(String),

    #[error("Failed to access URL {url}: {reason}")]
    Unreachable { url: String, reason: String },
}

impl UrlValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UrlValidationError::Malformed(_) => ErrorKind::MalformedUrl,
            UrlValidationError::WrongExtension(_) => ErrorKind::WrongExtension,
            UrlValidationError::Unreachable { .. } => ErrorKind::Unreachable,
        }
    }
}

/// Main error type for bt-recover operations
#[derive(Debug, Error)]
pub enum BtRecoverError {
    #[error("{0}")]
    ExecutableNotFound(String),

    #[error(transparent)]
    InvalidUrl(#[from] UrlValidationError),

    #[error("Output file {} already exists. Use --force to overwrite.", .0.display())]
    DestinationConflict(PathBuf),

    #[error("Failed to launch {}: {source}", program.display())]
    SubprocessLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg exited with code {code}: {stderr}")]
    SubprocessExit { code: i32, stderr: String },

    #[error("Download interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl BtRecoverError {
    /// Map the error onto the failure taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            BtRecoverError::ExecutableNotFound(_) => ErrorKind::ExecutableNotFound,
            BtRecoverError::InvalidUrl(e) => e.kind(),
            BtRecoverError::DestinationConflict(_) => ErrorKind::DestinationConflict,
            BtRecoverError::SubprocessLaunch { .. } => ErrorKind::SubprocessLaunchFailure,
            BtRecoverError::SubprocessExit { .. } | BtRecoverError::Interrupted => {
                ErrorKind::SubprocessNonzeroExit
            }
            BtRecoverError::IoError(_) | BtRecoverError::HttpError(_) => ErrorKind::Unexpected,
        }
    }
}

impl From<url::ParseError> for UrlValidationError {
    fn from(err: url::ParseError) -> Self {
        UrlValidationError::Malformed(err.to_string())
    }
}
