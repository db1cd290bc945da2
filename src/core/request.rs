//! Download request and verbosity types

use std::path::PathBuf;

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    #[default]
    Normal,
    /// Verbose (ffmpeg info output and progress)
    Verbose,
    /// Debug (everything, including the ffmpeg command line)
    Debug,
}

impl Verbosity {
    /// Pick the effective level from the CLI switches.
    ///
    /// `debug` is additive and wins over the other two.
    pub fn from_flags(verbose: bool, quiet: bool, debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Value for ffmpeg's `-loglevel`
    pub fn ffmpeg_loglevel(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warning",
            Verbosity::Verbose => "info",
            Verbosity::Debug => "trace",
        }
    }

    /// Whether ffmpeg should emit its machine-readable progress stream
    pub fn wants_progress(&self) -> bool {
        *self >= Verbosity::Verbose
    }

    /// Default tracing filter directive for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::Debug => "debug",
        }
    }
}

/// A single download: one source playlist, one destination file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// m3u8 playlist URL handed to ffmpeg as input
    pub source_url: String,
    /// Output media file
    pub destination: PathBuf,
    /// Allow clobbering an existing destination
    pub overwrite: bool,
    /// Report the command instead of running it
    pub dry_run: bool,
    pub verbosity: Verbosity,
    /// Keep a partially written destination when ffmpeg fails
    pub keep_partial: bool,
}

impl DownloadRequest {
    /// Create a request with default options
    pub fn new(source_url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination: destination.into(),
            overwrite: false,
            dry_run: false,
            verbosity: Verbosity::Normal,
            keep_partial: false,
        }
    }

    /// Set overwrite flag
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set dry-run flag
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set verbosity
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set partial-file retention
    pub fn with_keep_partial(mut self, keep_partial: bool) -> Self {
        self.keep_partial = keep_partial;
        self
    }
}
