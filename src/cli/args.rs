//! Command line argument parsing

use crate::core::{DownloadRequest, Verbosity};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Download BrightTalk videos from m3u8 streams
#[derive(Parser, Debug)]
#[command(name = "bt-recover", author, version, about, long_about = None)]
pub struct Args {
    /// The BrightTalk m3u8 stream URL
    #[arg(long, env = "BT_URL", value_name = "URL")]
    pub url: String,

    /// The output file name
    #[arg(long, env = "BT_OUTPUT", value_name = "PATH")]
    pub output: PathBuf,

    /// Do not download, just verify the URL and print the ffmpeg command
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite output file if it exists
    #[arg(long, visible_alias = "overwrite")]
    pub force: bool,

    /// Custom path to ffmpeg binary
    #[arg(long, env = "BT_FFMPEG", value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Timeout for the URL reachability probe (e.g., 5s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "5s")]
    pub timeout: humantime::Duration,

    /// Skip the URL reachability probe
    #[arg(long)]
    pub no_probe: bool,

    /// Keep a partially written output file when ffmpeg fails
    #[arg(long)]
    pub keep_partial: bool,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Get probe timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet, self.debug)
    }

    /// Build the download request described by these arguments
    pub fn to_request(&self) -> DownloadRequest {
        DownloadRequest::new(self.url.trim(), self.output.clone())
            .with_overwrite(self.force)
            .with_dry_run(self.dry_run)
            .with_verbosity(self.verbosity_level())
            .with_keep_partial(self.keep_partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    const URL: &str = "https://cdn.example.com/videos/stream.m3u8";

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["bt-recover", "--url", URL, "--output", "/tmp/out.mp4"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    #[test]
    fn test_parse_minimal() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.url, URL);
        assert_eq!(args.output, PathBuf::from("/tmp/out.mp4"));
        assert!(!args.dry_run);
        assert!(!args.force);
        assert_eq!(args.timeout_duration(), Duration::from_secs(5));
        assert_eq!(args.verbosity_level(), Verbosity::Normal);
    }

    #[test]
    fn test_overwrite_alias() {
        assert!(parse(&["--force"]).unwrap().force);
        assert!(parse(&["--overwrite"]).unwrap().force);
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        let err = parse(&["--verbose", "--quiet"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_debug_is_additive() {
        let args = parse(&["--quiet", "--debug"]).unwrap();
        assert_eq!(args.verbosity_level(), Verbosity::Debug);

        let args = parse(&["--verbose", "--debug"]).unwrap();
        assert_eq!(args.verbosity_level(), Verbosity::Debug);
    }

    #[test]
    fn test_version_flag() {
        let err = Args::try_parse_from(["bt-recover", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        assert!(err.to_string().contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_optional_values() {
        let args = parse(&[
            "--ffmpeg",
            "/opt/homebrew/bin/ffmpeg",
            "--timeout",
            "30s",
            "--no-probe",
            "--keep-partial",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.ffmpeg, Some(PathBuf::from("/opt/homebrew/bin/ffmpeg")));
        assert_eq!(args.timeout_duration(), Duration::from_secs(30));
        assert!(args.no_probe);
        assert!(args.keep_partial);
        assert!(args.dry_run);
    }

    #[test]
    fn test_to_request() {
        let args = parse(&["--force", "--dry-run", "--verbose", "--keep-partial"]).unwrap();
        let request = args.to_request();
        assert_eq!(request.source_url, URL);
        assert_eq!(request.destination, PathBuf::from("/tmp/out.mp4"));
        assert!(request.overwrite);
        assert!(request.dry_run);
        assert!(request.keep_partial);
        assert_eq!(request.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn test_environment_fallbacks() {
        std::env::set_var("BT_URL", URL);
        std::env::set_var("BT_OUTPUT", "/tmp/from-env.mp4");
        std::env::set_var("BT_FFMPEG", "/opt/ffmpeg/bin/ffmpeg");

        let from_env = Args::try_parse_from(["bt-recover"]);
        let overridden = Args::try_parse_from(["bt-recover", "--output", "/tmp/from-cli.mp4"]);

        std::env::remove_var("BT_URL");
        std::env::remove_var("BT_OUTPUT");
        std::env::remove_var("BT_FFMPEG");

        let args = from_env.unwrap();
        assert_eq!(args.url, URL);
        assert_eq!(args.output, PathBuf::from("/tmp/from-env.mp4"));
        assert_eq!(args.ffmpeg, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));

        let args = overridden.unwrap();
        assert_eq!(args.output, PathBuf::from("/tmp/from-cli.mp4"));
    }
}
