//! Output formatting and progress display

use crate::core::progress::Progress;
use crate::core::request::Verbosity;
use crate::core::validator::ProbeReport;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Output formatter for bt-recover
pub struct OutputFormatter {
    verbosity: Verbosity,
    spinner: Mutex<Option<ProgressBar>>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            spinner: Mutex::new(None),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Forward one ffmpeg progress snapshot to the terminal.
    ///
    /// ffmpeg does not know the total length of a live or unprobed
    /// playlist, so this is a spinner rather than a bar.
    pub fn update_progress(&self, progress: &Progress) {
        if !self.verbosity.wants_progress() {
            return;
        }

        let Ok(mut guard) = self.spinner.lock() else {
            return;
        };
        let spinner = guard.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
            {
                spinner.set_style(style);
            }
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        });

        spinner.set_message(progress.summary());
        if progress.finished {
            spinner.finish_with_message(progress.summary());
        }
    }

    /// Finish progress display
    pub fn finish_progress(&self) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(spinner) = guard.take() {
                if !spinner.is_finished() {
                    spinner.finish_and_clear();
                }
            }
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != Verbosity::Quiet {
            println!("{}", message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != Verbosity::Quiet {
            println!("{} {}", "✓".green().bold(), message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != Verbosity::Quiet {
            eprintln!("{} {}", "Warning:".yellow().bold(), message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }

    /// Print debug message
    pub fn debug(&self, message: &str) {
        if self.verbosity == Verbosity::Debug {
            eprintln!("{} {}", "debug:".dimmed(), message);
        }
    }

    /// Print download start message
    pub fn print_download_start(&self, url: &str, output_path: &str) {
        self.info(&format!("Downloading: {} -> {}", url, output_path));
    }

    /// Print download complete message
    pub fn print_download_complete(&self, output_path: &str, duration: Duration) {
        self.success(&format!(
            "Download completed successfully: {} ({})",
            output_path,
            format_duration(duration)
        ));
    }

    /// Print what a dry run would have done
    pub fn print_dry_run(&self, message: &str) {
        for line in message.lines() {
            self.info(line);
        }
    }

    /// Print probe details; the validator already logs its warnings
    pub fn print_probe_report(&self, report: &ProbeReport) {
        self.debug(&format!(
            "Probe: HTTP {} ({}), {} warning(s)",
            report.status,
            report.content_type.as_deref().unwrap_or("no content type"),
            report.warnings.len()
        ));
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, seconds)
        }
    } else {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::ProbeWarning;

    #[test]
    fn test_output_formatter_creation() {
        let formatter = OutputFormatter::new(Verbosity::Normal);
        assert_eq!(formatter.verbosity(), Verbosity::Normal);
        assert!(formatter.spinner.lock().unwrap().is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(3660)), "1h 1m");
        assert_eq!(format_duration(Duration::from_secs(7261)), "2h 1m");
    }

    #[test]
    fn test_progress_ignored_below_verbose() {
        let formatter = OutputFormatter::new(Verbosity::Normal);
        formatter.update_progress(&Progress::default());
        assert!(formatter.spinner.lock().unwrap().is_none());
    }

    #[test]
    fn test_progress_spinner_lifecycle() {
        let formatter = OutputFormatter::new(Verbosity::Verbose);
        formatter.update_progress(&Progress {
            total_size: Some(1024),
            ..Default::default()
        });
        assert!(formatter.spinner.lock().unwrap().is_some());

        formatter.update_progress(&Progress {
            finished: true,
            ..Default::default()
        });
        formatter.finish_progress();
        assert!(formatter.spinner.lock().unwrap().is_none());
    }

    #[test]
    fn test_quiet_mode_messages() {
        let formatter = OutputFormatter::new(Verbosity::Quiet);
        // These should not print anything in quiet mode
        formatter.info("test");
        formatter.success("test");
        formatter.warning("test");
        formatter.debug("test");
        formatter.print_download_start("https://example.com/a.m3u8", "/tmp/out.mp4");
        formatter.print_dry_run("Would download: a -> b");

        // Error should always print
        formatter.error("test");
    }

    #[test]
    fn test_print_probe_report() {
        let formatter = OutputFormatter::new(Verbosity::Debug);
        // Should not panic
        formatter.print_probe_report(&ProbeReport {
            status: 200,
            content_type: Some("text/plain".to_string()),
            warnings: vec![ProbeWarning::UnexpectedContentType("text/plain".to_string())],
        });
    }

    #[test]
    fn test_print_download_complete() {
        let formatter = OutputFormatter::new(Verbosity::Normal);
        // Should not panic
        formatter.print_download_complete("/tmp/out.mp4", Duration::from_secs(75));
    }
}
