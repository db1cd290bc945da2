//! Running ffmpeg for a single download

use crate::core::progress::{Progress, ProgressParser};
use crate::core::request::{DownloadRequest, Verbosity};
use crate::core::resolver::ResolvedExecutable;
use crate::error::{BtRecoverError, ErrorKind};
use crate::utils::{ensure_parent_dir, remove_partial, render_command};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, trace, warn};

/// Default cap on captured ffmpeg stderr
pub const DEFAULT_DIAGNOSTIC_LIMIT: usize = 64 * 1024;

/// How an invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// ffmpeg exited with code 0
    Completed,
    /// Nothing was run
    DryRun,
    /// Destination exists and overwriting was not allowed
    DestinationConflict,
    /// The destination's parent directory could not be created
    DirectoryUnavailable,
    /// ffmpeg could not be started
    LaunchFailed,
    /// ffmpeg ran and exited with a nonzero code
    NonzeroExit,
    /// The run was interrupted (Ctrl-C) while ffmpeg was running
    Interrupted,
}

/// Result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub success: bool,
    /// ffmpeg's exit code, 0 for success and dry runs, -1 when there is none
    pub exit_code: i32,
    pub diagnostic: Option<String>,
    pub status: OutcomeStatus,
}

impl DownloadOutcome {
    fn succeeded(status: OutcomeStatus, diagnostic: Option<String>) -> Self {
        Self {
            success: true,
            exit_code: 0,
            diagnostic,
            status,
        }
    }

    fn failed(status: OutcomeStatus, exit_code: i32, diagnostic: String) -> Self {
        Self {
            success: false,
            exit_code,
            diagnostic: Some(diagnostic),
            status,
        }
    }

    /// Failure category, `None` for successful outcomes
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.status {
            OutcomeStatus::Completed | OutcomeStatus::DryRun => None,
            OutcomeStatus::DestinationConflict => Some(ErrorKind::DestinationConflict),
            OutcomeStatus::DirectoryUnavailable => Some(ErrorKind::Unexpected),
            OutcomeStatus::LaunchFailed => Some(ErrorKind::SubprocessLaunchFailure),
            OutcomeStatus::NonzeroExit | OutcomeStatus::Interrupted => {
                Some(ErrorKind::SubprocessNonzeroExit)
            }
        }
    }

    /// Turn a failed outcome into the matching error, `None` on success
    pub fn into_error(self, program: &Path, destination: &Path) -> Option<BtRecoverError> {
        let diagnostic = self.diagnostic.unwrap_or_default();
        let error = match self.status {
            OutcomeStatus::Completed | OutcomeStatus::DryRun => return None,
            OutcomeStatus::DestinationConflict => {
                BtRecoverError::DestinationConflict(destination.to_path_buf())
            }
            OutcomeStatus::DirectoryUnavailable => {
                BtRecoverError::IoError(std::io::Error::other(diagnostic))
            }
            OutcomeStatus::LaunchFailed => BtRecoverError::SubprocessLaunch {
                program: program.to_path_buf(),
                source: std::io::Error::other(diagnostic),
            },
            OutcomeStatus::NonzeroExit => BtRecoverError::SubprocessExit {
                code: self.exit_code,
                stderr: diagnostic,
            },
            OutcomeStatus::Interrupted => BtRecoverError::Interrupted,
        };
        Some(error)
    }
}

type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Builds and runs the ffmpeg remux command
#[derive(Clone)]
pub struct DownloadInvoker {
    progress_callback: Option<ProgressCallback>,
    diagnostic_limit: usize,
}

impl DownloadInvoker {
    /// Create a new invoker
    pub fn new() -> Self {
        Self {
            progress_callback: None,
            diagnostic_limit: DEFAULT_DIAGNOSTIC_LIMIT,
        }
    }

    /// Set progress callback, fed from ffmpeg's `-progress` stream
    pub fn with_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Set how many bytes of ffmpeg stderr are kept for failure reports
    pub fn with_diagnostic_limit(mut self, limit: usize) -> Self {
        self.diagnostic_limit = limit.max(1);
        self
    }

    /// Run one download. Never retries; every failure is terminal.
    pub async fn invoke(&self, executable: &ResolvedExecutable, request: DownloadRequest) -> DownloadOutcome {
        let args = build_args(&request);
        let command_line = render_command(executable.path(), &args);
        let destination = request.destination.display().to_string();

        if request.dry_run {
            let mut message = format!("Would download: {} -> {}", request.source_url, destination);
            if request.destination.exists() && !request.overwrite {
                message.push_str(" (output exists, a real run needs --force)");
            }
            message.push_str(&format!("\nCommand: {}", command_line));
            return DownloadOutcome::succeeded(OutcomeStatus::DryRun, Some(message));
        }

        if request.destination.exists() && !request.overwrite {
            return DownloadOutcome::failed(
                OutcomeStatus::DestinationConflict,
                -1,
                format!(
                    "Output file {} already exists. Use --force to overwrite.",
                    destination
                ),
            );
        }

        match ensure_parent_dir(&request.destination) {
            Ok(Some(dir)) => debug!("Created output directory {}", dir.display()),
            Ok(None) => {}
            Err(e) => {
                return DownloadOutcome::failed(
                    OutcomeStatus::DirectoryUnavailable,
                    -1,
                    format!("Cannot create output directory for {}: {}", destination, e),
                );
            }
        }

        info!("Downloading: {} -> {}", request.source_url, destination);
        debug!("FFmpeg command: {}", command_line);

        let outcome = self.run(executable, &request, args).await;

        if matches!(
            outcome.status,
            OutcomeStatus::NonzeroExit | OutcomeStatus::Interrupted
        ) && !request.keep_partial
        {
            match remove_partial(&request.destination) {
                Ok(true) => info!("Removed partial output {}", destination),
                Ok(false) => {}
                Err(e) => warn!("Could not remove partial output {}: {}", destination, e),
            }
        }

        outcome
    }

    async fn run(
        &self,
        executable: &ResolvedExecutable,
        request: &DownloadRequest,
        args: Vec<OsString>,
    ) -> DownloadOutcome {
        let progress = request.verbosity.wants_progress();

        let spawned = Command::new(executable.path())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(if progress { Stdio::piped() } else { Stdio::null() })
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                debug!("Failed to launch {}: {}", executable.path().display(), e);
                return DownloadOutcome::failed(OutcomeStatus::LaunchFailed, -1, e.to_string());
            }
        };

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(collect_stderr(stderr, request.verbosity, self.diagnostic_limit))
        });
        let stdout_task = child
            .stdout
            .take()
            .map(|stdout| tokio::spawn(forward_progress(stdout, self.progress_callback.clone())));

        let waited = tokio::select! {
            status = child.wait() => Waited::Exited(status),
            Ok(()) = tokio::signal::ctrl_c() => Waited::Interrupted,
        };

        if matches!(waited, Waited::Interrupted) {
            warn!("Interrupted, stopping ffmpeg");
            if let Err(e) = child.kill().await {
                warn!("Failed to stop ffmpeg: {}", e);
            }
        }

        let stderr_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        if let Some(task) = stdout_task {
            let _ = task.await;
        }

        match waited {
            Waited::Exited(Ok(status)) if status.success() => {
                DownloadOutcome::succeeded(OutcomeStatus::Completed, None)
            }
            Waited::Exited(Ok(status)) => DownloadOutcome::failed(
                OutcomeStatus::NonzeroExit,
                status.code().unwrap_or(-1),
                failure_message(status, stderr_tail),
            ),
            Waited::Exited(Err(e)) => DownloadOutcome::failed(
                OutcomeStatus::LaunchFailed,
                -1,
                format!("Lost track of ffmpeg process: {}", e),
            ),
            Waited::Interrupted => DownloadOutcome::failed(
                OutcomeStatus::Interrupted,
                -1,
                "Download interrupted".to_string(),
            ),
        }
    }
}

impl Default for DownloadInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DownloadInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadInvoker")
            .field("progress_callback", &self.progress_callback.is_some())
            .field("diagnostic_limit", &self.diagnostic_limit)
            .finish()
    }
}

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    Interrupted,
}

/// ffmpeg arguments for a lossless remux of `request.source_url`
pub fn build_args(request: &DownloadRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(request.verbosity.ffmpeg_loglevel().into());

    if request.verbosity.wants_progress() {
        args.extend(["-progress", "pipe:1", "-nostats"].iter().map(OsString::from));
    }

    args.push(if request.overwrite { "-y" } else { "-n" }.into());

    args.push("-i".into());
    args.push(request.source_url.clone().into());

    // Copy both streams as-is: a remux, never a transcode
    args.extend(["-c:v", "copy", "-c:a", "copy"].iter().map(OsString::from));

    args.push(request.destination.clone().into_os_string());
    args
}

fn failure_message(status: ExitStatus, stderr_tail: String) -> String {
    let stderr_tail = stderr_tail.trim().to_string();
    if stderr_tail.is_empty() {
        format!("ffmpeg exited with {}", status)
    } else {
        stderr_tail
    }
}

/// Forward ffmpeg's log lines and keep the newest ones for failure reports
async fn collect_stderr<R>(stderr: R, verbosity: Verbosity, limit: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut tail = DiagnosticBuffer::new(limit);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                forward_log_line(verbosity, line);
                tail.push(line);
            }
            Err(e) => {
                debug!("Stopped reading ffmpeg stderr: {}", e);
                break;
            }
        }
    }

    tail.into_string()
}

fn forward_log_line(verbosity: Verbosity, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    match verbosity {
        Verbosity::Quiet => {}
        Verbosity::Normal => warn!(target: "ffmpeg", "{}", line),
        Verbosity::Verbose => info!(target: "ffmpeg", "{}", line),
        Verbosity::Debug => debug!(target: "ffmpeg", "{}", line),
    }
}

/// Parse the `-progress` stream; always drains stdout so ffmpeg never blocks
async fn forward_progress<R>(stdout: R, callback: Option<ProgressCallback>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut parser = ProgressParser::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if let Some(progress) = parser.push_line(&line) {
                    trace!("Progress: {}", progress.summary());
                    if let Some(callback) = &callback {
                        callback(progress);
                    }
                }
            }
        }
    }
}

/// Bounded buffer holding the most recent lines of output
#[derive(Debug)]
pub struct DiagnosticBuffer {
    lines: VecDeque<String>,
    bytes: usize,
    limit: usize,
    truncated: bool,
}

impl DiagnosticBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
            limit: limit.max(1),
            truncated: false,
        }
    }

    /// Append a line, evicting the oldest ones past the byte limit
    pub fn push(&mut self, line: &str) {
        // One byte per line for the joining newline
        let line = if line.len() + 1 > self.limit {
            self.truncated = true;
            let mut start = line.len() + 1 - self.limit;
            while !line.is_char_boundary(start) {
                start += 1;
            }
            &line[start..]
        } else {
            line
        };

        self.bytes += line.len() + 1;
        self.lines.push_back(line.to_string());

        while self.bytes > self.limit {
            match self.lines.pop_front() {
                Some(old) => {
                    self.bytes -= old.len() + 1;
                    self.truncated = true;
                }
                None => break,
            }
        }
    }

    /// Bytes currently held, counting one newline per line
    pub fn len(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether older output was dropped
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn into_string(self) -> String {
        Vec::from(self.lines).join("\n")
    }
}
