//! Locating and verifying the ffmpeg executable

use crate::error::BtRecoverError;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Conventional binary name looked up on the search path
#[cfg(windows)]
pub const FFMPEG_BINARY: &str = "ffmpeg.exe";
#[cfg(not(windows))]
pub const FFMPEG_BINARY: &str = "ffmpeg";

const INSTALL_HINT: &str = "ffmpeg not found. Please install ffmpeg or provide path using --ffmpeg option. \
See https://ffmpeg.org/download.html for installation instructions.";

/// Well-known install locations for the current OS family, in probe order
pub fn default_locations() -> Vec<PathBuf> {
    let locations: &[&str] = if cfg!(windows) {
        &[
            r"C:\Program Files\ffmpeg\bin\ffmpeg.exe",
            r"C:\Program Files (x86)\ffmpeg\bin\ffmpeg.exe",
            r"C:\ffmpeg\bin\ffmpeg.exe",
        ]
    } else {
        &[
            "/usr/bin/ffmpeg",
            "/usr/local/bin/ffmpeg",
            // Homebrew on Apple Silicon
            "/opt/homebrew/bin/ffmpeg",
            // MacPorts
            "/opt/local/bin/ffmpeg",
        ]
    };

    locations.iter().map(PathBuf::from).collect()
}

/// An ffmpeg binary that passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExecutable {
    pub(crate) path: PathBuf,
    pub(crate) verified: bool,
}

impl ResolvedExecutable {
    /// Absolute path to the binary
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }
}

/// Finds ffmpeg: explicit path, then search path, then well-known locations
#[derive(Debug, Clone)]
pub struct ExecutableResolver {
    binary_name: String,
    search_path: Option<OsString>,
    locations: Vec<PathBuf>,
    self_test_timeout: Duration,
}

impl ExecutableResolver {
    /// Create a resolver over the process `PATH` and the OS default locations
    pub fn new() -> Self {
        Self {
            binary_name: FFMPEG_BINARY.to_string(),
            search_path: std::env::var_os("PATH"),
            locations: default_locations(),
            self_test_timeout: Duration::from_secs(10),
        }
    }

    /// Override the search path (`PATH`-style list)
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Override the well-known install locations
    pub fn with_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.locations = locations;
        self
    }

    /// Override the binary name looked up on the search path
    pub fn with_binary_name(mut self, name: impl Into<String>) -> Self {
        self.binary_name = name.into();
        self
    }

    /// Set how long the verification launch may take
    pub fn with_self_test_timeout(mut self, timeout: Duration) -> Self {
        self.self_test_timeout = timeout;
        self
    }

    /// Resolve the ffmpeg executable.
    ///
    /// An explicit path is authoritative: if it does not verify, resolution
    /// fails without consulting the search path or the default locations.
    pub async fn resolve(&self, explicit: Option<&Path>) -> Result<ResolvedExecutable, BtRecoverError> {
        if let Some(path) = explicit {
            debug!("Verifying explicit ffmpeg path: {}", path.display());
            if self.verify(path).await {
                return Ok(resolved(path));
            }
            return Err(BtRecoverError::ExecutableNotFound(format!(
                "ffmpeg not found or not executable at: {}",
                path.display()
            )));
        }

        if let Some(path) = self.search() {
            debug!("Found {} on search path: {}", self.binary_name, path.display());
            if self.verify(&path).await {
                info!("Using ffmpeg from search path: {}", path.display());
                return Ok(resolved(&path));
            }
            warn!("ffmpeg on search path failed verification: {}", path.display());
        }

        for location in &self.locations {
            if location.is_file() && self.verify(location).await {
                info!("Using ffmpeg from well-known location: {}", location.display());
                return Ok(resolved(location));
            }
        }

        Err(BtRecoverError::ExecutableNotFound(INSTALL_HINT.to_string()))
    }

    /// First match for the binary name on the search path
    fn search(&self) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        let cwd = std::env::current_dir().ok()?;
        which::which_in(&self.binary_name, Some(search_path), cwd).ok()
    }

    /// Check that `path` is an executable regular file that actually launches
    pub async fn verify(&self, path: &Path) -> bool {
        if !is_executable_file(path) {
            debug!("Not an executable regular file: {}", path.display());
            return false;
        }

        // Zero-byte input; only a launch failure counts, ffmpeg's own exit code does not
        let child = Command::new(path)
            .args(["-hide_banner", "-loglevel", "quiet", "-i", "pipe:0", "-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                debug!("Self-test launch of {} failed: {}", path.display(), e);
                return false;
            }
        };

        match tokio::time::timeout(self.self_test_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                debug!("Self-test of {} exited with {}", path.display(), status);
                true
            }
            Ok(Err(e)) => {
                debug!("Self-test of {} could not be awaited: {}", path.display(), e);
                false
            }
            Err(_) => {
                warn!(
                    "Self-test of {} did not finish within {:?}",
                    path.display(),
                    self.self_test_timeout
                );
                false
            }
        }
    }
}

impl Default for ExecutableResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Query `ffmpeg -version` and extract the version string
pub async fn probe_version(executable: &ResolvedExecutable) -> Option<String> {
    let output = Command::new(executable.path())
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;

    let text = String::from_utf8_lossy(&output.stdout);
    parse_version(&text).or_else(|| parse_version(&String::from_utf8_lossy(&output.stderr)))
}

/// Extract the version from ffmpeg's banner
pub fn parse_version(banner: &str) -> Option<String> {
    let re = Regex::new(r"ffmpeg version (\S+)").ok()?;
    re.captures(banner)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn resolved(path: &Path) -> ResolvedExecutable {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    ResolvedExecutable { path, verified: true }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Resolver that can only find what a test puts in front of it
    fn isolated() -> ExecutableResolver {
        ExecutableResolver::new()
            .with_search_path(None)
            .with_locations(Vec::new())
    }

    #[cfg(unix)]
    fn write_stub(dir: &Path, name: &str, mode: u32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 1\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn test_default_locations_not_empty() {
        let locations = default_locations();
        assert!(!locations.is_empty());
        #[cfg(not(windows))]
        assert_eq!(locations[0], PathBuf::from("/usr/bin/ffmpeg"));
    }

    #[test]
    fn test_parse_version() {
        let banner = "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023 the FFmpeg developers\n";
        assert_eq!(parse_version(banner), Some("6.1.1-3ubuntu5".to_string()));
        assert_eq!(parse_version("something else"), None);
    }

    #[tokio::test]
    async fn test_explicit_nonexistent_path_fails() {
        let err = isolated()
            .resolve(Some(Path::new("/nonexistent/ffmpeg")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutableNotFound);
        assert!(err.to_string().contains("/nonexistent/ffmpeg"));
    }

    #[tokio::test]
    async fn test_nothing_discoverable_fails() {
        let err = isolated().resolve(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutableNotFound);
        assert!(err.to_string().contains("https://ffmpeg.org/download.html"));
    }

    #[tokio::test]
    async fn test_directory_is_not_an_executable() {
        let temp = tempfile::tempdir().unwrap();
        let err = isolated().resolve(Some(temp.path())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutableNotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_explicit_path_without_execute_permission() {
        let temp = tempfile::tempdir().unwrap();
        let stub = write_stub(temp.path(), "ffmpeg", 0o644);

        let err = isolated().resolve(Some(&stub)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutableNotFound);
        assert!(err.to_string().contains(&stub.display().to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_explicit_valid_path() {
        let temp = tempfile::tempdir().unwrap();
        let stub = write_stub(temp.path(), "ffmpeg", 0o755);

        let resolved = isolated().resolve(Some(&stub)).await.unwrap();
        assert_eq!(resolved.path(), stub.as_path());
        assert!(resolved.is_verified());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_explicit_failure_does_not_fall_back() {
        let temp = tempfile::tempdir().unwrap();
        let stub = write_stub(temp.path(), "ffmpeg", 0o755);

        let resolver = ExecutableResolver::new()
            .with_search_path(Some(temp.path().as_os_str().to_owned()))
            .with_locations(vec![stub.clone()]);

        let err = resolver
            .resolve(Some(Path::new("/nonexistent/ffmpeg")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutableNotFound);
        assert!(err.to_string().contains("/nonexistent/ffmpeg"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_search_path_match() {
        let temp = tempfile::tempdir().unwrap();
        let stub = write_stub(temp.path(), "ffmpeg", 0o755);

        let resolver = isolated()
            .with_binary_name("ffmpeg")
            .with_search_path(Some(temp.path().as_os_str().to_owned()));

        let resolved = resolver.resolve(None).await.unwrap();
        assert_eq!(resolved.path(), stub.as_path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_well_known_location_fallback() {
        let temp = tempfile::tempdir().unwrap();
        let broken = write_stub(temp.path(), "broken-ffmpeg", 0o644);
        let good = write_stub(temp.path(), "good-ffmpeg", 0o755);

        let resolver = isolated().with_locations(vec![
            temp.path().join("missing-ffmpeg"),
            broken,
            good.clone(),
        ]);

        let resolved = resolver.resolve(None).await.unwrap();
        assert_eq!(resolved.path(), good.as_path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_self_test_timeout_rejects_hanging_binary() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ffmpeg");
        std::fs::write(&path, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = isolated().with_self_test_timeout(Duration::from_millis(200));
        assert!(!resolver.verify(&path).await);
    }
}
