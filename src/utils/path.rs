//! Destination path helpers

use std::io;
use std::path::{Path, PathBuf};

/// Directory that must exist before `destination` can be written.
///
/// Returns `None` for bare file names, which land in the working directory.
pub fn parent_dir(destination: &Path) -> Option<&Path> {
    destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Create the destination's parent directory (and its ancestors) if absent.
///
/// Returns the directory that was created, if any.
pub fn ensure_parent_dir(destination: &Path) -> io::Result<Option<PathBuf>> {
    match parent_dir(destination) {
        Some(parent) if !parent.exists() => {
            std::fs::create_dir_all(parent)?;
            Ok(Some(parent.to_path_buf()))
        }
        _ => Ok(None),
    }
}

/// Remove a partially written file, ignoring a file that is already gone
pub fn remove_partial(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
