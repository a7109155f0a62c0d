//! File operations for export output.
//!
//! - Atomic writes: write to temp file, sync to disk, then rename
//! - Best-effort removal of deleted output and the directories it leaves empty

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file (same path with a `.tmp` suffix)
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let temp_path = temp_path_for(path);

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        // Sync to disk before rename
        writer.get_ref().sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Remove an output file recorded at `relative` under `root`.
///
/// Returns `Ok(false)` when there was nothing to delete. With `prune`, empty
/// ancestor directories are removed afterwards, up to but excluding `root`.
///
/// # Errors
///
/// Returns an error if `relative` leaves `root`, or if the file exists but
/// cannot be removed.
pub fn remove_output_file(root: &Path, relative: &str, prune: bool) -> io::Result<bool> {
    let escapes = Path::new(relative)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to delete outside the export root: {relative}"),
        ));
    }

    let path = root.join(relative);
    if !path.is_file() {
        return Ok(false);
    }

    fs::remove_file(&path)?;

    if prune {
        if let Some(parent) = path.parent() {
            prune_empty_dirs(parent, root);
        }
    }

    Ok(true)
}

/// Remove `dir` and its ancestors while they are empty, stopping at `stop_at`.
///
/// Best effort: the first directory that is not empty or cannot be removed
/// ends the walk, and errors are ignored.
pub fn prune_empty_dirs(dir: &Path, stop_at: &Path) {
    let mut current = Some(dir);

    while let Some(dir) = current {
        if dir == stop_at || !dir.starts_with(stop_at) {
            break;
        }

        let is_empty = fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none());
        if !is_empty || fs::remove_dir(dir).is_err() {
            break;
        }

        tracing::debug!(dir = %dir.display(), "Removed empty directory");
        current = dir.parent();
    }
}

/// Get the size of a file in bytes.
///
/// Returns 0 if the file doesn't exist.
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
