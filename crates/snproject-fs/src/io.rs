//! Atomic I/O operations with file locking, plus move/delete housekeeping

use crate::{Error, NormalizedPath, Result};
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

/// Replace `path` with `content` in one step.
///
/// The bytes go to a locked sibling temp file which is then renamed over
/// the target, so readers see either the old body or the new one.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))?;

    Ok(())
}

/// Whole file as UTF-8.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write a text body atomically, appending a final newline if it is missing.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    if content.ends_with('\n') {
        write_atomic(path, content.as_bytes())
    } else {
        let mut terminated = String::with_capacity(content.len() + 1);
        terminated.push_str(content);
        terminated.push('\n');
        write_atomic(path, terminated.as_bytes())
    }
}

/// Move a file, creating the destination directory and replacing any file
/// already at the destination.
///
/// Falls back to copy-and-remove when a plain rename is not possible
/// (e.g. across devices).
pub fn move_file(from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
    let source = from.to_native();
    let target = to.to_native();

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    if fs::rename(&source, &target).is_ok() {
        return Ok(());
    }

    fs::copy(&source, &target).map_err(|e| Error::io(&target, e))?;
    fs::remove_file(&source).map_err(|e| Error::io(&source, e))?;
    Ok(())
}

/// Delete a file.
///
/// Returns `Ok(false)` when there was nothing to delete.
pub fn remove_file(path: &NormalizedPath) -> Result<bool> {
    let native_path = path.to_native();
    match fs::remove_file(&native_path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(&native_path, e)),
    }
}

/// Remove empty directories upward, starting at `dir`, stopping at the first
/// non-empty directory and never touching `root` itself or anything outside it.
///
/// Returns the directories that were removed, deepest first.
pub fn prune_empty_dirs(dir: &NormalizedPath, root: &NormalizedPath) -> Result<Vec<PathBuf>> {
    if !dir.starts_with(root) {
        return Err(Error::OutsideRoot {
            path: dir.to_native(),
            root: root.to_native(),
        });
    }

    let root_str = root.as_str().trim_end_matches('/');
    let mut removed = Vec::new();
    let mut current = Some(dir.clone());

    while let Some(candidate) = current {
        if candidate.as_str().trim_end_matches('/') == root_str || !candidate.starts_with(root) {
            break;
        }

        let native = candidate.to_native();
        let is_empty = match fs::read_dir(&native) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                current = candidate.parent();
                continue;
            }
            Err(e) => return Err(Error::io(&native, e)),
        };
        if !is_empty {
            break;
        }

        fs::remove_dir(&native).map_err(|e| Error::io(&native, e))?;
        tracing::debug!(dir = %candidate, "Removed empty directory");
        removed.push(native);
        current = candidate.parent();
    }

    Ok(removed)
}
