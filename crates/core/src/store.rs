//! Filesystem primitives for marker state
//!
//! The watched directories are the only durable store. Markers are always
//! written as whole files: content goes to a temporary file in the target
//! directory, is fsynced, then renamed (or hard-linked, for exclusive
//! creation) into place.

use crate::error::{Result, WatchError};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

/// Atomic write helper
///
/// Replaces `target` with `data` in one rename. Readers observe either the
/// old or the new content, never a torn file.
pub fn atomic_write(target: &Path, data: &[u8]) -> Result<()> {
    let temp = staged(target, data)?;
    temp.persist(target).map_err(|e| WatchError::io(target, e.error))?;
    sync_parent(target);
    Ok(())
}

/// Create `target` with `data` only if it does not exist yet
///
/// Returns `Ok(false)` when another writer created the file first. The
/// existence check and the creation are one filesystem operation.
pub fn create_exclusive(target: &Path, data: &[u8]) -> Result<bool> {
    let temp = staged(target, data)?;
    match temp.persist_noclobber(target) {
        Ok(_) => {
            sync_parent(target);
            Ok(true)
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(WatchError::io(target, e.error)),
    }
}

/// Remove a file, treating "already gone" as success
///
/// Returns whether this call removed the file.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(WatchError::io(path, e)),
    }
}

/// Time since the file was last modified; `None` if it does not exist
///
/// A modification time in the future counts as age zero.
pub fn file_age(path: &Path, now: SystemTime) -> Result<Option<Duration>> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(WatchError::io(path, e)),
    };
    let modified = metadata.modified().map_err(|e| WatchError::io(path, e))?;
    Ok(Some(now.duration_since(modified).unwrap_or(Duration::ZERO)))
}

/// Names of regular files in `dir`, sorted
///
/// Returns `None` if the directory does not exist.
pub fn list_file_names(dir: &Path) -> Result<Option<Vec<String>>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(WatchError::io(dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| WatchError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| WatchError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => tracing::warn!("Skipping non UTF-8 file name {:?} in {}", raw, dir.display()),
        }
    }
    names.sort();
    Ok(Some(names))
}

fn staged(target: &Path, data: &[u8]) -> Result<NamedTempFile> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| WatchError::io(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| WatchError::io(parent, e))?;
    temp.write_all(data).map_err(|e| WatchError::io(temp.path(), e))?;
    temp.as_file().sync_all().map_err(|e| WatchError::io(temp.path(), e))?;
    Ok(temp)
}

#[cfg(unix)]
fn sync_parent(target: &Path) {
    if let Some(parent) = target.parent() {
        if let Ok(dir) = std::fs::File::open(parent) {
            if let Err(e) = dir.sync_all() {
                tracing::debug!("Failed to fsync {}: {}", parent.display(), e);
            }
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_target: &Path) {}
