//! Lock file management for watch loop exclusivity
//!
//! Claim markers already keep overlapping checkers from double-triggering;
//! this lock only keeps two `geowatch watch` loops from running against the
//! same state directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "geowatch.lock";

/// Watch loop lock file
pub struct LoopLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    /// Unix timestamp in milliseconds
    pub started_at: u64,
}

impl LoopLock {
    /// Acquire the exclusive loop lock in `state_dir`
    ///
    /// Fails when another live process holds it. A lock left behind by a
    /// dead process is removed and acquisition retried.
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_dir)
            .with_context(|| format!("Failed to create state directory {}", state_dir.display()))?;
        let lock_path = state_dir.join(LOCK_FILE);

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        if !try_flock_exclusive(&file)? {
            if is_stale_lock(&mut file) {
                tracing::warn!("Removing stale watch loop lock {}", lock_path.display());
                drop(file);
                std::fs::remove_file(&lock_path)?;
                return Self::acquire(state_dir);
            }
            anyhow::bail!("Watch loop already running (lock {} held by active process)", lock_path.display());
        }

        write_lock_content(&mut file)?;

        Ok(Self { path: lock_path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and remove its file
    pub fn release(self) -> Result<()> {
        std::fs::remove_file(&self.path).context("Failed to remove lock file")?;
        Ok(())
    }

    /// Current holder of the lock in `state_dir`, if a live process holds it
    pub fn holder(state_dir: &Path) -> Option<LockHolder> {
        let mut file = File::open(state_dir.join(LOCK_FILE)).ok()?;
        let content = read_lock_content(&mut file).ok()?;
        is_process_alive(content.pid).then_some(content)
    }
}

impl Drop for LoopLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn is_stale_lock(file: &mut File) -> bool {
    match read_lock_content(file) {
        Ok(content) => !is_process_alive(content.pid),
        // Unreadable content means a writer died mid-write
        Err(_) => true,
    }
}

fn write_lock_content(file: &mut File) -> Result<()> {
    let content = LockHolder {
        pid: std::process::id(),
        started_at: current_timestamp_ms(),
    };
    let serialized = serde_json::to_string(&content).context("Failed to serialize lock content")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_lock_content(file: &mut File) -> Result<LockHolder> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to deserialize lock content")
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Check if process is alive
#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Null signal: existence check only
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        // Permission denied means someone else's live process
        Err(_) => true,
    }
}

fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
