//! Shared fixtures for watcher scenario tests

use filetime::{set_file_mtime, FileTime};
use geowatch_core::{Family, WatchSpec};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use watcher::FailureSentinel;

/// A temporary watched directory plus sentinel location
pub struct Site {
    pub temp: TempDir,
    pub dir: PathBuf,
    pub sentinel: FailureSentinel,
}

impl Site {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let dir = temp.path().join("data");
        fs::create_dir_all(&dir).expect("create watched dir");
        let sentinel = FailureSentinel::new(temp.path().join("status/health_check_failure"));
        Self { temp, dir, sentinel }
    }

    pub fn spec(&self, name: &str, family: Family) -> WatchSpec {
        WatchSpec::new(name, family, vec![self.dir.clone()])
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Create an empty file relative to the watched directory
    pub fn touch(&self, name: &str) -> PathBuf {
        self.write(name, "")
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, body).expect("write fixture");
        path
    }

    /// Write a claim marker backdated by `age_secs`
    pub fn claim(&self, name: &str, retry: u32, age_secs: u64) -> PathBuf {
        let path = self.write(name, &format!("Checked at 2025-01-01T00:00:00+00:00\nRetry: {}\n", retry));
        backdate(&path, age_secs);
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("read fixture")
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Names in a directory below the watched directory (or the directory itself)
    pub fn names(&self, sub: &str) -> Vec<String> {
        let dir = if sub.is_empty() { self.dir.clone() } else { self.dir.join(sub) };
        list(&dir)
    }
}

pub fn backdate(path: &Path, age_secs: u64) {
    let mtime = SystemTime::now() - Duration::from_secs(age_secs);
    set_file_mtime(path, FileTime::from_system_time(mtime)).expect("set mtime");
}

pub fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
