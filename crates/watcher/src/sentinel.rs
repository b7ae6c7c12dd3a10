//! Permanent-failure sentinel
//!
//! One well-known file whose existence tells an external health check that
//! some batch exhausted its retry budget. Each stuck batch is one line:
//!
//! ```text
//! stuck watch=radar-sri batch=202501011200 claim=202501010000-202501011200 retries=2 at=2025-01-01T12:40:00+00:00
//! ```
//!
//! The file is rewritten whole on every change. A batch listed here is not
//! claimed again until an operator clears its entry.

use chrono::{DateTime, Utc};
use geowatch_core::store;
use geowatch_core::{Result, WatchError};
use std::io;
use std::path::{Path, PathBuf};

/// Default location watched by the container health check
pub const DEFAULT_SENTINEL_PATH: &str = "/status/health_check_failure";

/// A batch that exhausted its retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuckEntry {
    pub watch: String,
    pub batch: String,
    /// Stem of the claim marker that went stale last
    pub claim: String,
    pub retries: u32,
    pub at: DateTime<Utc>,
}

impl StuckEntry {
    fn render(&self) -> String {
        format!(
            "stuck watch={} batch={} claim={} retries={} at={}",
            self.watch,
            self.batch,
            self.claim,
            self.retries,
            self.at.to_rfc3339()
        )
    }

    fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        if tokens.next()? != "stuck" {
            return None;
        }

        let (mut watch, mut batch, mut claim, mut retries, mut at) = (None, None, None, None, None);
        for token in tokens {
            match token.split_once('=')? {
                ("watch", v) => watch = Some(v.to_string()),
                ("batch", v) => batch = Some(v.to_string()),
                ("claim", v) => claim = Some(v.to_string()),
                ("retries", v) => retries = v.parse().ok(),
                ("at", v) => at = DateTime::parse_from_rfc3339(v).ok().map(|t| t.with_timezone(&Utc)),
                _ => {}
            }
        }

        let batch = batch?;
        Some(Self {
            watch: watch?,
            claim: claim.unwrap_or_else(|| batch.clone()),
            batch,
            retries: retries.unwrap_or(0),
            at: at.unwrap_or_else(Utc::now),
        })
    }
}

/// Handle on the sentinel file
#[derive(Debug, Clone)]
pub struct FailureSentinel {
    path: PathBuf,
}

impl FailureSentinel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Entries currently recorded; lines that do not parse are ignored
    pub fn entries(&self) -> Result<Vec<StuckEntry>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WatchError::io(&self.path, e)),
        };
        Ok(text.lines().filter_map(StuckEntry::parse).collect())
    }

    pub fn is_stuck(&self, watch: &str, batch: &str) -> Result<bool> {
        Ok(self
            .entries()?
            .iter()
            .any(|entry| entry.watch == watch && entry.batch == batch))
    }

    /// Record a stuck batch, replacing an older entry for the same batch
    pub fn record(&self, entry: StuckEntry) -> Result<()> {
        let mut entries = self.entries()?;
        entries.retain(|e| !(e.watch == entry.watch && e.batch == entry.batch));
        entries.push(entry);
        self.write(&entries)
    }

    /// Remove entries (all, or one watch's); deletes the file once empty
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self, watch: Option<&str>) -> Result<usize> {
        let entries = self.entries()?;
        let (removed, kept): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| watch.map_or(true, |w| e.watch == w));

        if watch.is_none() || (kept.is_empty() && !removed.is_empty()) {
            store::remove_if_exists(&self.path)?;
        } else if !removed.is_empty() {
            self.write(&kept)?;
        }
        Ok(removed.len())
    }

    fn write(&self, entries: &[StuckEntry]) -> Result<()> {
        let mut text = String::new();
        for entry in entries {
            text.push_str(&entry.render());
            text.push('\n');
        }
        store::atomic_write(&self.path, text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(watch: &str, batch: &str) -> StuckEntry {
        StuckEntry {
            watch: watch.to_string(),
            batch: batch.to_string(),
            claim: batch.to_string(),
            retries: 2,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_query() {
        let temp = TempDir::new().unwrap();
        let sentinel = FailureSentinel::new(temp.path().join("status/health_check_failure"));

        assert!(!sentinel.exists());
        sentinel.record(entry("icon", "2025010100")).unwrap();

        assert!(sentinel.exists());
        assert!(sentinel.is_stuck("icon", "2025010100").unwrap());
        assert!(!sentinel.is_stuck("icon", "2025010112").unwrap());
        assert!(!sentinel.is_stuck("radar-sri", "2025010100").unwrap());
    }

    #[test]
    fn test_record_replaces_same_batch() {
        let temp = TempDir::new().unwrap();
        let sentinel = FailureSentinel::new(temp.path().join("sentinel"));

        sentinel.record(entry("icon", "2025010100")).unwrap();
        sentinel.record(entry("icon", "2025010100")).unwrap();
        sentinel.record(entry("seasonal", "20250101")).unwrap();

        assert_eq!(sentinel.entries().unwrap().len(), 2);
    }

    #[test]
    fn test_clear_one_watch_then_all() {
        let temp = TempDir::new().unwrap();
        let sentinel = FailureSentinel::new(temp.path().join("sentinel"));
        sentinel.record(entry("icon", "2025010100")).unwrap();
        sentinel.record(entry("seasonal", "20250101")).unwrap();

        assert_eq!(sentinel.clear(Some("icon")).unwrap(), 1);
        assert!(sentinel.exists());
        assert!(!sentinel.is_stuck("icon", "2025010100").unwrap());

        assert_eq!(sentinel.clear(None).unwrap(), 1);
        assert!(!sentinel.exists());
    }

    #[test]
    fn test_foreign_lines_are_ignored() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sentinel");
        std::fs::write(
            &path,
            "DataWatcher processing stuck for identifier 2025010100 after 2 retries\nTimestamp: 2025-01-01T00:00:00\n",
        )
        .unwrap();

        let sentinel = FailureSentinel::new(&path);
        assert!(sentinel.exists());
        assert!(sentinel.entries().unwrap().is_empty());
    }

    #[test]
    fn test_entry_line_roundtrip() {
        let original = entry("radar-sri", "202501011200");
        let parsed = StuckEntry::parse(&original.render()).unwrap();
        assert_eq!(parsed.watch, original.watch);
        assert_eq!(parsed.batch, original.batch);
        assert_eq!(parsed.retries, 2);
    }
}
