//! Marker scanner
//!
//! Lists ready markers across the directories of a watch. A directory that
//! does not exist is skipped with a warning; an empty result means there is
//! nothing to do.

use geowatch_core::store;
use geowatch_core::Result;
use std::path::PathBuf;
use tracing::{debug, warn};

/// A ready marker found by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Directory the marker lives in
    pub dir: PathBuf,
    /// Marker file name
    pub file_name: String,
}

impl Candidate {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// Scan `dirs` for names ending in `ready_suffix`
///
/// Names that also end in one of `exclude_suffixes` (more specific terminal
/// suffixes sharing the ready tail, e.g. `.PUBLISHED.READY`) are not
/// candidates. Directories are visited in the given order, names within a
/// directory in lexical order.
pub fn scan(dirs: &[PathBuf], ready_suffix: &str, exclude_suffixes: &[&str]) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    for dir in dirs {
        let names = match store::list_file_names(dir)? {
            Some(names) => names,
            None => {
                warn!("Path does not exist: {}", dir.display());
                continue;
            }
        };

        candidates.extend(
            names
                .into_iter()
                .filter(|name| is_candidate(name, ready_suffix, exclude_suffixes))
                .map(|file_name| Candidate {
                    dir: dir.clone(),
                    file_name,
                }),
        );
    }

    if candidates.is_empty() {
        debug!("No {} files found in {}", ready_suffix, display_dirs(dirs));
    }

    Ok(candidates)
}

fn is_candidate(name: &str, ready_suffix: &str, exclude_suffixes: &[&str]) -> bool {
    name.len() > ready_suffix.len()
        && name.ends_with(ready_suffix)
        && !exclude_suffixes.iter().any(|suffix| name.ends_with(suffix))
}

pub(crate) fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_excludes_published_markers() {
        let temp = TempDir::new().unwrap();
        for name in [
            "2025010100.READY",
            "2025010100.PUBLISHED.READY",
            "2025010100.CHECKED",
            "2025010112.READY",
        ] {
            fs::write(temp.path().join(name), b"").unwrap();
        }

        let found = scan(&[temp.path().to_path_buf()], ".READY", &[".PUBLISHED.READY"]).unwrap();
        let names: Vec<_> = found.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(names, vec!["2025010100.READY", "2025010112.READY"]);
    }

    #[test]
    fn test_scan_skips_missing_directories() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("00");
        fs::create_dir(&present).unwrap();
        fs::write(present.join("2025010100.READY"), b"").unwrap();

        let dirs = vec![temp.path().join("missing"), present.clone()];
        let found = scan(&dirs, ".READY", &[]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].dir, present);
    }

    #[test]
    fn test_scan_empty_is_ok() {
        let temp = TempDir::new().unwrap();
        let found = scan(&[temp.path().to_path_buf()], ".READY", &[]).unwrap();
        assert!(found.is_empty());
    }
}
