//! Granule discovery for streaming and range-published families

use crate::error::{Result, WatchError};
use crate::timestamp::GranulePattern;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One timestamped data file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Granule {
    pub path: PathBuf,
    pub file_name: String,
    pub timestamp: NaiveDateTime,
}

/// Collect every granule below `root` down to `depth` levels
///
/// Names that do not match `pattern` are skipped; a missing root yields an
/// empty list. Results are ordered by timestamp, then path.
pub fn list_granules(root: &Path, pattern: GranulePattern, depth: usize) -> Result<Vec<Granule>> {
    if !root.exists() {
        tracing::warn!("Granule directory does not exist: {}", root.display());
        return Ok(Vec::new());
    }

    let mut granules = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(depth.max(1)).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            WatchError::io(path, e.into())
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };

        match pattern.parse(file_name) {
            Ok(timestamp) => granules.push(Granule {
                path: entry.path().to_path_buf(),
                file_name: file_name.to_string(),
                timestamp,
            }),
            Err(_) => tracing::trace!("Ignoring non-granule file {}", entry.path().display()),
        }
    }

    granules.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.path.cmp(&b.path)));
    Ok(granules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lists_flat_radar_granules() {
        let temp = TempDir::new().unwrap();
        for name in ["01-01-2025-00-02.tif", "01-01-2025-00-01.tif", "index.shp", "bad-name.tif"] {
            fs::write(temp.path().join(name), b"").unwrap();
        }

        let granules = list_granules(temp.path(), GranulePattern::DayFirstMinute, 1).unwrap();
        let names: Vec<_> = granules.iter().map(|g| g.file_name.as_str()).collect();
        assert_eq!(names, vec!["01-01-2025-00-01.tif", "01-01-2025-00-02.tif"]);
    }

    #[test]
    fn test_respects_depth() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("hs");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("01-01-2025-06.tif"), b"").unwrap();

        assert!(list_granules(temp.path(), GranulePattern::DayFirstHour, 1).unwrap().is_empty());
        assert_eq!(list_granules(temp.path(), GranulePattern::DayFirstHour, 2).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let granules = list_granules(&temp.path().join("files"), GranulePattern::DayFirstMinute, 1).unwrap();
        assert!(granules.is_empty());
    }
}
