//! Resolved description of one watched dataset

use crate::error::{Result, WatchError};
use crate::family::Family;
use crate::marker::MarkerSuffixes;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default task used to drop catalog entries of pruned granules
pub const DEFAULT_CATALOG_TASK: &str = "remove_granules";

/// One watch: a family checked across one or more directories
///
/// Selection of the latest batch spans all directories of a watch; markers
/// for a batch always live in the directory its ready marker was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSpec {
    pub name: String,
    pub family: Family,
    pub dirs: Vec<PathBuf>,
    pub suffixes: MarkerSuffixes,
    pub task: String,
    pub debounce: Duration,
    pub retention_hours: Option<u64>,
    /// Granule location, relative to the watched directory unless absolute
    pub granule_dir: Option<PathBuf>,
    /// Where retention deletes files; defaults to the granule location
    pub prune_dir: Option<PathBuf>,
    /// Variable name passed to streaming tasks; defaults to the directory name
    pub variable: Option<String>,
    /// Task that removes catalog entries for pruned granules; `None` disables it
    pub catalog_task: Option<String>,
}

impl WatchSpec {
    /// Spec with the family's defaults
    pub fn new(name: impl Into<String>, family: Family, dirs: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            family,
            dirs,
            suffixes: MarkerSuffixes::default(),
            task: family.default_task().to_string(),
            debounce: Duration::from_secs(family.debounce_secs()),
            retention_hours: family.retention_hours(),
            granule_dir: family.default_granule_dir().map(PathBuf::from),
            prune_dir: None,
            variable: None,
            catalog_task: family.is_streaming().then(|| DEFAULT_CATALOG_TASK.to_string()),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_retention_hours(mut self, hours: Option<u64>) -> Self {
        self.retention_hours = hours;
        self
    }

    pub fn with_granule_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.granule_dir = Some(dir.into());
        self
    }

    pub fn with_prune_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prune_dir = Some(dir.into());
        self
    }

    pub fn with_catalog_task(mut self, task: Option<String>) -> Self {
        self.catalog_task = task;
        self
    }

    /// Directory holding the granules that belong to markers in `dir`
    pub fn granule_root(&self, dir: &Path) -> PathBuf {
        match &self.granule_dir {
            Some(sub) => dir.join(sub),
            None => dir.to_path_buf(),
        }
    }

    /// Directory the retention pruner works on for markers in `dir`
    pub fn prune_root(&self, dir: &Path) -> PathBuf {
        match &self.prune_dir {
            Some(prune) => dir.join(prune),
            None => self.granule_root(dir),
        }
    }

    /// Variable name reported to streaming tasks
    pub fn variable_for(&self, dir: &Path) -> String {
        self.variable.clone().unwrap_or_else(|| {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.name.clone())
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WatchError::Config("watch name must not be empty".to_string()));
        }
        if self.dirs.is_empty() {
            return Err(WatchError::Config(format!("watch '{}' has no directories", self.name)));
        }
        if self.task.trim().is_empty() {
            return Err(WatchError::Config(format!("watch '{}' has an empty task name", self.name)));
        }
        if self.debounce.is_zero() {
            return Err(WatchError::Config(format!("watch '{}' needs a debounce above zero", self.name)));
        }
        if self.retention_hours.is_some() && self.family.granule_pattern().is_none() {
            return Err(WatchError::Config(format!(
                "watch '{}': family {} has no granules to retain",
                self.name, self.family
            )));
        }
        self.suffixes.validate()
    }
}
