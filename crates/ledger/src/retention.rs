//! Retention policies and granule pruning
//!
//! The cutoff is anchored to the newest granule that is currently published,
//! never to wall-clock time, so a stalled feed keeps its last window.

use chrono::{Duration as ChronoDuration, NaiveDateTime};
use geowatch_core::{list_granules, Granule, GranulePattern, Result, TaskDispatcher, TaskRequest, WatchSpec};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Retention policy of one watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Live-data window
    pub window_hours: u64,
    pub pattern: GranulePattern,
    /// Directory depth below the prune root where granules live
    pub depth: usize,
}

impl RetentionPolicy {
    /// Policy for `spec`, if it retains granules at all
    pub fn for_spec(spec: &WatchSpec) -> Option<Self> {
        Some(Self {
            window_hours: spec.retention_hours?,
            pattern: spec.family.granule_pattern()?,
            depth: spec.family.granule_depth(),
        })
    }

    pub fn window(&self) -> ChronoDuration {
        ChronoDuration::hours(self.window_hours as i64)
    }
}

/// What one pruning pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub root: PathBuf,
    pub reference: NaiveDateTime,
    /// Granules strictly older than this were removed
    pub cutoff: NaiveDateTime,
    pub removed: Vec<Granule>,
    pub retained: usize,
    /// Catalog removal task submitted for the removed granules
    pub catalog_task: Option<String>,
}

/// Deletes granules that fell out of the retention window
pub struct RetentionPruner<'a, D: TaskDispatcher> {
    spec: &'a WatchSpec,
    catalog: D,
}

impl<'a, D: TaskDispatcher> RetentionPruner<'a, D> {
    /// `catalog` receives the catalog removal task when files are removed
    pub fn new(spec: &'a WatchSpec, catalog: D) -> Self {
        Self { spec, catalog }
    }

    pub fn policy(&self) -> Option<RetentionPolicy> {
        RetentionPolicy::for_spec(self.spec)
    }

    /// Remove every granule under `root` older than `reference − window`
    ///
    /// Returns `None` when the watch has no retention policy.
    pub fn prune(&self, root: &Path, reference: NaiveDateTime) -> Result<Option<PruneReport>> {
        let Some(policy) = self.policy() else {
            return Ok(None);
        };
        let granules = list_granules(root, policy.pattern, policy.depth)?;
        self.prune_listed(root, &policy, granules, reference).map(Some)
    }

    /// Pruning pass after a publish
    ///
    /// The reference is the newest granule not newer than `upper` (the newest
    /// overall when `upper` is `None`). Nothing is removed unless the live span
    /// exceeds the window.
    pub fn after_publish(&self, root: &Path, upper: Option<NaiveDateTime>) -> Result<Option<PruneReport>> {
        let Some(policy) = self.policy() else {
            return Ok(None);
        };

        let granules = list_granules(root, policy.pattern, policy.depth)?;
        let published: Vec<NaiveDateTime> = granules
            .iter()
            .map(|g| g.timestamp)
            .filter(|ts| upper.map_or(true, |upper| *ts <= upper))
            .collect();

        let (Some(oldest), Some(newest)) = (published.iter().min(), published.iter().max()) else {
            info!("No granules under {}, skipping retention", root.display());
            return Ok(None);
        };

        let span = *newest - *oldest;
        if span <= policy.window() {
            info!(
                "Time range ({:.1}h) within {}-hour window, skipping cleanup",
                span.num_minutes() as f64 / 60.0,
                policy.window_hours
            );
            return Ok(None);
        }

        info!(
            "Time range ({:.1}h) exceeds {} hours, cleaning up old data",
            span.num_minutes() as f64 / 60.0,
            policy.window_hours
        );
        let reference = *newest;
        self.prune_listed(root, &policy, granules, reference).map(Some)
    }

    fn prune_listed(
        &self,
        root: &Path,
        policy: &RetentionPolicy,
        granules: Vec<Granule>,
        reference: NaiveDateTime,
    ) -> Result<PruneReport> {
        let cutoff = reference - policy.window();
        let mut removed = Vec::new();
        let mut retained = 0;

        for granule in granules {
            if granule.timestamp >= cutoff {
                retained += 1;
                continue;
            }
            if geowatch_core::store::remove_if_exists(&granule.path)? {
                info!("Removed old file: {}", granule.file_name);
                removed.push(granule);
            }
        }

        if !removed.is_empty() {
            info!(
                "Removed {} files older than {} hours from {}",
                removed.len(),
                policy.window_hours,
                root.display()
            );
        }

        let catalog_task = self.submit_catalog_removal(root, cutoff, &removed);
        Ok(PruneReport {
            root: root.to_path_buf(),
            reference,
            cutoff,
            removed,
            retained,
            catalog_task,
        })
    }

    /// Ask the publisher to drop catalog entries for removed granules
    fn submit_catalog_removal(&self, root: &Path, cutoff: NaiveDateTime, removed: &[Granule]) -> Option<String> {
        let task = self.spec.catalog_task.as_ref()?;
        if removed.is_empty() {
            return None;
        }

        let filenames: Vec<&str> = removed.iter().map(|g| g.file_name.as_str()).collect();
        let dates: Vec<String> = removed
            .iter()
            .map(|g| g.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string())
            .collect();
        let request = TaskRequest::new(
            task.clone(),
            json!({
                "watch": self.spec.name,
                "root": root.display().to_string(),
                "cutoff": cutoff.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "filenames": filenames,
                "dates": dates,
            }),
        );

        match self.catalog.submit(&request) {
            Ok(()) => Some(request.id.to_string()),
            Err(e) => {
                // Files are already gone; the catalog will still list them
                error!("Failed to submit {} for {} removed granules: {}", task, removed.len(), e);
                None
            }
        }
    }
}
