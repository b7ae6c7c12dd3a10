//! Published marker bookkeeping
//!
//! Called by the publisher once a batch is live. Writing the published
//! marker is what stops the checker from triggering the batch again, so the
//! naming here mirrors the coverage rules the checker classifies with.

use crate::retention::{PruneReport, RetentionPruner};
use chrono::{NaiveDateTime, Utc};
use geowatch_core::marker::{list_markers, MarkerKind};
use geowatch_core::store;
use geowatch_core::{list_granules, Coverage, MarkerBody, MarkerRange, Result, TaskDispatcher, WatchSpec};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of recording a publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    /// Published marker that was written
    pub marker: PathBuf,
    pub range: Option<MarkerRange>,
    /// Older published markers removed in favour of the new one
    pub superseded: Vec<PathBuf>,
    pub claims_removed: usize,
    pub pruned: Option<PruneReport>,
}

/// Records a successful publish for one watch
pub struct Publication<'a, D: TaskDispatcher> {
    spec: &'a WatchSpec,
    pruner: RetentionPruner<'a, D>,
}

impl<'a, D: TaskDispatcher> Publication<'a, D> {
    /// `catalog` receives catalog removal tasks from the retention pass
    pub fn new(spec: &'a WatchSpec, catalog: D) -> Self {
        Self {
            spec,
            pruner: RetentionPruner::new(spec, catalog),
        }
    }

    /// Record that batch `identifier` in `dir` has been published
    ///
    /// Prunes first for retaining watches, then writes the published marker
    /// (named after the covered range when there is one), removes superseded
    /// published markers and finally the batch's claims.
    pub fn record(&self, dir: &Path, identifier: &str, explicit: Option<MarkerRange>) -> Result<PublishedRecord> {
        let spec = self.spec;
        let batch_ts = match spec.family.id_format().parse(identifier) {
            Ok(ts) => Some(ts),
            Err(_) => {
                warn!("{}: batch {} is not a {} identifier", spec.name, identifier, spec.family);
                None
            }
        };

        let publish_root = spec.prune_root(dir);
        let pruned = self.pruner.after_publish(&publish_root, batch_ts)?;
        let live = self.live_granules(&publish_root, batch_ts)?;

        let range = match spec.family.coverage() {
            Coverage::Exact => {
                if explicit.is_some() {
                    warn!("{}: {} markers are named by identifier, ignoring range", spec.name, spec.family);
                }
                None
            }
            Coverage::RangeEnd | Coverage::RecordedRun => match explicit {
                Some(range) => Some(range),
                None => self.granule_range(&live, batch_ts),
            },
        };

        let stem = match &range {
            Some(range) => range.to_string(),
            None => identifier.to_string(),
        };

        let mut body = MarkerBody::new(format!("Processed at {}", Utc::now().to_rfc3339()))
            .with("Run", identifier);
        if let Some(range) = &range {
            body = body.with(
                "Range",
                format!("{} to {}", range.format.format(range.start), range.format.format(range.end)),
            );
        }
        if !live.is_empty() {
            body = body.with("Granules", live.len());
        }

        let marker = dir.join(spec.suffixes.published_name(&stem));
        store::atomic_write(&marker, body.render().as_bytes())?;
        info!("Created {}", marker.display());

        let superseded = match spec.family.coverage() {
            Coverage::Exact => Vec::new(),
            Coverage::RangeEnd | Coverage::RecordedRun => self.supersede(dir, &marker)?,
        };
        let claims_removed = self.remove_claims(dir, identifier, batch_ts)?;

        Ok(PublishedRecord {
            marker,
            range,
            superseded,
            claims_removed,
            pruned,
        })
    }

    /// Retention pass anchored to the published marker(s) in `dir`
    ///
    /// Granules newer than the published range are not live yet and do not
    /// move the cutoff. Returns `None` when the watch retains nothing, nothing
    /// is published yet, or the live span fits the window.
    pub fn maintain(&self, dir: &Path) -> Result<Option<PruneReport>> {
        if self.pruner.policy().is_none() {
            return Ok(None);
        }

        let format = self.spec.family.range_format();
        let published_end = list_markers(dir, &self.spec.suffixes, MarkerKind::Published)?
            .iter()
            .filter_map(|marker| MarkerRange::parse(&marker.stem, format).ok())
            .map(|range| range.end)
            .max();

        let Some(end) = published_end else {
            debug!("{}: nothing published in {}, skipping retention", self.spec.name, dir.display());
            return Ok(None);
        };
        self.pruner.after_publish(&self.spec.prune_root(dir), Some(end))
    }

    /// Timestamps of the granules under `root` this publish covers
    ///
    /// A range-end batch covers nothing newer than itself; later granules
    /// belong to batches that have not been dispatched yet.
    fn live_granules(&self, root: &Path, batch_ts: Option<NaiveDateTime>) -> Result<Vec<NaiveDateTime>> {
        let family = self.spec.family;
        let Some(pattern) = family.granule_pattern() else {
            return Ok(Vec::new());
        };

        let upper = match family.coverage() {
            Coverage::RangeEnd => batch_ts,
            Coverage::Exact | Coverage::RecordedRun => None,
        };
        Ok(list_granules(root, pattern, family.granule_depth())?
            .into_iter()
            .map(|g| g.timestamp)
            .filter(|ts| upper.map_or(true, |upper| *ts <= upper))
            .collect())
    }

    /// Span of the covered granules
    ///
    /// A range-end watch always ends at its own batch, even when the batch's
    /// own granule is not on disk.
    fn granule_range(&self, live: &[NaiveDateTime], batch_ts: Option<NaiveDateTime>) -> Option<MarkerRange> {
        let family = self.spec.family;
        let span = MarkerRange::spanning(live.iter().copied(), family.range_format())?;

        match (family.coverage(), batch_ts) {
            (Coverage::RangeEnd, Some(ts)) => Some(MarkerRange::new(span.start, ts, span.format)),
            _ => Some(span),
        }
    }

    fn supersede(&self, dir: &Path, current: &Path) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for marker in list_markers(dir, &self.spec.suffixes, MarkerKind::Published)? {
            if marker.path == current {
                continue;
            }
            if store::remove_if_exists(&marker.path)? {
                info!("Deleted old {} file: {}", self.spec.suffixes.published, marker.file_name);
                removed.push(marker.path);
            }
        }
        Ok(removed)
    }

    fn remove_claims(&self, dir: &Path, identifier: &str, batch_ts: Option<NaiveDateTime>) -> Result<usize> {
        let suffixes = &self.spec.suffixes;
        let format = self.spec.family.range_format();
        let mut removed = 0;

        match self.spec.family.coverage() {
            Coverage::Exact => {
                if store::remove_if_exists(&dir.join(suffixes.claim_name(identifier)))? {
                    removed += 1;
                }
            }
            // A publish covers everything pending up to the batch
            Coverage::RangeEnd | Coverage::RecordedRun => {
                for claim in list_markers(dir, suffixes, MarkerKind::Claim)? {
                    let later = match (self.spec.family.coverage(), batch_ts) {
                        (Coverage::RangeEnd, Some(ts)) => {
                            MarkerRange::parse(&claim.stem, format).is_ok_and(|range| range.end > ts)
                        }
                        _ => false,
                    };
                    if later {
                        debug!("Keeping {} for a later batch", claim.file_name);
                        continue;
                    }
                    if store::remove_if_exists(&claim.path)? {
                        info!("Deleted {} file: {}", suffixes.claim, claim.file_name);
                        removed += 1;
                    }
                }
            }
        }
        Ok(removed)
    }
}
