//! Readiness classifier
//!
//! Decides whether the latest batch is already covered by a published
//! marker. Batch families look for the exact `<id>` marker; the radar feed
//! accepts any range marker ending at or after the batch; forecast feeds
//! published as valid-time ranges compare the recorded run instead.

use crate::select::Batch;
use geowatch_core::marker::{list_markers, MarkerFile, MarkerKind};
use geowatch_core::{Coverage, MarkerBody, MarkerRange, Result, WatchError, WatchSpec};
use std::io;
use tracing::{debug, warn};

/// What a published marker says it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishedRange {
    /// A single batch identifier
    Single(String),
    /// A closed interval of batch timestamps
    Interval(MarkerRange),
}

/// Is `batch` covered by a published marker?
pub fn is_published(spec: &WatchSpec, batch: &Batch) -> Result<bool> {
    match spec.family.coverage() {
        Coverage::Exact => {
            let path = batch.dir().join(spec.suffixes.published_name(&batch.identifier));
            Ok(path.exists())
        }
        Coverage::RangeEnd => covered_by_range_end(spec, batch),
        Coverage::RecordedRun => covered_by_recorded_run(spec, batch),
    }
}

/// Published coverage of one marker, if its name parses
pub fn published_range(spec: &WatchSpec, marker: &MarkerFile) -> Option<PublishedRange> {
    match spec.family.coverage() {
        Coverage::Exact => Some(PublishedRange::Single(marker.stem.clone())),
        Coverage::RangeEnd | Coverage::RecordedRun => {
            match MarkerRange::parse(&marker.stem, spec.family.range_format()) {
                Ok(range) if range.start == range.end => {
                    Some(PublishedRange::Single(marker.stem.clone()))
                }
                Ok(range) => Some(PublishedRange::Interval(range)),
                Err(_) => None,
            }
        }
    }
}

fn covered_by_range_end(spec: &WatchSpec, batch: &Batch) -> Result<bool> {
    let format = spec.family.range_format();

    for marker in list_markers(batch.dir(), &spec.suffixes, MarkerKind::Published)? {
        match MarkerRange::parse(&marker.stem, format) {
            Ok(range) if batch.timestamp <= range.end => {
                debug!("{} covered by {}", batch.identifier, marker.file_name);
                return Ok(true);
            }
            Ok(_) => {}
            Err(_) => warn!("Could not parse {} file: {}", spec.suffixes.published, marker.file_name),
        }
    }

    Ok(false)
}

fn covered_by_recorded_run(spec: &WatchSpec, batch: &Batch) -> Result<bool> {
    let format = spec.family.id_format();

    for marker in list_markers(batch.dir(), &spec.suffixes, MarkerKind::Published)? {
        let Some(body) = read_if_present(&marker)? else {
            continue;
        };

        let run = body.last("Run").unwrap_or(marker.stem.as_str());
        match format.parse(run) {
            Ok(recorded) if batch.timestamp <= recorded => {
                debug!("{} covered by run {} in {}", batch.identifier, run, marker.file_name);
                return Ok(true);
            }
            Ok(_) => {}
            Err(_) => warn!("Could not parse run of {} file: {}", spec.suffixes.published, marker.file_name),
        }
    }

    Ok(false)
}

/// Read a marker body; a marker deleted since listing reads as absent
pub(crate) fn read_if_present(marker: &MarkerFile) -> Result<Option<MarkerBody>> {
    match marker.read_body() {
        Ok(body) => Ok(Some(body)),
        Err(WatchError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
