//! Task payload builders, one per family

use crate::select::Batch;
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use geowatch_core::{list_granules, Family, Granule, GranulePattern, MarkerRange, Result, WatchSpec};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Everything needed to claim and trigger one batch
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPayload {
    /// JSON arguments for the task
    pub args: Value,
    /// Stem the claim marker is named after (identifier or range)
    pub claim_stem: String,
    /// Extra `Key: value` lines for the claim body
    pub claim_fields: Vec<(&'static str, String)>,
}

/// Result of building a payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Ready(TaskPayload),
    /// A streaming batch with no granules left to publish
    NothingPending,
}

/// Build the payload for `batch`
pub fn build(spec: &WatchSpec, batch: &Batch) -> Result<Payload> {
    let mut args = Map::new();
    args.insert("watch".into(), json!(spec.name));
    args.insert("identifier".into(), json!(batch.identifier));
    args.insert("source_file".into(), json!(batch.source_file()));
    args.insert("source_dir".into(), json!(batch.dir().display().to_string()));

    let mut claim_stem = batch.identifier.clone();
    let mut claim_fields = Vec::new();

    match spec.family {
        Family::Mosaic => {
            // The run hour sits in the last two digits of `YYYYMMDDHH`
            let run = batch.identifier.get(8..10).unwrap_or("00");
            args.insert("run".into(), json!(run));
            args.insert("date".into(), json!(iso_date(batch.timestamp)));
        }
        Family::Seasonal => {
            args.insert("date".into(), json!(iso_date(batch.timestamp)));
        }
        Family::SubSeasonal => {
            args.insert("run_date".into(), json!(batch.identifier));
            if let Some(range) = granule_range(spec, batch)? {
                claim_stem = range.to_string();
                args.insert("range".into(), json!(claim_stem));
            }
        }
        Family::Radar => {
            let pending = pending_granules(spec, batch)?;
            if pending.is_empty() {
                info!(
                    "No pending {} files for {} up to {}",
                    spec.variable_for(batch.dir()),
                    spec.name,
                    batch.identifier
                );
                return Ok(Payload::NothingPending);
            }

            let format = spec.family.id_format();
            // The claim range ends at the batch itself so it keeps covering it
            // even when the newest minute has no granule yet
            let range = MarkerRange::new(pending[0].timestamp, batch.timestamp, format);
            let filenames: Vec<&str> = pending.iter().map(|g| g.file_name.as_str()).collect();
            let dates: Vec<String> = pending.iter().map(|g| format.format(g.timestamp)).collect();

            info!("Found {} pending files for {} in range {}", pending.len(), spec.name, range);
            claim_stem = range.to_string();
            claim_fields.push(("Files", pending.len().to_string()));
            args.insert("variable".into(), json!(spec.variable_for(batch.dir())));
            args.insert("filenames".into(), json!(filenames));
            args.insert("dates".into(), json!(dates));
            args.insert("range".into(), json!(claim_stem));
        }
        Family::Wave => {
            args.insert("run_date".into(), json!(batch.identifier));
        }
    }

    Ok(Payload::Ready(TaskPayload {
        args: Value::Object(args),
        claim_stem,
        claim_fields,
    }))
}

/// Radar granules in `[batch − retention, batch]` that carry their canonical name
///
/// Every minute of the window is a candidate; only the ones present on disk
/// are pending. One granule per minute is kept.
fn pending_granules(spec: &WatchSpec, batch: &Batch) -> Result<Vec<Granule>> {
    let Some(pattern) = spec.family.granule_pattern() else {
        return Ok(Vec::new());
    };
    let hours = spec.retention_hours.or(spec.family.retention_hours()).unwrap_or(0);
    let start = batch.timestamp - ChronoDuration::hours(hours as i64);
    let root = spec.granule_root(batch.dir());

    let mut by_minute: BTreeMap<NaiveDateTime, Granule> = BTreeMap::new();
    for granule in list_granules(&root, pattern, spec.family.granule_depth())? {
        if granule.timestamp < start || granule.timestamp > batch.timestamp {
            continue;
        }
        if !is_canonical(pattern, &granule) {
            debug!("Ignoring non-canonical granule name {}", granule.file_name);
            continue;
        }
        by_minute.entry(granule.timestamp).or_insert(granule);
    }

    Ok(by_minute.into_values().collect())
}

fn is_canonical(pattern: GranulePattern, granule: &Granule) -> bool {
    pattern.file_name(granule.timestamp) == granule.file_name
}

/// Span of the dated granules below the batch's granule root
fn granule_range(spec: &WatchSpec, batch: &Batch) -> Result<Option<MarkerRange>> {
    let Some(pattern) = spec.family.granule_pattern() else {
        return Ok(None);
    };
    let root = spec.granule_root(batch.dir());
    let granules = list_granules(&root, pattern, spec.family.granule_depth())?;
    Ok(MarkerRange::spanning(
        granules.iter().map(|g| g.timestamp),
        spec.family.range_format(),
    ))
}

fn iso_date(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Candidate;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn batch(family: Family, dir: &Path, identifier: &str) -> Batch {
        Batch {
            identifier: identifier.to_string(),
            timestamp: family.id_format().parse(identifier).unwrap(),
            source: Candidate {
                dir: dir.to_path_buf(),
                file_name: format!("{}.READY", identifier),
            },
        }
    }

    fn ready(payload: Payload) -> TaskPayload {
        match payload {
            Payload::Ready(p) => p,
            Payload::NothingPending => panic!("expected a payload"),
        }
    }

    #[test]
    fn test_mosaic_payload_splits_run_and_date() {
        let temp = TempDir::new().unwrap();
        let spec = WatchSpec::new("icon", Family::Mosaic, vec![temp.path().to_path_buf()]);
        let payload = ready(build(&spec, &batch(Family::Mosaic, temp.path(), "2025010112")).unwrap());

        assert_eq!(payload.args["run"], "12");
        assert_eq!(payload.args["date"], "2025-01-01");
        assert_eq!(payload.args["source_file"], "2025010112.READY");
        assert_eq!(payload.claim_stem, "2025010112");
    }

    #[test]
    fn test_seasonal_and_wave_payloads() {
        let temp = TempDir::new().unwrap();
        let seasonal = WatchSpec::new("seasonal", Family::Seasonal, vec![temp.path().to_path_buf()]);
        let payload = ready(build(&seasonal, &batch(Family::Seasonal, temp.path(), "20250301")).unwrap());
        assert_eq!(payload.args["date"], "2025-03-01");

        let wave = WatchSpec::new("ww3", Family::Wave, vec![temp.path().to_path_buf()]);
        let payload = ready(build(&wave, &batch(Family::Wave, temp.path(), "2025010100")).unwrap());
        assert_eq!(payload.args["run_date"], "2025010100");
        assert_eq!(payload.claim_stem, "2025010100");
    }

    #[test]
    fn test_radar_pending_set() {
        let temp = TempDir::new().unwrap();
        let files = temp.path().join("files");
        fs::create_dir(&files).unwrap();
        for name in [
            "01-01-2025-11-58.tif",
            "01-01-2025-11-59.tif",
            "01-01-2025-12-00.tif",
            // beyond the batch
            "01-01-2025-12-01.tif",
            // older than the window
            "28-12-2024-11-59.tif",
            "notes.txt",
        ] {
            fs::write(files.join(name), b"").unwrap();
        }

        let spec = WatchSpec::new("radar-sri", Family::Radar, vec![temp.path().to_path_buf()]);
        let payload = ready(build(&spec, &batch(Family::Radar, temp.path(), "202501011200")).unwrap());

        assert_eq!(
            payload.args["filenames"],
            json!(["01-01-2025-11-58.tif", "01-01-2025-11-59.tif", "01-01-2025-12-00.tif"])
        );
        assert_eq!(payload.args["dates"][0], "202501011158");
        assert_eq!(payload.claim_stem, "202501011158-202501011200");
        assert_eq!(payload.claim_fields, vec![("Files", "3".to_string())]);
        assert_eq!(payload.args["variable"], json!(temp.path().file_name().unwrap().to_str().unwrap()));
    }

    #[test]
    fn test_radar_empty_pending_set() {
        let temp = TempDir::new().unwrap();
        let spec = WatchSpec::new("radar-sri", Family::Radar, vec![temp.path().to_path_buf()]);
        let payload = build(&spec, &batch(Family::Radar, temp.path(), "202501011200")).unwrap();
        assert_eq!(payload, Payload::NothingPending);
    }

    #[test]
    fn test_sub_seasonal_range_from_granules() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("precipitation").join("anomaly");
        fs::create_dir_all(&nested).unwrap();
        for name in ["2025-01-06.tif", "2025-02-02.tiff", "2025-03-02.tif"] {
            fs::write(nested.join(name), b"").unwrap();
        }

        let spec = WatchSpec::new("sub", Family::SubSeasonal, vec![temp.path().to_path_buf()]);
        let payload = ready(build(&spec, &batch(Family::SubSeasonal, temp.path(), "20250105")).unwrap());
        assert_eq!(payload.args["range"], "20250106-20250302");
        assert_eq!(payload.claim_stem, "20250106-20250302");
    }

    #[test]
    fn test_sub_seasonal_without_granules_uses_identifier() {
        let temp = TempDir::new().unwrap();
        let spec = WatchSpec::new("sub", Family::SubSeasonal, vec![temp.path().to_path_buf()]);
        let payload = ready(build(&spec, &batch(Family::SubSeasonal, temp.path(), "20250105")).unwrap());
        assert!(payload.args.get("range").is_none());
        assert_eq!(payload.claim_stem, "20250105");
    }
}
