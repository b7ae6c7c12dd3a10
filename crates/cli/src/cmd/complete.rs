//! Record a finished publish
//!
//! Called by the publishing task once a batch is live. Writes the published
//! marker, supersedes older range markers, removes the batch's claims and,
//! for retaining watches, prunes granules outside the window.

use super::Context;
use anyhow::{Context as _, Result};
use geowatch_core::{MarkerRange, WatchSpec};
use ledger::Publication;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use watcher::scan;
use watcher::select::identifier;

pub async fn run(ctx: &Context, watch: &str, batch: &str, range: Option<&str>, dir: Option<PathBuf>) -> Result<()> {
    let spec = ctx.config.spec(watch)?;
    spec.family
        .id_format()
        .parse(batch)
        .with_context(|| format!("'{}' is not a {} batch identifier", batch, spec.family))?;

    let range = range
        .map(|stem| MarkerRange::parse(stem, spec.family.range_format()))
        .transpose()
        .context("Invalid --range")?;

    let dir = match dir {
        Some(dir) => dir,
        None => locate_dir(&spec, batch)?,
    };

    let dispatcher = ctx.dispatcher()?;
    let record = Publication::new(&spec, &dispatcher)
        .record(&dir, batch, range)
        .with_context(|| format!("Failed to record publication of {}", batch))?;

    println!("{} {}", "Published".green(), record.marker.display());
    for old in &record.superseded {
        println!("  {} {}", "superseded".dimmed(), old.display());
    }
    if record.claims_removed > 0 {
        println!("  {} {} claim(s)", "removed".dimmed(), record.claims_removed);
    }
    if let Some(report) = &record.pruned {
        println!(
            "  {} {} granules older than {} ({} kept)",
            "pruned".dimmed(),
            report.removed.len(),
            report.cutoff,
            report.retained
        );
        if let Some(task) = &report.catalog_task {
            println!("  {} {}", "catalog task".dimmed(), task);
        }
    }
    Ok(())
}

/// Directory holding the batch's ready marker; a single-directory watch
/// needs no lookup
fn locate_dir(spec: &WatchSpec, batch: &str) -> Result<PathBuf> {
    if let [only] = spec.dirs.as_slice() {
        return Ok(only.clone());
    }

    let suffixes = &spec.suffixes;
    let candidates = scan(&spec.dirs, &suffixes.ready, &suffixes.terminal_overlaps())?;
    candidates
        .into_iter()
        .find(|c| identifier(spec.family.identifier_rule(), &c.file_name, &suffixes.ready) == batch)
        .map(|c| c.dir)
        .with_context(|| format!("No {} marker for {} in any directory of '{}'; pass --dir", suffixes.ready, batch, spec.name))
}
