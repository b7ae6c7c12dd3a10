//! Retention maintenance pass

use super::Context;
use crate::util;
use anyhow::Result;
use ledger::Publication;
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// Prune every retaining watch, anchored to what is already published
///
/// `dir` restricts the pass to one watched directory.
pub async fn run(ctx: &Context, names: &[String], dir: Option<PathBuf>) -> Result<()> {
    let dispatcher = ctx.dispatcher()?;

    for spec in ctx.watches(names)? {
        if spec.retention_hours.is_none() {
            if !names.is_empty() {
                println!("{:<16} {}", spec.name.cyan(), "no retention window".dimmed());
            }
            continue;
        }

        let dirs = match &dir {
            Some(dir) => vec![dir.clone()],
            None => spec.dirs.clone(),
        };

        let publication = Publication::new(&spec, &dispatcher);
        for dir in &dirs {
            match publication.maintain(dir)? {
                Some(report) => println!(
                    "{:<16} removed {} older than {} from {} ({} kept)",
                    spec.name.cyan(),
                    util::plural(report.removed.len(), "granule"),
                    report.cutoff,
                    report.root.display(),
                    report.retained
                ),
                None => println!(
                    "{:<16} {}",
                    spec.name.cyan(),
                    format!("nothing to prune in {}", dir.display()).dimmed()
                ),
            }
        }
    }
    Ok(())
}
