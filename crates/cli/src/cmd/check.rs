//! Run one check over the configured watches

use super::Context;
use crate::util;
use anyhow::Result;
use geowatch_core::{TaskDispatcher, WatchSpec};
use ledger::{Publication, PruneReport};
use owo_colors::OwoColorize;
use tracing::{error, info};
use watcher::{CheckOutcome, DataWatcher, FailureSentinel};

/// One watch's check, followed by opportunistic retention when its latest
/// batch is already live
pub fn check_watch<D: TaskDispatcher>(
    spec: &WatchSpec,
    dispatcher: D,
    sentinel: &FailureSentinel,
    dry_run: bool,
) -> Result<(CheckOutcome, Vec<PruneReport>)> {
    let outcome = DataWatcher::new(spec, &dispatcher, sentinel).dry_run(dry_run).check()?;

    let mut pruned = Vec::new();
    if matches!(outcome, CheckOutcome::AlreadyPublished { .. }) && !dry_run && spec.retention_hours.is_some() {
        let publication = Publication::new(spec, &dispatcher);
        for dir in &spec.dirs {
            if let Some(report) = publication.maintain(dir)? {
                pruned.push(report);
            }
        }
    }
    Ok((outcome, pruned))
}

/// Check every selected watch once; failures of one watch do not stop the rest
pub async fn run(ctx: &Context, names: &[String], dry_run: bool) -> Result<()> {
    let specs = ctx.watches(names)?;
    let sentinel = ctx.sentinel();
    let dispatcher = ctx.dispatcher()?;

    let mut failed = 0;
    for spec in &specs {
        match check_watch(spec, &dispatcher, &sentinel, dry_run) {
            Ok((outcome, pruned)) => {
                print_outcome(&spec.name, &outcome);
                for report in pruned {
                    println!(
                        "  {} {} older than {} from {}",
                        "pruned".dimmed(),
                        util::plural(report.removed.len(), "granule"),
                        report.cutoff,
                        report.root.display()
                    );
                }
            }
            Err(e) => {
                failed += 1;
                error!("{}: check failed: {:#}", spec.name, e);
                println!("{:<16} {}", spec.name.cyan(), format!("error: {:#}", e).red());
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} watches failed", failed, specs.len());
    }
    info!("Checked {} watches", specs.len());
    Ok(())
}

fn print_outcome(name: &str, outcome: &CheckOutcome) {
    let line = outcome.to_string();
    let styled = match outcome {
        CheckOutcome::Dispatched { .. } => line.green().to_string(),
        CheckOutcome::Escalated { .. } | CheckOutcome::Failed { .. } => line.red().to_string(),
        CheckOutcome::ClaimInFlight { .. } | CheckOutcome::DryRun { .. } => line.yellow().to_string(),
        CheckOutcome::NoCandidates | CheckOutcome::AlreadyPublished { .. } | CheckOutcome::NothingPending { .. } => {
            line.dimmed().to_string()
        }
    };
    println!("{:<16} {}", name.cyan(), styled);
}
