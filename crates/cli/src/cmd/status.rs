//! Show per-watch state: latest batch, publication, claims and failures

use super::Context;
use crate::locks::LoopLock;
use crate::util;
use anyhow::Result;
use geowatch_core::{list_markers, MarkerKind, WatchSpec};
use owo_colors::OwoColorize;
use std::time::SystemTime;
use watcher::{is_published, published_range, scan, select_latest, ClaimController, PublishedRange};

pub async fn run(ctx: &Context, names: &[String]) -> Result<()> {
    let specs = ctx.watches(names)?;
    let sentinel = ctx.sentinel();

    println!("{}", "Geowatch Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Config:        {}", ctx.config_path.display().to_string().cyan());
    println!("Dispatcher:    {}", ctx.config.dispatcher.describe());

    print!("Watch loop:    ");
    match LoopLock::holder(&ctx.config.state_dir) {
        Some(holder) => println!(
            "{} (PID {}, started {})",
            "Running ✓".green(),
            holder.pid,
            util::format_relative_time(holder.started_at)
        ),
        None => println!("{}", "Not running".yellow()),
    }
    println!();

    for spec in &specs {
        show_watch(spec)?;
        println!();
    }

    let entries = sentinel.entries()?;
    println!("Failures:      {}", sentinel.path().display().to_string().dimmed());
    if entries.is_empty() {
        println!("  {}", "None".dimmed());
    } else {
        for entry in &entries {
            println!(
                "  {} {} after {} attempts ({})",
                entry.watch.red(),
                entry.batch,
                entry.retries,
                entry.at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        println!(
            "  {}",
            "Tip: clear with 'geowatch clear-failure --watch <name>' once fixed".dimmed()
        );
    }

    Ok(())
}

fn show_watch(spec: &WatchSpec) -> Result<()> {
    println!("{} {}", spec.name.bold(), format!("({})", spec.family).dimmed());
    println!("  Task:        {}", spec.task);
    if let Some(hours) = spec.retention_hours {
        println!("  Retention:   {}h", hours);
    }

    let candidates = scan(&spec.dirs, &spec.suffixes.ready, &spec.suffixes.terminal_overlaps())?;
    let Some(batch) = select_latest(spec.family, candidates, &spec.suffixes.ready) else {
        println!("  Latest:      {}", "no ready markers".dimmed());
        return Ok(());
    };

    let published = is_published(spec, &batch)?;
    println!(
        "  Latest:      {} in {} {}",
        batch.identifier.yellow(),
        batch.dir().display(),
        if published {
            "published".green().to_string()
        } else {
            "pending".yellow().to_string()
        }
    );

    let markers = list_markers(batch.dir(), &spec.suffixes, MarkerKind::Published)?;
    for marker in &markers {
        let coverage = match published_range(spec, marker) {
            Some(PublishedRange::Single(id)) => id,
            Some(PublishedRange::Interval(range)) => {
                format!("{} to {}", range.format.format(range.start), range.format.format(range.end))
            }
            None => "unparseable".to_string(),
        };
        println!("  Published:   {}", coverage);
    }

    let controller = ClaimController::new(spec, SystemTime::now());
    for claim in &controller.locate(&batch)? {
        let age = util::format_age(claim.age);
        let state = if controller.is_fresh(claim.age) {
            "in flight".yellow().to_string()
        } else {
            "stale".red().to_string()
        };
        println!("  Claim:       {} retry {} {} ago {}", claim.stem, claim.retry, age, state);
    }
    Ok(())
}
