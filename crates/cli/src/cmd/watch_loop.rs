//! Periodic check loop
//!
//! Replaces an external scheduler: every interval, each watch is checked on
//! a blocking worker. A tick that overruns the interval delays the next one
//! instead of stacking ticks up.

use super::check::check_watch;
use super::Context;
use crate::locks::LoopLock;
use anyhow::{Context as _, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use watcher::CheckOutcome;

pub async fn run(ctx: &Context, names: &[String], interval_secs: Option<u64>, once: bool) -> Result<()> {
    let specs = Arc::new(ctx.watches(names)?);
    let sentinel = Arc::new(ctx.sentinel());
    let dispatcher = Arc::new(ctx.dispatcher()?);
    let period = Duration::from_secs(interval_secs.unwrap_or(ctx.config.interval_secs).max(1));

    let lock = LoopLock::acquire(&ctx.config.state_dir).context("Failed to acquire watch loop lock")?;
    info!(
        "Watching {} watches every {}s (dispatcher: {})",
        specs.len(),
        period.as_secs(),
        ctx.config.dispatcher.describe()
    );

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch loop");
                break;
            }
        }

        let (specs, sentinel, dispatcher) = (specs.clone(), sentinel.clone(), dispatcher.clone());
        let tick = tokio::task::spawn_blocking(move || {
            for spec in specs.iter() {
                match check_watch(spec, &**dispatcher, &sentinel, false) {
                    Ok((outcome, pruned)) => {
                        log_outcome(&spec.name, &outcome);
                        for report in pruned {
                            info!(
                                "{}: pruned {} granules older than {} from {}",
                                spec.name,
                                report.removed.len(),
                                report.cutoff,
                                report.root.display()
                            );
                        }
                    }
                    Err(e) => error!("{}: check failed: {:#}", spec.name, e),
                }
            }
        });

        if let Err(e) = tick.await {
            error!("Check tick panicked: {}", e);
        }
        if once {
            break;
        }
    }

    lock.release()?;
    Ok(())
}

fn log_outcome(name: &str, outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::Dispatched { .. } | CheckOutcome::ClaimInFlight { .. } => info!("{}: {}", name, outcome),
        CheckOutcome::Escalated { .. } => error!("{}: {}", name, outcome),
        CheckOutcome::Failed { .. } => warn!("{}: {}", name, outcome),
        _ => debug!("{}: {}", name, outcome),
    }
}
