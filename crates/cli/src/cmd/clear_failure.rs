//! Acknowledge permanently failed batches

use super::Context;
use anyhow::Result;
use owo_colors::OwoColorize;

/// Remove sentinel entries (one watch's, or all) so their batches can be retried
pub async fn run(ctx: &Context, watch: Option<&str>) -> Result<()> {
    if let Some(name) = watch {
        ctx.config.spec(name)?;
    }

    let sentinel = ctx.sentinel();
    let removed = sentinel.clear(watch)?;

    if removed == 0 {
        println!("{}", "No failures recorded".dimmed());
    } else {
        println!("{} {} failure(s)", "Cleared".green(), removed);
    }
    if !sentinel.exists() {
        println!("{} {}", "Sentinel removed:".dimmed(), sentinel.path().display());
    }
    Ok(())
}
