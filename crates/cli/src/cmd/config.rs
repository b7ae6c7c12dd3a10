//! Configuration inspection commands

use super::Context;
use crate::system_config;
use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;
use std::path::Path;

/// List the effective configuration, family defaults resolved
pub async fn run_list(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    println!("{}", "System Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), ctx.config_path.display().dimmed());

    println!("  {} = {}", "sentinel_path".cyan(), config.sentinel_path.display());
    println!("  {} = {}", "state_dir".cyan(), config.state_dir.display());
    match &config.log_dir {
        Some(dir) => println!("  {} = {}", "log_dir".cyan(), dir.display()),
        None => println!("  {} = {}", "log_dir".cyan(), "(stderr only)".dimmed()),
    }
    println!(
        "  {} = {} {}",
        "interval_secs".cyan(),
        config.interval_secs,
        format!("({}s)", config.interval_secs).dimmed()
    );
    println!("  {} = {}", "dispatcher".cyan(), config.dispatcher.describe());

    for spec in config.specs() {
        println!("\n{}", format!("[[watch]] {}", spec.name).yellow());
        println!("  {} = {}", "family".cyan(), spec.family);
        for dir in &spec.dirs {
            println!("  {} = {}", "dir".cyan(), dir.display());
        }
        println!("  {} = {}", "task".cyan(), spec.task);
        println!(
            "  {} = {} {}",
            "debounce_secs".cyan(),
            spec.debounce.as_secs(),
            format!("({} min)", spec.debounce.as_secs() / 60).dimmed()
        );
        if let Some(hours) = spec.retention_hours {
            println!("  {} = {}", "retention_hours".cyan(), hours);
        }
        if let Some(dir) = &spec.granule_dir {
            println!("  {} = {}", "granule_dir".cyan(), dir.display());
        }
        if let Some(dir) = &spec.prune_dir {
            println!("  {} = {}", "prune_dir".cyan(), dir.display());
        }
        if let Some(task) = &spec.catalog_task {
            println!("  {} = {}", "catalog_task".cyan(), task);
        }
    }

    Ok(())
}

/// Print the config file path that would be used
pub async fn run_path(explicit: Option<&Path>) -> Result<()> {
    let path = system_config::config_file_path(explicit).context("Could not determine config file path")?;
    println!("{}", path.display());
    Ok(())
}

/// Print an annotated example configuration
pub async fn run_example() -> Result<()> {
    print!("{}", system_config::example_config());
    Ok(())
}
