//! Geowatch CLI - geowatch command

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli_lib::cmd::{self, Context};
use cli_lib::logging::{self, Verbosity};
use std::path::PathBuf;

/// Geowatch - trigger geospatial publishing when new data lands
#[derive(Parser)]
#[command(name = "geowatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: $GEOWATCH_CONFIG or ~/.config/geowatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write daily-rolling log files here
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check each watch once and trigger its latest unpublished batch
    Check {
        /// Watch name (repeatable; default: all)
        #[arg(short, long)]
        watch: Vec<String>,
        /// Report what would happen without claiming or dispatching
        #[arg(long)]
        dry_run: bool,
    },
    /// Check every interval until interrupted
    Watch {
        /// Watch name (repeatable; default: all)
        #[arg(short, long)]
        watch: Vec<String>,
        /// Seconds between checks (default: interval_secs from config)
        #[arg(long)]
        interval: Option<u64>,
        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
    },
    /// Record that a batch has been published
    Complete {
        #[arg(short, long)]
        watch: String,
        /// Batch identifier that was published
        #[arg(short, long)]
        batch: String,
        /// Covered range as <start>-<end> (default: derived from granules)
        #[arg(long)]
        range: Option<String>,
        /// Directory holding the batch markers (default: where its ready marker is)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Remove granules outside each watch's retention window
    Prune {
        #[arg(short, long)]
        watch: Vec<String>,
        /// Only this watched directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show watch state, claims and recorded failures
    Status {
        #[arg(short, long)]
        watch: Vec<String>,
    },
    /// Clear recorded permanent failures (one watch, or all)
    ClearFailure {
        #[arg(short, long)]
        watch: Option<String>,
    },
    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    List,
    /// Print the config file path
    Path,
    /// Print an example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);

    // These work without a valid config file
    match &cli.command {
        Commands::Config(ConfigCommands::Path) => return cmd::config::run_path(cli.config.as_deref()).await,
        Commands::Config(ConfigCommands::Example) => return cmd::config::run_example().await,
        _ => {}
    }

    let ctx = Context::load(cli.config.as_deref())?;
    let log_dir = cli.log_dir.clone().or_else(|| ctx.config.log_dir.clone());
    let _guard = logging::init(verbosity, log_dir.as_deref());

    match cli.command {
        Commands::Check { watch, dry_run } => cmd::check::run(&ctx, &watch, dry_run).await,
        Commands::Watch { watch, interval, once } => cmd::watch_loop::run(&ctx, &watch, interval, once).await,
        Commands::Complete { watch, batch, range, dir } => {
            cmd::complete::run(&ctx, &watch, &batch, range.as_deref(), dir).await
        }
        Commands::Prune { watch, dir } => cmd::prune::run(&ctx, &watch, dir).await,
        Commands::Status { watch } => cmd::status::run(&ctx, &watch).await,
        Commands::ClearFailure { watch } => cmd::clear_failure::run(&ctx, watch.as_deref()).await,
        Commands::Config(ConfigCommands::List) => cmd::config::run_list(&ctx).await,
        Commands::Config(ConfigCommands::Path | ConfigCommands::Example) => Ok(()),
    }
}
