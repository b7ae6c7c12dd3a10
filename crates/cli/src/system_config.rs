//! System configuration
//!
//! Loaded from a TOML file (`--config`, `$GEOWATCH_CONFIG`, or
//! `$XDG_CONFIG_HOME/geowatch/config.toml`), then overlaid with environment
//! variables prefixed `GEOWATCH__` (e.g. `GEOWATCH__SENTINEL_PATH`).

use anyhow::{Context, Result};
use dispatch::DispatcherConfig;
use geowatch_core::{Family, MarkerSuffixes, WatchSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::DEFAULT_SENTINEL_PATH;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "GEOWATCH_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Permanent-failure sentinel watched by the health check
    pub sentinel_path: PathBuf,
    /// Lock file location for the watch loop
    pub state_dir: PathBuf,
    /// Daily-rolling log files go here when set
    pub log_dir: Option<PathBuf>,
    /// Seconds between checks in the watch loop
    pub interval_secs: u64,
    pub dispatcher: DispatcherConfig,
    pub watch: Vec<WatchConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            sentinel_path: PathBuf::from(DEFAULT_SENTINEL_PATH),
            state_dir: default_state_dir(),
            log_dir: None,
            interval_secs: 60,
            dispatcher: DispatcherConfig::default(),
            watch: Vec::new(),
        }
    }
}

/// One `[[watch]]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    pub name: String,
    pub family: Family,
    pub dirs: Vec<PathBuf>,
    /// Task name; defaults per family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_hours: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granule_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prune_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// Catalog removal task; an empty string disables catalog removal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_task: Option<String>,
    #[serde(default)]
    pub suffixes: MarkerSuffixes,
}

impl WatchConfig {
    /// Resolve family defaults into a watch spec
    pub fn to_spec(&self) -> WatchSpec {
        let mut spec = WatchSpec::new(self.name.clone(), self.family, self.dirs.clone());
        spec.suffixes = self.suffixes.clone();

        if let Some(task) = &self.task {
            spec.task = task.clone();
        }
        if let Some(secs) = self.debounce_secs {
            spec = spec.with_debounce(Duration::from_secs(secs));
        }
        if self.retention_hours.is_some() {
            spec = spec.with_retention_hours(self.retention_hours);
        }
        if let Some(dir) = &self.granule_dir {
            spec = spec.with_granule_dir(dir);
        }
        if let Some(dir) = &self.prune_dir {
            spec = spec.with_prune_dir(dir);
        }
        spec.variable = self.variable.clone();
        if let Some(task) = &self.catalog_task {
            spec = spec.with_catalog_task((!task.is_empty()).then(|| task.clone()));
        }
        spec
    }
}

impl SystemConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            anyhow::bail!("interval_secs must be at least 1");
        }
        if self.sentinel_path.as_os_str().is_empty() {
            anyhow::bail!("sentinel_path must not be empty");
        }

        let mut seen = HashSet::new();
        for watch in &self.watch {
            if watch.name.chars().any(char::is_whitespace) {
                anyhow::bail!("watch name '{}' must not contain whitespace", watch.name);
            }
            if !seen.insert(watch.name.as_str()) {
                anyhow::bail!("duplicate watch name '{}'", watch.name);
            }
            watch
                .to_spec()
                .validate()
                .with_context(|| format!("invalid watch '{}'", watch.name))?;
        }

        self.dispatcher.validate().context("invalid dispatcher")?;
        Ok(())
    }

    /// Resolved specs for every configured watch
    pub fn specs(&self) -> Vec<WatchSpec> {
        self.watch.iter().map(WatchConfig::to_spec).collect()
    }

    /// Resolved spec of one watch
    pub fn spec(&self, name: &str) -> Result<WatchSpec> {
        self.watch
            .iter()
            .find(|w| w.name == name)
            .map(WatchConfig::to_spec)
            .ok_or_else(|| {
                let known: Vec<_> = self.watch.iter().map(|w| w.name.as_str()).collect();
                anyhow::anyhow!("Unknown watch '{}'. Configured watches: {}", name, known.join(", "))
            })
    }
}

/// Get the default config file path
pub fn default_config_file_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("geowatch").join("config.toml"))
}

/// Config file path: explicit flag, then `$GEOWATCH_CONFIG`, then the default
pub fn config_file_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    default_config_file_path()
}

/// Load configuration from file and environment
///
/// A missing default file yields the defaults; a missing explicit file is an
/// error.
pub fn load(explicit: Option<&Path>) -> Result<(SystemConfig, PathBuf)> {
    let path = config_file_path(explicit)?;
    let mut builder = config::Config::builder();

    if path.exists() {
        builder = builder.add_source(config::File::from(path.as_path()).format(config::FileFormat::Toml));
    } else if explicit.is_some() || std::env::var_os(CONFIG_ENV).is_some() {
        anyhow::bail!("Config file not found: {}", path.display());
    }

    builder = builder.add_source(
        config::Environment::with_prefix("GEOWATCH")
            .prefix_separator("__")
            .separator("__"),
    );

    let config: SystemConfig = builder
        .build()
        .with_context(|| format!("Failed to read config from {}", path.display()))?
        .try_deserialize()
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    config.validate().context("Invalid configuration")?;
    Ok((config, path))
}

fn default_state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("geowatch"))
        .unwrap_or_else(|| PathBuf::from(".geowatch"))
}

/// Generate example configuration
pub fn example_config() -> String {
    r#"# geowatch configuration
#
# Location: ~/.config/geowatch/config.toml (or $GEOWATCH_CONFIG)
# Any top-level key can be overridden with GEOWATCH__<KEY>, e.g.
# GEOWATCH__SENTINEL_PATH=/tmp/health_check_failure

# Written when a batch exhausts its retries; the health check watches it
sentinel_path = "/status/health_check_failure"

# Lock file for `geowatch watch`
state_dir = "/var/lib/geowatch"

# Uncomment to also write daily-rolling log files
# log_dir = "/var/log/geowatch"

# Seconds between checks in `geowatch watch`
interval_secs = 60

# Where triggered tasks go: "spool", "command" or "log"
[dispatcher]
kind = "spool"
dir = "/var/spool/geowatch"

# [dispatcher]
# kind = "command"
# program = "/usr/local/bin/enqueue-task"
# args = ["--queue", "geoserver"]

[[watch]]
name = "icon"
family = "mosaic"
dirs = ["/data/meteo/00", "/data/meteo/12"]

[[watch]]
name = "seasonal"
family = "seasonal"
dirs = ["/data/seasonal"]

[[watch]]
name = "sub-seasonal"
family = "sub-seasonal"
dirs = ["/data/sub_seasonal"]
debounce_secs = 300

[[watch]]
name = "radar-sri"
family = "radar"
dirs = ["/data/radar/sri"]
granule_dir = "files"
prune_dir = "/geoserver_data/copies/radar-sri"
retention_hours = 72

[[watch]]
name = "ww3"
family = "wave"
dirs = ["/data/ww3"]
retention_hours = 72
# Empty string disables catalog removal after pruning
catalog_task = ""
"#
    .to_string()
}
