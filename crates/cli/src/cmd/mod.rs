//! CLI command implementations

pub mod check;
pub mod clear_failure;
pub mod complete;
pub mod config;
pub mod prune;
pub mod status;
pub mod watch_loop;

use crate::system_config::{self, SystemConfig};
use anyhow::{Context as _, Result};
use geowatch_core::{TaskDispatcher, WatchSpec};
use std::path::{Path, PathBuf};
use watcher::FailureSentinel;

/// Boxed dispatcher shared by every command
pub type Dispatcher = Box<dyn TaskDispatcher + Send + Sync>;

/// Loaded configuration plus where it came from
#[derive(Debug, Clone)]
pub struct Context {
    pub config: SystemConfig,
    pub config_path: PathBuf,
}

impl Context {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config, config_path) = system_config::load(explicit)?;
        Ok(Self { config, config_path })
    }

    /// Specs of the named watches, or of every watch when `names` is empty
    pub fn watches(&self, names: &[String]) -> Result<Vec<WatchSpec>> {
        if self.config.watch.is_empty() {
            anyhow::bail!(
                "No watches configured in {} (see 'geowatch config example')",
                self.config_path.display()
            );
        }
        if names.is_empty() {
            return Ok(self.config.specs());
        }
        names.iter().map(|name| self.config.spec(name)).collect()
    }

    pub fn sentinel(&self) -> FailureSentinel {
        FailureSentinel::new(&self.config.sentinel_path)
    }

    pub fn dispatcher(&self) -> Result<Dispatcher> {
        self.config
            .dispatcher
            .build()
            .context("Failed to set up task dispatcher")
    }
}
