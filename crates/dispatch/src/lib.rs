//! Task dispatcher backends
//!
//! Every backend hands a [`TaskRequest`] off and returns without waiting for
//! the task to run:
//! - `spool`: one JSON file per task in a directory consumed by a worker
//! - `command`: an external program receiving the request on stdin
//! - `log`: log the request only
//!
//! [`RecordingDispatcher`] keeps requests in memory for tests.

pub mod command;
pub mod log;
pub mod recording;
pub mod spool;

pub use command::CommandDispatcher;
pub use log::LogDispatcher;
pub use recording::RecordingDispatcher;
pub use spool::SpoolDispatcher;

use geowatch_core::{Result, TaskDispatcher, TaskRequest, WatchError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dispatcher selection as written in the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatcherConfig {
    /// Write `<id>.json` into `dir`
    Spool { dir: PathBuf },
    /// Run `program [args..] <task name>` with the request as JSON on stdin
    Command {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Only log what would be dispatched
    #[default]
    Log,
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Spool { dir } if dir.as_os_str().is_empty() => {
                Err(WatchError::Config("spool dispatcher needs a directory".to_string()))
            }
            Self::Command { program, .. } if program.as_os_str().is_empty() => {
                Err(WatchError::Config("command dispatcher needs a program".to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Instantiate the configured backend
    pub fn build(&self) -> Result<Box<dyn TaskDispatcher + Send + Sync>> {
        self.validate()?;
        Ok(match self {
            Self::Spool { dir } => Box::new(SpoolDispatcher::new(dir.clone())),
            Self::Command { program, args } => Box::new(CommandDispatcher::new(program.clone(), args.clone())),
            Self::Log => Box::new(LogDispatcher),
        })
    }

    /// Short description for status output
    pub fn describe(&self) -> String {
        match self {
            Self::Spool { dir } => format!("spool ({})", dir.display()),
            Self::Command { program, .. } => format!("command ({})", program.display()),
            Self::Log => "log".to_string(),
        }
    }
}

/// Serialise a request the way every backend hands it off
pub(crate) fn encode(task: &TaskRequest) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(task).map_err(|e| WatchError::Dispatch {
        task: task.name.clone(),
        reason: format!("cannot encode request: {}", e),
    })
}
