//! Error type shared by the geowatch library crates

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a single check, prune or publication step.
///
/// Conditions that are part of normal operation (nothing ready, claim still
/// in flight, batch already published) are reported as outcomes instead.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Filesystem operation failed on a specific path
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A name or marker line did not match its expected grammar
    #[error("cannot parse {what} from '{input}'")]
    Parse { what: &'static str, input: String },

    /// The task dispatcher refused or failed to accept a task
    #[error("dispatch of task '{task}' failed: {reason}")]
    Dispatch { task: String, reason: String },

    /// Invalid watch or dispatcher configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl WatchError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn parse(what: &'static str, input: impl Into<String>) -> Self {
        Self::Parse {
            what,
            input: input.into(),
        }
    }
}

/// Result type for geowatch library operations
pub type Result<T> = std::result::Result<T, WatchError>;
