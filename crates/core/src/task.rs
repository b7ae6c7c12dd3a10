//! Boundary to the external task dispatcher

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A unit of work handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Unique ID (ULID, sortable by submission time)
    pub id: Ulid,
    /// Name of the task the worker should run
    pub name: String,
    /// JSON arguments
    pub args: serde_json::Value,
    pub submitted_at: DateTime<Utc>,
}

impl TaskRequest {
    pub fn new(name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            id: Ulid::new(),
            name: name.into(),
            args,
            submitted_at: Utc::now(),
        }
    }
}

/// Fire-and-forget submission of tasks
///
/// Implementations must return once the task is handed off; they never wait
/// for the task to run. Delivery is at-least-once at best; duplicates are
/// prevented upstream by claim markers.
pub trait TaskDispatcher {
    fn submit(&self, task: &TaskRequest) -> Result<()>;
}

impl<T: TaskDispatcher + ?Sized> TaskDispatcher for &T {
    fn submit(&self, task: &TaskRequest) -> Result<()> {
        (**self).submit(task)
    }
}

impl<T: TaskDispatcher + ?Sized> TaskDispatcher for Box<T> {
    fn submit(&self, task: &TaskRequest) -> Result<()> {
        (**self).submit(task)
    }
}
