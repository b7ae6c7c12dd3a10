//! Log-only backend

use geowatch_core::{Result, TaskDispatcher, TaskRequest};
use tracing::info;

/// Logs requests instead of dispatching them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

impl TaskDispatcher for LogDispatcher {
    fn submit(&self, task: &TaskRequest) -> Result<()> {
        info!(task = %task.name, id = %task.id, args = %task.args, "Task not dispatched (log dispatcher)");
        Ok(())
    }
}
