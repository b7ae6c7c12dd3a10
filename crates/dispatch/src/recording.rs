//! In-memory backend

use geowatch_core::{Result, TaskDispatcher, TaskRequest, WatchError};
use parking_lot::Mutex;

/// Keeps every submitted request; optionally refuses all of them
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    requests: Mutex<Vec<TaskRequest>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose every submission fails
    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Requests accepted so far, in submission order
    pub fn requests(&self) -> Vec<TaskRequest> {
        self.requests.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }

    pub fn clear(&self) {
        self.requests.lock().clear();
    }
}

impl TaskDispatcher for RecordingDispatcher {
    fn submit(&self, task: &TaskRequest) -> Result<()> {
        if self.fail {
            return Err(WatchError::Dispatch {
                task: task.name.clone(),
                reason: "dispatcher unavailable".to_string(),
            });
        }
        self.requests.lock().push(task.clone());
        Ok(())
    }
}
