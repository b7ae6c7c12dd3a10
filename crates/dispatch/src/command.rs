//! External command backend

use geowatch_core::{Result, TaskDispatcher, TaskRequest, WatchError};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Runs `program [args..] <task name>` and writes the request JSON to its stdin
///
/// The program is expected to enqueue the task and exit. Submission returns
/// once the request is written; the exit status is only logged.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandDispatcher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl TaskDispatcher for CommandDispatcher {
    fn submit(&self, task: &TaskRequest) -> Result<()> {
        let failed = |reason: String| WatchError::Dispatch {
            task: task.name.clone(),
            reason,
        };

        let payload = crate::encode(task)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&task.name)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| failed(format!("cannot spawn {}: {}", self.program.display(), e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .map_err(|e| failed(format!("cannot write request: {}", e)))?;
        }

        info!("Handed task {} ({}) to {} (pid {})", task.name, task.id, self.program.display(), child.id());

        // Reap in the background so long-running loops do not collect zombies
        let program = self.program.display().to_string();
        std::thread::spawn(move || match child.wait() {
            Ok(status) if status.success() => debug!("{} exited successfully", program),
            Ok(status) => warn!("{} exited with {}", program, status),
            Err(e) => warn!("Failed to wait for {}: {}", program, e),
        });

        Ok(())
    }
}
