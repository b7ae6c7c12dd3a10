//! Spool directory backend

use geowatch_core::store::atomic_write;
use geowatch_core::{Result, TaskDispatcher, TaskRequest};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes each request to `<dir>/<id>.json`
///
/// Files appear atomically, so a worker polling for `*.json` never reads a
/// partial request. ULID names sort in submission order.
#[derive(Debug, Clone)]
pub struct SpoolDispatcher {
    dir: PathBuf,
}

impl SpoolDispatcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, task: &TaskRequest) -> PathBuf {
        self.dir.join(format!("{}.json", task.id))
    }
}

impl TaskDispatcher for SpoolDispatcher {
    fn submit(&self, task: &TaskRequest) -> Result<()> {
        let path = self.path_for(task);
        atomic_write(&path, &crate::encode(task)?)?;
        info!("Spooled task {} as {}", task.name, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_spool_writes_request() {
        let temp = TempDir::new().unwrap();
        let spool = SpoolDispatcher::new(temp.path().join("spool"));
        let task = TaskRequest::new("update_geoserver_image_mosaic", json!({"run": "00"}));

        spool.submit(&task).unwrap();

        let written: TaskRequest = serde_json::from_slice(&fs::read(spool.path_for(&task)).unwrap()).unwrap();
        assert_eq!(written, task);
        assert_eq!(fs::read_dir(spool.dir()).unwrap().count(), 1);
    }
}
