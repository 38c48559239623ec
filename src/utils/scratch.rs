use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use uuid::Uuid;

/// A uniquely named file under a scratch directory that is removed when the
/// guard goes out of scope, whichever way the owning call exits.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserves a name like `report-1718000000000-<uuid>.pdf`. Nothing is
    /// created on disk until the caller writes to [`ScratchFile::path`].
    pub fn new_in(dir: &Path, extension: &str) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let name = format!("report-{}-{}.{}", millis, Uuid::new_v4().simple(), extension);

        Self {
            path: dir.join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(target: "scratch", path = %self.path.display(), "Removed scratch file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(target: "scratch", path = %self.path.display(), "Failed to remove scratch file: {}", e)
            }
        }
    }
}
