//! Durable queue snapshots
//!
//! The pending queue is persisted as a single JSON array in one file,
//! replaced wholesale on every write. Replacement is atomic (write to a
//! temp file, fsync, rename, fsync the directory), so a crash leaves either
//! the old snapshot or the new one on disk, never a torn file.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pagerelay_common::EventRecord;
use thiserror::Error;
use tracing::warn;

/// Errors raised by queue persistence and locking.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("queue serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("queue lock error: {0}")]
    Lock(io::Error),
}

/// Reads and writes the on-disk queue snapshot.
#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the pending queue.
    ///
    /// A missing file is an empty queue. Malformed content is discarded
    /// with a warning and will be overwritten by the next save. Any other
    /// read error is returned; the caller must treat the queue as
    /// unavailable for this invocation and must not rewrite the file.
    pub fn load(&self) -> Result<VecDeque<EventRecord>, QueueError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(VecDeque::new()),
            Err(e) => return Err(QueueError::Io(e)),
        };

        match serde_json::from_slice(&bytes) {
            Ok(events) => Ok(events),
            Err(e) => {
                warn!(
                    "invalid queue snapshot {}, discarding: {e}",
                    self.path.display()
                );
                Ok(VecDeque::new())
            }
        }
    }

    /// Replace the queue snapshot with `events`.
    pub fn save(&self, events: &VecDeque<EventRecord>) -> Result<(), QueueError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let bytes = serde_json::to_vec(events)?;
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;

        // The rename itself must survive a crash, so fsync the directory.
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fsync_dir(parent)?;
            }
        }
        Ok(())
    }
}

fn fsync_dir(dir: &Path) -> io::Result<()> {
    let dir = File::open(dir)?;
    dir.sync_all()
}
