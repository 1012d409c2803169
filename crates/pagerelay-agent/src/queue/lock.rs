//! Cross-process exclusion for queue mutations
//!
//! Enqueue and drain run as separate scheduler-spawned processes against
//! the same queue file. Every mutating action runs while holding an
//! exclusive advisory lock on the `<queue>.lock` sidecar; acquisition
//! blocks until the current holder finishes, with no timeout. The protocol
//! is advisory: it only serializes participants that take the same lock.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::store::QueueError;

/// Suffix appended to the queue path to form the lock sidecar path.
const LOCK_SUFFIX: &str = ".lock";

fn lock_path(queue_path: &Path) -> PathBuf {
    let mut path = queue_path.as_os_str().to_owned();
    path.push(LOCK_SUFFIX);
    PathBuf::from(path)
}

/// Holder of the exclusive region for one queue path.
///
/// Releasing (or dropping) the guard unlocks the handle and then removes
/// the lock file. Removal happens after the release, so another waiter may
/// briefly observe the file between the two steps; among cooperating
/// processes that window is harmless.
pub struct QueueLockGuard {
    file: Option<File>,
    path: PathBuf,
}

impl QueueLockGuard {
    /// Block until the exclusive advisory lock for `queue_path` is held.
    ///
    /// The lock file is created if absent. An I/O failure here means the
    /// guarded action never runs.
    pub fn acquire(queue_path: &Path) -> Result<Self, QueueError> {
        let path = lock_path(queue_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(QueueError::Lock)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(QueueError::Lock)?;
        file.lock_exclusive().map_err(QueueError::Lock)?;

        Ok(Self {
            file: Some(file),
            path,
        })
    }

    /// Leave the exclusive region.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = fs2::FileExt::unlock(&file);
            drop(file);
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl Drop for QueueLockGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Run `action` inside the exclusive region for `queue_path`.
pub fn with_exclusive<F, T>(queue_path: &Path, action: F) -> Result<T, QueueError>
where
    F: FnOnce() -> T,
{
    let guard = QueueLockGuard::acquire(queue_path)?;
    let result = action();
    guard.release();
    Ok(result)
}
