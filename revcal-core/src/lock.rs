//! Cooperative collection lock.
//!
//! Concurrent runs on different topics share the ranking engine's collection
//! and model storage, so every training call happens under an exclusive
//! advisory lock on a shared lock file. The lock is released when the
//! returned [`LockGuard`] is dropped, or by the OS if the process dies.
//! Scoring is read-only and never locks.

use crate::config::LockConfig;
use crate::error::Result;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A lock that serializes training across runs.
pub trait CollectionLock: Send + Sync {
    /// Block until the lock is held.
    fn acquire(&self) -> Result<LockGuard>;

    fn describe(&self) -> String;
}

/// Releases the lock on drop.
#[derive(Debug)]
pub struct LockGuard {
    held: Option<(File, PathBuf)>,
}

impl LockGuard {
    fn unlocked() -> Self {
        Self { held: None }
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some((file, path)) = self.held.take() {
            if let Err(e) = FileExt::unlock(&file) {
                warn!(path = %path.display(), error = %e, "Failed to release collection lock");
            } else {
                debug!(path = %path.display(), "Released collection lock");
            }
        }
    }
}

/// Exclusive advisory lock on a shared file. The holder's PID is written into
/// the file once the lock is taken.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CollectionLock for FileLock {
    fn acquire(&self) -> Result<LockGuard> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)?;
        debug!(path = %self.path.display(), "Waiting for collection lock");
        FileExt::lock_exclusive(&file)?;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;
        debug!(path = %self.path.display(), "Acquired collection lock");
        Ok(LockGuard {
            held: Some((file, self.path.clone())),
        })
    }

    fn describe(&self) -> String {
        format!("file lock {}", self.path.display())
    }
}

/// Lock used when locking is disabled; acquiring always succeeds immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLock;

impl CollectionLock for NoopLock {
    fn acquire(&self) -> Result<LockGuard> {
        Ok(LockGuard::unlocked())
    }

    fn describe(&self) -> String {
        "no lock".to_string()
    }
}

/// Construct the lock selected by configuration.
pub fn from_config(config: &LockConfig) -> Arc<dyn CollectionLock> {
    if config.enabled {
        Arc::new(FileLock::new(&config.path))
    } else {
        Arc::new(NoopLock)
    }
}

/// Acquire `lock` on the blocking pool so the async runtime keeps running.
pub async fn acquire(lock: Arc<dyn CollectionLock>) -> Result<LockGuard> {
    tokio::task::spawn_blocking(move || lock.acquire())
        .await
        .map_err(std::io::Error::other)?
}
