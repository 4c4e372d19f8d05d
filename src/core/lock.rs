//! core::lock
//!
//! Exclusive repository lock.
//!
//! Only one braid process may mutate a repository at a time. The lock is an
//! OS-level exclusive lock on `<common_dir>/braid/lock`, so it is shared
//! across all worktrees of a repository. Acquisition is non-blocking: a
//! second invocation fails fast instead of queueing. The lock is released
//! on drop (RAII), including on panic.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::BraidPaths;

#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("repository is locked by another braid process")]
    AlreadyLocked,

    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on the repository, released on drop.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl RepoLock {
    /// Acquire the repository lock, failing fast if it is already held.
    pub fn acquire(paths: &BraidPaths) -> Result<Self, LockError> {
        let braid_dir = paths.braid_dir();
        fs::create_dir_all(&braid_dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", braid_dir.display(), e))
        })?;

        let path = paths.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
