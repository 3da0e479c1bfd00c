//! core::ops::lock
//!
//! Exclusive, cross-process lock guarding a changelog read-modify-write.
//!
//! # Storage
//!
//! - `<git_dir>/doctrace/lock` - held by the webhook pipeline for the whole
//!   read-blob / commit / push region
//! - `<dir>/.<file>.lock` - held by the CLI around a changelog file edit
//!
//! # Invariants
//!
//! - The lock is an OS-level `fs2` lock, so it also excludes other processes
//! - It is released on drop, on every exit path
//! - [`FileLock::acquire`] waits; [`FileLock::try_acquire`] returns `None` while the lock is held
//!
//! # Example
//!
//! ```ignore
//! use doctrace::core::ops::FileLock;
//!
//! let lock = FileLock::for_repo(git.git_dir())?;
//! // ... read blob, mutate, commit, push ...
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Directory inside `.git` holding doctrace's lock and ledger.
pub const STATE_DIR: &str = "doctrace";

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Failed to create the lock file or its directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to take the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock held on a lock file.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    file: Option<File>,
}

impl FileLock {
    /// Lock the repository-wide state lock, waiting for other holders.
    pub fn for_repo(git_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(&git_dir.join(STATE_DIR).join("lock"))
    }

    /// Lock the sidecar lock file of `target`, waiting for other holders.
    pub fn for_file(target: &Path) -> Result<Self, LockError> {
        Self::acquire(&sidecar_path(target))
    }

    /// Acquire the lock at `path`, blocking until it is free.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()
            .map_err(|e| LockError::AcquireFailed(format!("{}: {e}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    /// Acquire the lock at `path` without waiting.
    ///
    /// Returns `Ok(None)` when another holder has it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, LockError> {
        let file = open_lock_file(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                path: path.to_path_buf(),
                file: Some(file),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release early. Idempotent.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

/// `<dir>/.<name>.lock` for a target file.
pub fn sidecar_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "changelog".into());
    target.with_file_name(format!(".{name}.lock"))
}

fn open_lock_file(path: &Path) -> Result<File, LockError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| LockError::CreateFailed(format!("cannot open {}: {e}", path.display())))
}
