//! Advisory lock on the store directory
//!
//! Only one run may write a data directory at a time. The lock file lives inside
//! the directory and is held through an `fd-lock` write guard for the whole run.

use super::{StoreError, StoreResult};
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Name of the lock file inside the data directory
pub const LOCK_FILE_NAME: &str = ".kline-harvester.lock";

/// Lock file handle for a store directory
pub struct StoreLock {
    lock: RwLock<File>,
    path: PathBuf,
}

impl StoreLock {
    /// Open (creating if needed) the lock file of a store directory
    pub fn open(dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| StoreError::IoError(e.to_string()))?;

        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StoreError::LockError(format!("Failed to open lock file: {e}")))?;

        Ok(Self {
            lock: RwLock::new(file),
            path,
        })
    }

    /// Take the exclusive lock without blocking
    ///
    /// The directory stays locked while the returned guard is alive. Fails at once
    /// when another run holds it.
    pub fn try_exclusive(&mut self) -> StoreResult<RwLockWriteGuard<'_, File>> {
        let path = self.path.display().to_string();
        self.lock.try_write().map_err(|e| {
            StoreError::LockError(format!("{path} is held by another run: {e}"))
        })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
