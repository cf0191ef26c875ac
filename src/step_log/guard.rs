//! Advisory lock held while the step log is open for writing

use std::path::Path;

use fslock::LockFile;

use crate::error::{self, Result};

/// Lock file name inside the state directory
pub const LOCK_FILE: &str = ".lock";

/// RAII guard for step log locking
///
/// Acquires an advisory file lock on creation and releases it on drop, so two
/// bootstrap processes sharing one state volume cannot interleave records.
#[derive(Debug)]
pub struct StepLogGuard {
    lock: LockFile,
}

impl StepLogGuard {
    /// Try to acquire the lock without blocking
    ///
    /// Returns `Ok(None)` when another process holds it.
    pub fn try_acquire(state_dir: &Path) -> Result<Option<Self>> {
        let lock_path = state_dir.join(LOCK_FILE);

        let mut lock = LockFile::open(&lock_path).map_err(|e| {
            error::step_log::unavailable(&lock_path, format!("Failed to open lock file: {e}"))
        })?;

        let acquired = lock.try_lock().map_err(|e| {
            error::step_log::unavailable(&lock_path, format!("Failed to try lock: {e}"))
        })?;

        if acquired {
            Ok(Some(Self { lock }))
        } else {
            Ok(None)
        }
    }

    /// Acquire the lock or fail with `StepLogUnavailable`
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        Self::try_acquire(state_dir)?.ok_or_else(|| {
            error::step_log::unavailable(
                &state_dir.join(LOCK_FILE),
                "locked by another bootstrap process",
            )
        })
    }
}

// The lock file is never removed: every process must lock the same inode
impl Drop for StepLogGuard {
    fn drop(&mut self) {
        let _ = self.lock.unlock();
    }
}
