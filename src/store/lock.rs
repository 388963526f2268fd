//! Per-mission advisory lock.
//!
//! One orchestration run owns a mission at a time. The lock is an OS advisory
//! lock on `<mission dir>/.lock`, released when the guard is dropped or the
//! process exits, so a crashed run never leaves a mission stuck.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::errors::StoreError;

pub const LOCK_FILE: &str = ".lock";

/// Held exclusive lock on one mission.
#[derive(Debug)]
pub struct MissionLock {
    file: File,
    path: PathBuf,
    mission_id: String,
}

impl MissionLock {
    /// Try to take the lock without blocking.
    pub(crate) fn acquire(mission_dir: &Path, mission_id: &str) -> Result<Self, StoreError> {
        let path = mission_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(StoreError::Locked {
                    id: mission_id.to_string(),
                    path,
                });
            }
            return Err(StoreError::io(&path, e));
        }

        tracing::debug!(mission = mission_id, path = %path.display(), "Acquired mission lock");
        Ok(Self {
            file,
            path,
            mission_id: mission_id.to_string(),
        })
    }

    pub fn mission_id(&self) -> &str {
        &self.mission_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MissionLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to release mission lock");
        }
    }
}
