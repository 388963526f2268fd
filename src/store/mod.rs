//! Durable storage of mission artifacts.
//!
//! Layout under the missions directory:
//!
//! ```text
//! missions/
//!   <id>/
//!     progress.yaml       # the mission artifact
//!     progress.yaml.tmp   # only while a save is in flight
//!     .progress.yaml.<uuid>  # only while `create` stages the first document
//!     .lock               # advisory lock held by the running orchestrator
//! ```
//!
//! Saves are atomic: the document is written to a temp file, synced, then
//! renamed over the artifact. A crash mid-save leaves either the previous or
//! the new document, never a torn one.

mod lock;

pub use lock::{LOCK_FILE, MissionLock};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::errors::StoreError;
use crate::mission::{Mission, UsageTotals};

pub const ARTIFACT_FILE: &str = "progress.yaml";
const TEMP_SUFFIX: &str = "tmp";
const MAX_ID_LEN: usize = 128;

/// Reject ids that could escape the missions directory or collide with
/// store-internal files.
pub fn validate_mission_id(id: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidMissionId {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    if id.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if id.len() > MAX_ID_LEN {
        return Err(invalid("must be at most 128 characters"));
    }
    if id.starts_with('.') {
        return Err(invalid("must not start with '.'"));
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid(&format!("character '{}' is not allowed", c)));
    }
    Ok(())
}

/// File-backed mission store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    missions_dir: PathBuf,
}

impl ArtifactStore {
    /// Open a store rooted at `missions_dir`, creating it if needed.
    pub fn open(missions_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let missions_dir = missions_dir.into();
        fs::create_dir_all(&missions_dir).map_err(|e| StoreError::io(&missions_dir, e))?;
        Ok(Self { missions_dir })
    }

    pub fn missions_dir(&self) -> &Path {
        &self.missions_dir
    }

    pub fn mission_dir(&self, id: &str) -> PathBuf {
        self.missions_dir.join(id)
    }

    pub fn artifact_path(&self, id: &str) -> PathBuf {
        self.mission_dir(id).join(ARTIFACT_FILE)
    }

    pub fn exists(&self, id: &str) -> bool {
        validate_mission_id(id).is_ok() && self.artifact_path(id).is_file()
    }

    /// Persist a brand new mission. Fails if the id is already taken.
    ///
    /// The first document is staged under a unique name and hard-linked into
    /// place, so of two racing creates exactly one wins.
    pub fn create(&self, mission: &Mission) -> Result<(), StoreError> {
        validate_mission_id(&mission.id)?;
        let path = self.artifact_path(&mission.id);
        let already_exists = || StoreError::AlreadyExists {
            id: mission.id.clone(),
            path: path.clone(),
        };
        if path.exists() {
            return Err(already_exists());
        }

        let dir = self.mission_dir(&mission.id);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let content = serde_yaml::to_string(mission).map_err(|source| StoreError::Serialize {
            id: mission.id.clone(),
            source,
        })?;

        let staged = dir.join(format!(".{}.{}", ARTIFACT_FILE, Uuid::new_v4()));
        write_synced(&staged, content.as_bytes())?;
        let linked = fs::hard_link(&staged, &path);
        let _ = fs::remove_file(&staged);
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Err(already_exists()),
            Err(e) => return Err(StoreError::io(&path, e)),
        }

        tracing::info!(mission = %mission.id, path = %path.display(), "Created mission");
        Ok(())
    }

    /// Load a mission.
    ///
    /// A missing artifact is `NotFound`; unreadable YAML, a missing
    /// `current_phase`, or an id that disagrees with the path is `Corrupt`.
    pub fn load(&self, id: &str) -> Result<Mission, StoreError> {
        validate_mission_id(id)?;
        let path = self.artifact_path(id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    id: id.to_string(),
                    path,
                });
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let mut mission: Mission =
            serde_yaml::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if mission.id.is_empty() {
            mission.id = id.to_string();
        } else if mission.id != id {
            return Err(StoreError::Corrupt {
                path,
                reason: format!("artifact id '{}' does not match directory '{}'", mission.id, id),
            });
        }
        Ok(mission)
    }

    /// Atomically replace the stored artifact with `mission`.
    pub fn save(&self, mission: &Mission) -> Result<(), StoreError> {
        validate_mission_id(&mission.id)?;
        let content = serde_yaml::to_string(mission).map_err(|source| StoreError::Serialize {
            id: mission.id.clone(),
            source,
        })?;
        let path = self.artifact_path(&mission.id);
        write_atomic(&path, content.as_bytes())?;
        tracing::debug!(mission = %mission.id, phase = %mission.current_phase, "Saved mission");
        Ok(())
    }

    /// Ids of every stored mission, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries =
            fs::read_dir(&self.missions_dir).map_err(|e| StoreError::io(&self.missions_dir, e))?;

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join(ARTIFACT_FILE).is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| validate_mission_id(name).is_ok())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Usage totals summed across every readable mission.
    ///
    /// Corrupt artifacts are skipped with a warning.
    pub fn usage_totals(&self) -> Result<UsageTotals, StoreError> {
        let mut totals = UsageTotals::default();
        for id in self.list()? {
            match self.load(&id) {
                Ok(mission) => totals = totals + mission.usage_totals(),
                Err(e) => tracing::warn!(mission = %id, error = %e, "Skipping unreadable mission"),
            }
        }
        Ok(totals)
    }

    /// Take the exclusive run lock for a mission.
    ///
    /// A temp file left by an interrupted save is removed once the lock is
    /// held; no other writer can be mid-save at that point.
    pub fn lock(&self, id: &str) -> Result<MissionLock, StoreError> {
        validate_mission_id(id)?;
        let dir = self.mission_dir(id);
        if !dir.join(ARTIFACT_FILE).is_file() {
            return Err(StoreError::NotFound {
                id: id.to_string(),
                path: dir.join(ARTIFACT_FILE),
            });
        }
        let lock = MissionLock::acquire(&dir, id)?;
        remove_interrupted_write(&self.artifact_path(id));
        Ok(lock)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(format!("yaml.{}", TEMP_SUFFIX))
}

fn remove_interrupted_write(path: &Path) {
    let tmp_path = temp_path(path);
    if tmp_path.exists() {
        tracing::debug!(path = %tmp_path.display(), "Removing interrupted write");
        let _ = fs::remove_file(&tmp_path);
    }
}

fn write_synced(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::File::create(path).map_err(|e| StoreError::io(path, e))?;
    file.write_all(content)
        .and_then(|_| file.sync_all())
        .map_err(|e| StoreError::io(path, e))
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let tmp_path = temp_path(path);
    write_synced(&tmp_path, content)?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(path, e)
    })
}
