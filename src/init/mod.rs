//! Project layout and root discovery.
//!
//! ```text
//! .hyphae/
//! ├── hyphae.toml      # Project configuration (written with defaults on init)
//! ├── CONTRACT.md      # Optional shared instructions for every phase
//! ├── agents/          # Optional per-phase prompt overrides (<phase>.md)
//! └── missions/
//!     └── <id>/progress.yaml
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::hyphae_config::{CONFIG_FILE, HyphaeToml};

/// The name of the hyphae directory.
pub const HYPHAE_DIR: &str = ".hyphae";

#[derive(Debug)]
pub struct InitResult {
    pub hyphae_dir: PathBuf,
    /// False if the directory already existed
    pub created: bool,
}

/// Create `.hyphae/` under `project_dir`, filling in anything missing.
///
/// Existing files are never overwritten.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let hyphae_dir = project_dir.join(HYPHAE_DIR);
    let created = !hyphae_dir.exists();

    for dir in [hyphae_dir.join("missions"), hyphae_dir.join("agents")] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let config_path = hyphae_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        HyphaeToml::default().save(&config_path)?;
    }

    if created {
        tracing::info!(path = %hyphae_dir.display(), "Initialized hyphae project");
    }
    Ok(InitResult {
        hyphae_dir,
        created,
    })
}

/// Nearest ancestor of `start` (inclusive) that contains `.hyphae/`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(HYPHAE_DIR).is_dir())
        .map(Path::to_path_buf)
}

pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(HYPHAE_DIR).is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_layout() {
        let dir = tempdir().unwrap();
        let result = init_project(dir.path()).unwrap();

        assert!(result.created);
        assert!(result.hyphae_dir.join("missions").is_dir());
        assert!(result.hyphae_dir.join("agents").is_dir());
        assert!(result.hyphae_dir.join(CONFIG_FILE).is_file());
        assert!(is_initialized(dir.path()));
    }

    #[test]
    fn test_init_is_idempotent_and_keeps_config() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();
        let config_path = dir.path().join(HYPHAE_DIR).join(CONFIG_FILE);
        std::fs::write(&config_path, "[run]\nmax_iterations = 2\n").unwrap();

        let again = init_project(dir.path()).unwrap();
        assert!(!again.created);
        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("max_iterations = 2"));
    }

    #[test]
    fn test_find_project_root_walks_up() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_find_project_root_none_without_marker() {
        let dir = tempdir().unwrap();
        assert_eq!(find_project_root(dir.path()), None);
    }
}
