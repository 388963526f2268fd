//! Workspace tools an agent can call during a phase (`hyphae tool ...`).
//!
//! | Tool | Mutates | Module |
//! |------|---------|--------|
//! | `read-progress` | no | `cmd::tool` (loads through the store) |
//! | `list-files`, `read-file` | no | [`files`] |
//! | `write-file` | yes | [`files`] |
//! | `run-command` | yes | [`exec`] |
//! | `search` | no | [`search`] |
//!
//! Every path resolves inside the project root. Mutating tools pass through
//! [`authorize`] first, which consults the approval gate while the mission is
//! in a code-mutating phase. The mission artifact itself is never writable
//! here; the phase runner is its only writer.

mod exec;
mod files;
mod gate;
mod search;

pub use exec::CommandOutcome;
pub use files::{EntryKind, FileEntry, WriteOutcome};
pub use gate::authorize;
pub use search::{SearchMatch, SearchQuery};

use std::path::{Component, Path, PathBuf};

use crate::errors::ToolError;

/// A project root that tool paths are confined to.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn open(root: &Path) -> Result<Self, ToolError> {
        let root = root.canonicalize().map_err(|e| ToolError::io(root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` against the root without touching the filesystem.
    ///
    /// Relative paths are taken from the root; `..` may not climb above it.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let mut resolved = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(ToolError::OutsideRoot(path.to_string()));
                    }
                }
                other => resolved.push(other.as_os_str()),
            }
        }

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(ToolError::OutsideRoot(path.to_string()))
        }
    }

    /// Path relative to the root, for display in tool output.
    pub(crate) fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}
