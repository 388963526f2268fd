use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use super::Workspace;
use crate::errors::ToolError;
use crate::init::HYPHAE_DIR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub bytes_written: usize,
}

impl Workspace {
    /// Directory listing, directories first, then by case-insensitive name.
    pub fn list_files(&self, dir: &str, include_hidden: bool) -> Result<Vec<FileEntry>, ToolError> {
        let path = self.resolve(dir)?;
        if !path.exists() {
            return Err(ToolError::NotFound(path));
        }
        if !path.is_dir() {
            return Err(ToolError::NotADirectory(path));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&path).map_err(|e| ToolError::io(&path, e))? {
            let entry = entry.map_err(|e| ToolError::io(&path, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !include_hidden && name.starts_with('.') {
                continue;
            }
            let metadata = entry.metadata().ok();
            let is_dir = metadata.as_ref().is_some_and(|m| m.is_dir());
            entries.push(FileEntry {
                name,
                kind: if is_dir { EntryKind::Directory } else { EntryKind::File },
                size: metadata.filter(|m| m.is_file()).map(|m| m.len()),
            });
        }

        entries.sort_by(|a, b| {
            (a.kind != EntryKind::Directory)
                .cmp(&(b.kind != EntryKind::Directory))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(entries)
    }

    pub fn read_file(&self, file: &str) -> Result<String, ToolError> {
        let path = self.resolve(file)?;
        if !path.exists() {
            return Err(ToolError::NotFound(path));
        }
        if path.is_dir() {
            return Err(ToolError::IsADirectory(path));
        }
        fs::read_to_string(&path).map_err(|e| ToolError::io(&path, e))
    }

    /// Write `content` to `file`, replacing it.
    ///
    /// Anything under `.hyphae/missions` is refused.
    pub fn write_file(&self, file: &str, content: &str, create_dirs: bool) -> Result<WriteOutcome, ToolError> {
        let path = self.resolve(file)?;
        if path.starts_with(self.root.join(HYPHAE_DIR).join("missions")) {
            return Err(ToolError::Protected(path));
        }
        if path.is_dir() {
            return Err(ToolError::IsADirectory(path));
        }

        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            if !create_dirs {
                return Err(ToolError::NotFound(parent.to_path_buf()));
            }
            fs::create_dir_all(parent).map_err(|e| ToolError::io(parent, e))?;
        }

        fs::write(&path, content).map_err(|e| ToolError::io(&path, e))?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "Tool wrote file");
        Ok(WriteOutcome {
            path: self.relative(&path).to_path_buf(),
            bytes_written: content.len(),
        })
    }
}
