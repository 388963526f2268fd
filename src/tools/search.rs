use std::fs;
use std::path::{Path, PathBuf};

use regex::RegexBuilder;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use super::Workspace;
use crate::errors::ToolError;

const SKIP_DIRS: &[&str] = &[".git", "target", "node_modules", ".venv", "__pycache__"];

const BINARY_EXTENSIONS: &[&str] = &[
    "a", "bin", "dll", "dylib", "exe", "gif", "gz", "ico", "jpeg", "jpg", "o", "pdf", "png",
    "pyc", "rlib", "so", "zip",
];

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub pattern: String,
    pub directory: String,
    /// Glob matched against file names, e.g. `*.rs`.
    pub file_glob: Option<String>,
    pub regex: bool,
    pub case_insensitive: bool,
    pub max_results: usize,
}

impl SearchQuery {
    /// Case-insensitive literal search from the project root.
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            directory: ".".to_string(),
            file_glob: None,
            regex: false,
            case_insensitive: true,
            max_results: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub file: PathBuf,
    pub line_number: usize,
    pub content: String,
}

impl Workspace {
    /// Grep-like search over text files, in file-name order.
    pub fn search_codebase(&self, query: &SearchQuery) -> Result<Vec<SearchMatch>, ToolError> {
        let dir = self.resolve(&query.directory)?;
        if !dir.exists() {
            return Err(ToolError::NotFound(dir));
        }

        let source = if query.regex {
            query.pattern.clone()
        } else {
            regex::escape(&query.pattern)
        };
        let matcher = RegexBuilder::new(&source)
            .case_insensitive(query.case_insensitive)
            .build()
            .map_err(|e| ToolError::InvalidPattern(e.to_string()))?;
        let file_glob = query
            .file_glob
            .as_deref()
            .map(glob::Pattern::new)
            .transpose()
            .map_err(|e| ToolError::InvalidPattern(e.to_string()))?;

        let mut matches = Vec::new();
        let walker = WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry));

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() || is_binary(entry.path()) {
                continue;
            }
            let name_matches = file_glob
                .as_ref()
                .is_none_or(|pattern| pattern.matches(&entry.file_name().to_string_lossy()));
            if !name_matches {
                continue;
            }
            let Ok(bytes) = fs::read(entry.path()) else {
                continue;
            };

            for (index, line) in String::from_utf8_lossy(&bytes).lines().enumerate() {
                if !matcher.is_match(line) {
                    continue;
                }
                matches.push(SearchMatch {
                    file: self.relative(entry.path()).to_path_buf(),
                    line_number: index + 1,
                    content: line.trim().to_string(),
                });
                if matches.len() >= query.max_results {
                    return Ok(matches);
                }
            }
        }
        Ok(matches)
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && SKIP_DIRS.iter().any(|skip| entry.file_name() == *skip)
}

fn is_binary(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
}
