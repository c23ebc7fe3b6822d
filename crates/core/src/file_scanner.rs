//! File scanning utilities
//!
//! Deterministic file discovery under a root directory. Entries are visited in
//! file-name order so two scans of the same tree always agree on ordering.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file found by [`FileScanner::scan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Absolute (or root-joined) path on disk
    pub path: PathBuf,
    /// Path relative to the scan root, always `/`-separated
    pub relative: String,
}

/// File scanner with configurable filters
pub struct FileScanner {
    root: PathBuf,
    extensions: Vec<String>,
    exclude_patterns: Vec<glob::Pattern>,
}

impl FileScanner {
    /// Create a new file scanner rooted at the given path
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Filter by file extensions (e.g., "so")
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add glob patterns, matched against the relative path, to exclude
    pub fn exclude<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let compiled = glob::Pattern::new(pattern)
                .map_err(|e| Error::invalid_pattern(pattern, e.msg))?;
            self.exclude_patterns.push(compiled);
        }
        Ok(self)
    }

    /// Scan and return matching files in file-name order
    ///
    /// Symbolic links are followed; a linked file is reported under the
    /// link's own path.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            return Err(Error::directory_not_found(&self.root));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();

            // Check extension filter
            if !self.extensions.is_empty() {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if !self.extensions.iter().any(|e| e == ext) {
                    continue;
                }
            }

            let Some(relative) = relative_slash_path(&self.root, path) else {
                continue;
            };

            if self.should_exclude(&relative) {
                continue;
            }

            files.push(ScannedFile {
                path: path.to_path_buf(),
                relative,
            });
        }

        Ok(files)
    }

    fn should_exclude(&self, relative: &str) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_with(relative, options))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && n != "." && n != "..")
        .unwrap_or(false)
}

/// Express `path` relative to `root` with `/` separators
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Scan for native shared libraries in a directory, skipping `excludes`
pub fn scan_native_libraries<S: AsRef<str>>(root: &Path, excludes: &[S]) -> Result<Vec<ScannedFile>> {
    FileScanner::new(root)
        .with_extensions(&["so"])
        .exclude(excludes)?
        .scan()
}
