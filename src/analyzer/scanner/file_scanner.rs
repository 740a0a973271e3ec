use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::constants;
use crate::types::{EvidocError, Result};

/// Walks a repository checkout and lists files and directories relative to its root.
#[derive(Debug, Clone)]
pub struct FileScanner {
    root: PathBuf,
    exclude: Vec<glob::Pattern>,
    max_file_size: u64,
    max_files: usize,
    respect_gitignore: bool,
}

impl FileScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exclude: Vec::new(),
            max_file_size: constants::analysis::MAX_FILE_SIZE,
            max_files: constants::analysis::MAX_FILES,
            respect_gitignore: true,
        }
    }

    pub fn from_config<P: AsRef<Path>>(root: P, config: &AnalysisConfig) -> Result<Self> {
        Ok(Self::new(root)
            .with_exclude(&config.exclude)?
            .with_max_file_size(config.max_file_size)
            .with_max_files(config.max_files)
            .respect_gitignore(config.respect_gitignore))
    }

    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| {
                    EvidocError::Config(format!("Invalid exclude pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn respect_gitignore(mut self, enabled: bool) -> Self {
        self.respect_gitignore = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan(&self) -> Result<Vec<ScannedEntry>> {
        if !self.root.is_dir() {
            return Err(EvidocError::NotFound(format!(
                "repository path {}",
                self.root.display()
            )));
        }

        let root = self.root.clone();
        let exclude = self.exclude.clone();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .git_global(false)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .sort_by_file_path(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let Some(rel) = relative_path(&root, entry.path()) else {
                    return true;
                };
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                // Prune a directory when anything inside it would be excluded
                let probe = if is_dir {
                    format!("{}/_", rel)
                } else {
                    rel.clone()
                };
                rel == ".git" || !exclude.iter().any(|p| p.matches(&probe) || p.matches(&rel))
            })
            .build();

        let mut entries = Vec::new();
        let mut file_count = 0usize;

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let Some(rel) = relative_path(&self.root, entry.path()) else {
                continue;
            };
            if rel.is_empty() || rel == ".git" || rel.starts_with(".git/") {
                continue;
            }

            let Some(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                entries.push(ScannedEntry {
                    relative_path: rel,
                    kind: EntryKind::Directory,
                    size: 0,
                });
                continue;
            }

            if !file_type.is_file() {
                continue;
            }

            if file_count >= self.max_files {
                warn!(
                    max_files = self.max_files,
                    "Snapshot file limit reached, remaining files ignored"
                );
                break;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            file_count += 1;
            entries.push(ScannedEntry {
                relative_path: rel,
                kind: EntryKind::File,
                size,
            });
        }

        Ok(entries)
    }

    /// Whether a file of `size` bytes should have its content read
    pub fn is_readable_size(&self, size: u64) -> bool {
        size <= self.max_file_size
    }
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEntry {
    /// `/`-separated path relative to the scan root
    pub relative_path: String,
    pub kind: EntryKind,
    pub size: u64,
}
