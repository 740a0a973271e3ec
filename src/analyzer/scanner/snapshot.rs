//! Repository Snapshot
//!
//! An immutable view of a repository checkout: every file path (with content
//! for readable text files) and every directory. Evidence extraction and
//! source indexing both read from the same snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

use super::file_scanner::{EntryKind, FileScanner};
use crate::analyzer::parser::Language;
use crate::config::AnalysisConfig;
use crate::types::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub path: String,
    pub size: u64,
    /// `None` when the file is binary or above the size limit
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RepoSnapshot {
    files: BTreeMap<String, SnapshotFile>,
    directories: BTreeSet<String>,
}

impl RepoSnapshot {
    /// Build an in-memory snapshot; parent directories are derived from the paths
    pub fn from_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let mut snapshot = Self::default();
        for (path, content) in files {
            snapshot.insert_file(path.into(), Some(content.into()));
        }
        snapshot
    }

    /// Add a directory that may have no files (e.g. an empty `api/` folder)
    pub fn with_directory(mut self, dir: impl Into<String>) -> Self {
        let dir = normalize(&dir.into());
        self.add_directory_chain(&dir);
        self
    }

    /// Load a snapshot from disk
    pub fn load(root: &Path, config: &AnalysisConfig) -> Result<Self> {
        let scanner = FileScanner::from_config(root, config)?;
        let entries = scanner.scan()?;
        let mut snapshot = Self::default();

        for entry in entries {
            match entry.kind {
                EntryKind::Directory => snapshot.add_directory_chain(&entry.relative_path),
                EntryKind::File => {
                    let content = if scanner.is_readable_size(entry.size) {
                        match std::fs::read(root.join(&entry.relative_path)) {
                            Ok(bytes) => String::from_utf8(bytes).ok(),
                            Err(e) => {
                                debug!(path = %entry.relative_path, "Unreadable file: {}", e);
                                None
                            }
                        }
                    } else {
                        None
                    };
                    snapshot.files.insert(
                        entry.relative_path.clone(),
                        SnapshotFile {
                            path: entry.relative_path.clone(),
                            size: entry.size,
                            content,
                        },
                    );
                    if let Some((parent, _)) = entry.relative_path.rsplit_once('/') {
                        snapshot.add_directory_chain(parent);
                    }
                }
            }
        }

        info!(
            root = %root.display(),
            files = snapshot.files.len(),
            directories = snapshot.directories.len(),
            "Loaded repository snapshot"
        );
        Ok(snapshot)
    }

    fn insert_file(&mut self, path: String, content: Option<String>) {
        let path = normalize(&path);
        let size = content.as_ref().map(|c| c.len() as u64).unwrap_or(0);
        if let Some((parent, _)) = path.rsplit_once('/') {
            self.add_directory_chain(parent);
        }
        self.files.insert(
            path.clone(),
            SnapshotFile {
                path,
                size,
                content,
            },
        );
    }

    fn add_directory_chain(&mut self, dir: &str) {
        let mut current = String::new();
        for part in dir.split('/').filter(|p| !p.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(part);
            self.directories.insert(current.clone());
        }
    }

    pub fn file(&self, path: &str) -> Option<&SnapshotFile> {
        self.files.get(path)
    }

    pub fn content(&self, path: &str) -> Option<&str> {
        self.files.get(path).and_then(|f| f.content.as_deref())
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.directories.contains(path)
    }

    /// Files in path order
    pub fn files(&self) -> impl Iterator<Item = &SnapshotFile> {
        self.files.values()
    }

    /// Directories in path order
    pub fn directories(&self) -> impl Iterator<Item = &str> {
        self.directories.iter().map(String::as_str)
    }

    /// Readable files a parser exists for, as `(path, content)` pairs
    pub fn source_files(&self) -> Vec<(String, String)> {
        self.files
            .values()
            .filter(|f| Language::from_path(&f.path).has_parser_support())
            .filter_map(|f| f.content.clone().map(|c| (f.path.clone(), c)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .trim_start_matches("./")
        .trim_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_files_derives_directories() {
        let snapshot = RepoSnapshot::from_files([("src/api/users.ts", "x")]);
        assert!(snapshot.has_directory("src"));
        assert!(snapshot.has_directory("src/api"));
        assert_eq!(snapshot.content("src/api/users.ts"), Some("x"));
    }

    #[test]
    fn test_with_empty_directory() {
        let snapshot = RepoSnapshot::from_files(Vec::<(String, String)>::new()).with_directory("api");
        assert!(snapshot.has_directory("api"));
        assert_eq!(snapshot.len(), 0);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_source_files_only_parseable() {
        let snapshot = RepoSnapshot::from_files([
            ("README.md", "# x"),
            ("app.py", "print(1)"),
            ("index.ts", "export {}"),
        ]);
        let sources: Vec<String> = snapshot.source_files().into_iter().map(|(p, _)| p).collect();
        assert_eq!(sources, vec!["app.py".to_string(), "index.ts".to_string()]);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("api")).unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00]).unwrap();

        let snapshot = RepoSnapshot::load(dir.path(), &AnalysisConfig::default()).unwrap();
        assert!(snapshot.has_directory("api"));
        assert_eq!(snapshot.content("package.json"), Some("{}"));
        assert!(snapshot.has_file("blob.bin"));
        assert_eq!(snapshot.content("blob.bin"), None);
    }
}
