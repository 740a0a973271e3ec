//! Change History
//!
//! Per-file change frequency and last-modified time, supplied from outside
//! the snapshot (typically `git log --name-only --date=iso-strict`).
//! The graph builder only reads from it; an empty history leaves every
//! file at frequency zero with no timestamp.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{EvidocError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileHistory {
    changes: u32,
    last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeHistory {
    files: HashMap<String, FileHistory>,
}

impl ChangeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from explicit `(path, timestamp)` change records
    pub fn from_entries<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, Option<DateTime<Utc>>)>,
        P: Into<String>,
    {
        let mut history = Self::default();
        for (path, at) in entries {
            history.record(path.into(), at);
        }
        history
    }

    /// Parse `git log --name-only --date=iso-strict` output.
    ///
    /// Commit headers, author lines and indented message lines are skipped;
    /// every other non-empty line is a path touched by the current commit.
    pub fn parse_git_log(output: &str) -> Self {
        let mut history = Self::default();
        let mut current_date: Option<DateTime<Utc>> = None;

        for line in output.lines() {
            if line.starts_with("commit ") {
                current_date = None;
            } else if let Some(date) = line.strip_prefix("Date:") {
                current_date = DateTime::parse_from_rfc3339(date.trim())
                    .ok()
                    .map(|d| d.with_timezone(&Utc));
            } else if line.starts_with("Author:")
                || line.starts_with("Merge:")
                || line.starts_with("    ")
                || line.trim().is_empty()
            {
                continue;
            } else {
                history.record(line.trim().to_string(), current_date);
            }
        }
        history
    }

    /// Run `git log` in `repo`.
    ///
    /// Paths are reported relative to `repo`, so a subdirectory of a larger
    /// checkout lines up with its own snapshot. A missing `git` binary or a
    /// directory outside any work tree is an [`EvidocError::ExtractionIncomplete`].
    pub fn from_git(repo: &Path) -> Result<Self> {
        let output = Command::new("git")
            .arg("-C")
            .arg(repo)
            .args([
                "log",
                "--name-only",
                "--relative",
                "--date=iso-strict",
                "--no-color",
            ])
            .output()
            .map_err(|e| EvidocError::extraction("history", format!("git unavailable: {}", e)))?;

        if !output.status.success() {
            return Err(EvidocError::extraction(
                "history",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let history = Self::parse_git_log(&String::from_utf8_lossy(&output.stdout));
        debug!(files = history.files.len(), "Loaded change history");
        Ok(history)
    }

    /// [`from_git`](Self::from_git), degrading non-fatal gaps to an empty history
    pub fn load(repo: &Path) -> Result<Self> {
        match Self::from_git(repo) {
            Ok(history) => Ok(history),
            Err(e) if !e.is_fatal_for_job() => {
                debug!(path = %repo.display(), error = %e, "No change history");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    fn record(&mut self, path: String, at: Option<DateTime<Utc>>) {
        let entry = self.files.entry(path).or_insert(FileHistory {
            changes: 0,
            last_modified: None,
        });
        entry.changes += 1;
        entry.last_modified = match (entry.last_modified, at) {
            (Some(existing), Some(new)) => Some(existing.max(new)),
            (existing, new) => existing.or(new),
        };
    }

    pub fn frequency(&self, path: &str) -> u32 {
        self.files.get(path).map(|h| h.changes).unwrap_or(0)
    }

    pub fn last_modified(&self, path: &str) -> Option<DateTime<Utc>> {
        self.files.get(path).and_then(|h| h.last_modified)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
commit 2b1f0c
Author: Dev <dev@example.com>
Date:   2024-03-02T10:00:00+00:00

    Add orders endpoint

src/api/orders.js
src/app.js

commit 9a7e44
Author: Dev <dev@example.com>
Date:   2024-03-01T09:00:00+00:00

    Initial commit

src/app.js
package.json
";

    #[test]
    fn test_parse_git_log() {
        let history = ChangeHistory::parse_git_log(LOG);
        assert_eq!(history.frequency("src/app.js"), 2);
        assert_eq!(history.frequency("src/api/orders.js"), 1);
        assert_eq!(history.frequency("missing.js"), 0);

        let last = history.last_modified("src/app.js").unwrap();
        assert_eq!(last.to_rfc3339(), "2024-03-02T10:00:00+00:00");
    }

    #[test]
    fn test_message_lines_are_not_paths() {
        let history = ChangeHistory::parse_git_log(LOG);
        assert_eq!(history.frequency("Add orders endpoint"), 0);
    }

    #[test]
    fn test_from_entries() {
        let history = ChangeHistory::from_entries([("a.ts", None), ("a.ts", None)]);
        assert_eq!(history.frequency("a.ts"), 2);
        assert!(history.last_modified("a.ts").is_none());
    }

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .arg("-C")
            .arg(dir)
            .args([
                "-c",
                "user.name=Dev",
                "-c",
                "user.email=dev@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .output()
            .is_ok_and(|o| o.status.success())
    }

    #[test]
    fn test_outside_work_tree_degrades_to_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ChangeHistory::from_git(dir.path()).unwrap_err();
        assert!(!err.is_fatal_for_job());

        let history = ChangeHistory::load(dir.path()).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_subdirectory_paths_are_relative() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = dir.path().join("services").join("orders");
        std::fs::create_dir_all(service.join("src")).unwrap();
        std::fs::write(service.join("src").join("app.js"), "module.exports = {};\n").unwrap();
        std::fs::write(dir.path().join("ROOT.md"), "# root\n").unwrap();

        if !git(dir.path(), &["init", "-q"])
            || !git(dir.path(), &["add", "."])
            || !git(dir.path(), &["commit", "-q", "-m", "init"])
        {
            // git is not installed here
            return;
        }

        let history = ChangeHistory::from_git(&service).unwrap();
        assert_eq!(history.frequency("src/app.js"), 1);
        assert_eq!(history.frequency("services/orders/src/app.js"), 0);
        assert_eq!(history.frequency("ROOT.md"), 0);
    }
}
