//! CLI Common Utilities
//!
//! Shared initialization for command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, ConfigLoader};
use crate::storage::{Database, SharedJobStore, SqliteJobStore};
use crate::types::{EvidocError, Result};

/// Command execution context
///
/// Loaded configuration plus the job store it points at.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub store: SharedJobStore,
}

impl CommandContext {
    /// Load config for the current directory and open the job database
    pub fn load() -> Result<Self> {
        let config = ConfigLoader::load()?;
        let store = open_job_store(&config)?;
        Ok(Self { config, store })
    }
}

/// Open (and create if needed) the configured job database
pub fn open_job_store(config: &Config) -> Result<SharedJobStore> {
    let db = Database::open(&config.storage.database_path)?;
    db.initialize()?;
    Ok(Arc::new(SqliteJobStore::new(Arc::new(db))))
}

/// Resolve a repository argument to an existing directory
pub fn resolve_repo(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(EvidocError::NotFound(format!(
            "repository path {}",
            path.display()
        )));
    }
    Ok(path.canonicalize()?)
}

/// Default repository id: the checkout's directory name
pub fn default_repository_id(repo: &Path) -> String {
    repo.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("repository")
        .to_string()
}

/// `text` or `json`; anything else is rejected up front
pub fn parse_format(format: &str) -> Result<bool> {
    match format.to_lowercase().as_str() {
        "text" => Ok(false),
        "json" => Ok(true),
        other => Err(EvidocError::Config(format!(
            "Invalid format '{}'. Valid values: text, json",
            other
        ))),
    }
}
