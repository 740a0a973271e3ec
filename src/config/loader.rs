//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/evidoc/config.toml)
//! 3. Project config (<repo>/.evidoc/config.toml)
//! 4. Environment variables (EVIDOC_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::constants;
use crate::types::{EvidocError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory
    pub fn load() -> Result<Config> {
        Self::load_for(Path::new("."))
    }

    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load_for(project_root: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path(project_root);
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // EVIDOC_GENERATION__LOCK_WINDOW_SECS -> generation.lock_window_secs
        figment = figment.merge(Env::prefixed("EVIDOC_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| EvidocError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| EvidocError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/evidoc/)
    pub fn global_dir() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("evidoc"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get project data directory
    pub fn project_dir(project_root: &Path) -> PathBuf {
        project_root.join(constants::storage::PROJECT_DIR)
    }

    /// Get path to project config file
    pub fn project_config_path(project_root: &Path) -> PathBuf {
        Self::project_dir(project_root).join("config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Describe config file locations and whether they exist
    pub fn describe_paths(project_root: &Path) -> Vec<(&'static str, Option<PathBuf>, bool)> {
        let global = Self::global_config_path();
        let global_exists = global.as_ref().is_some_and(|p| p.exists());
        let project = Self::project_config_path(project_root);
        let project_exists = project.exists();
        vec![
            ("Global", global, global_exists),
            ("Project", Some(project), project_exists),
        ]
    }

    /// Render the effective configuration as TOML or JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| EvidocError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default project config unless one exists (or `force` is set)
    pub fn init_project(project_root: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = Self::project_dir(project_root);
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_project_config()?)?;
            info!("Created project config: {}", config_path.display());
        } else {
            info!("Project config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    fn default_project_config() -> Result<String> {
        let body = toml::to_string_pretty(&Config::default())
            .map_err(|e| EvidocError::Config(e.to_string()))?;
        Ok(format!(
            "# evidoc project configuration\n\
             # Overrides ~/.config/evidoc/config.toml; EVIDOC_* variables override both.\n\n{}",
            body
        ))
    }
}
