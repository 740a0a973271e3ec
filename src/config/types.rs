//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/evidoc/) and project (.evidoc/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants;
use crate::types::{EvidocError, OutputFormat, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Repository snapshot settings
    pub analysis: AnalysisConfig,

    /// Job lifecycle settings
    pub generation: GenerationConfig,

    /// Optional AI enhancer settings
    pub ai: AiConfig,

    /// Job record persistence
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            analysis: AnalysisConfig::default(),
            generation: GenerationConfig::default(),
            ai: AiConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `EvidocError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.generation.lock_window_secs == 0 {
            return Err(EvidocError::Config(
                "generation.lock_window_secs must be greater than 0".to_string(),
            ));
        }

        if self.generation.max_concurrent_jobs == 0 {
            return Err(EvidocError::Config(
                "generation.max_concurrent_jobs must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(EvidocError::Config(format!(
                "ai.temperature must be between 0.0 and 2.0, got {}",
                self.ai.temperature
            )));
        }

        if self.ai.timeout_secs == 0 {
            return Err(EvidocError::Config(
                "ai.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.analysis.max_file_size == 0 {
            return Err(EvidocError::Config(
                "analysis.max_file_size must be greater than 0".to_string(),
            ));
        }

        for pattern in &self.analysis.exclude {
            glob::Pattern::new(pattern).map_err(|e| {
                EvidocError::Config(format!("Invalid exclude pattern '{}': {}", pattern, e))
            })?;
        }

        Ok(())
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Glob patterns excluded from the snapshot
    pub exclude: Vec<String>,

    /// Files larger than this are listed but not read (bytes)
    pub max_file_size: u64,

    /// Hard cap on snapshot size
    pub max_files: usize,

    /// Respect .gitignore files while walking
    pub respect_gitignore: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            exclude: constants::analysis::DEFAULT_EXCLUDES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_size: constants::analysis::MAX_FILE_SIZE,
            max_files: constants::analysis::MAX_FILES,
            respect_gitignore: true,
        }
    }
}

// =============================================================================
// Generation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Age after which a `generating` job is treated as abandoned
    pub lock_window_secs: u64,

    /// Worker pool size for detached pipelines
    pub max_concurrent_jobs: usize,

    /// Ask the AI enhancer for fix suggestions
    pub enhance: bool,

    /// Format used when writing sections to disk
    pub output_format: OutputFormat,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            lock_window_secs: constants::lock::DEFAULT_WINDOW_SECS,
            max_concurrent_jobs: constants::lock::DEFAULT_MAX_CONCURRENT_JOBS,
            enhance: false,
            output_format: OutputFormat::Markdown,
        }
    }
}

impl GenerationConfig {
    pub fn lock_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lock_window_secs as i64)
    }
}

// =============================================================================
// AI Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    /// Local Ollama server
    Ollama,
    /// No enhancer; output is deterministic only
    #[default]
    None,
}

impl std::fmt::Display for AiProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: AiProviderKind,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProviderKind::None,
            model: constants::ai::DEFAULT_MODEL.to_string(),
            api_base: constants::ai::DEFAULT_OLLAMA_URL.to_string(),
            timeout_secs: constants::ai::DEFAULT_TIMEOUT_SECS,
            temperature: constants::ai::DEFAULT_TEMPERATURE,
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(constants::storage::PROJECT_DIR)
                .join(constants::storage::DEFAULT_DATABASE_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generation.lock_window_secs, 300);
        assert_eq!(config.ai.provider, AiProviderKind::None);
    }

    #[test]
    fn test_zero_lock_window_rejected() {
        let mut config = Config::default();
        config.generation.lock_window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_temperature_range() {
        let mut config = Config::default();
        config.ai.temperature = 2.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let mut config = Config::default();
        config.analysis.exclude.push("[unclosed".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lock_window_duration() {
        let config = GenerationConfig::default();
        assert_eq!(config.lock_window(), chrono::Duration::minutes(5));
    }
}
