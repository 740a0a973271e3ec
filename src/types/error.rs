//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Every pipeline fault is converted into one of a small number of kinds
//! so the pipeline can decide whether a job must fail or can degrade.
//!
//! ## Error Kinds
//!
//! - **ExtractionIncomplete**: an evidence field could not be read (degrade to Missing)
//! - **RuleEvaluation**: a single rule failed (skip the rule)
//! - **LockContention**: a generation is already running (conflict response)
//! - **GenerationFailed**: the current job cannot complete (terminal `failed`)
//! - **AiUnavailable**: the enhancer is absent, slow or erroring (deterministic output only)

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Kinds
// =============================================================================

/// Classification used for propagation decisions inside the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Evidence could not be gathered; the field stays at its "not found" value
    ExtractionIncomplete,
    /// A rule failed internally; it is skipped
    RuleEvaluation,
    /// Expected condition while a job is already running
    LockContention,
    /// Fatal for the current job only
    GenerationFailed,
    /// Optional enhancement could not run
    AiUnavailable,
    /// Infrastructure faults (I/O, database, serialization, config)
    System,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExtractionIncomplete => write!(f, "EXTRACTION_INCOMPLETE"),
            Self::RuleEvaluation => write!(f, "RULE_EVALUATION"),
            Self::LockContention => write!(f, "LOCK_CONTENTION"),
            Self::GenerationFailed => write!(f, "GENERATION_FAILED"),
            Self::AiUnavailable => write!(f, "AI_UNAVAILABLE"),
            Self::System => write!(f, "SYSTEM"),
        }
    }
}

impl ErrorKind {
    /// Whether an error of this kind must end the current job as `failed`
    pub fn is_fatal_for_job(&self) -> bool {
        matches!(self, Self::GenerationFailed | Self::System)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum EvidocError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    #[error("Evidence incomplete for {field}: {reason}")]
    ExtractionIncomplete { field: String, reason: String },

    #[error("Rule '{rule}' failed: {message}")]
    RuleEvaluation { rule: String, message: String },

    #[error("Generation already in progress for repository {repository_id}")]
    LockContention { repository_id: String },

    #[error("Generation failed at step '{step}': {message}")]
    GenerationFailed { step: String, message: String },

    #[error("AI enhancement unavailable: {0}")]
    AiUnavailable(String),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Parse error in {path}: {message}")]
    Parse { message: String, path: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<anyhow::Error> for EvidocError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return EvidocError::Io(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }
        EvidocError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EvidocError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl EvidocError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn generation(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleEvaluation {
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn extraction(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExtractionIncomplete {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Map this error onto the pipeline taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ExtractionIncomplete { .. } | Self::Parse { .. } => {
                ErrorKind::ExtractionIncomplete
            }
            Self::RuleEvaluation { .. } => ErrorKind::RuleEvaluation,
            Self::LockContention { .. } => ErrorKind::LockContention,
            Self::GenerationFailed { .. } => ErrorKind::GenerationFailed,
            // Timeouts only wrap optional enhancer calls
            Self::AiUnavailable(_) | Self::Timeout { .. } => ErrorKind::AiUnavailable,
            Self::Io(_)
            | Self::Database(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Storage(_)
            | Self::NotFound(_) => ErrorKind::System,
        }
    }

    pub fn is_fatal_for_job(&self) -> bool {
        self.kind().is_fatal_for_job()
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| EvidocError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| EvidocError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::LockContention.to_string(), "LOCK_CONTENTION");
        assert_eq!(ErrorKind::AiUnavailable.to_string(), "AI_UNAVAILABLE");
    }

    #[test]
    fn test_non_fatal_kinds() {
        assert!(!ErrorKind::ExtractionIncomplete.is_fatal_for_job());
        assert!(!ErrorKind::RuleEvaluation.is_fatal_for_job());
        assert!(!ErrorKind::LockContention.is_fatal_for_job());
        assert!(!ErrorKind::AiUnavailable.is_fatal_for_job());
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(EvidocError::generation("synthesize", "boom").is_fatal_for_job());
        assert!(EvidocError::Storage("disk".into()).is_fatal_for_job());
    }

    #[test]
    fn test_pipeline_error_kinds() {
        assert_eq!(
            EvidocError::generation("synthesize", "boom").kind(),
            ErrorKind::GenerationFailed
        );
        assert_eq!(EvidocError::Storage("disk".into()).kind(), ErrorKind::System);
        assert_eq!(
            EvidocError::rule("api-endpoint-roles", "bad").kind(),
            ErrorKind::RuleEvaluation
        );
    }

    #[test]
    fn test_timeout_maps_to_ai_unavailable() {
        let err = EvidocError::timeout("enhance", Duration::from_secs(1));
        assert_eq!(err.kind(), ErrorKind::AiUnavailable);
    }

    #[test]
    fn test_parse_maps_to_extraction_incomplete() {
        let err = EvidocError::Parse {
            message: "syntax".into(),
            path: "a.ts".into(),
        };
        assert_eq!(err.kind(), ErrorKind::ExtractionIncomplete);
    }

    #[test]
    fn test_with_context() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("denied"));
        let err = res.with_context("opening db").unwrap_err();
        assert!(err.to_string().contains("opening db: denied"));
    }

    #[test]
    fn test_display_messages() {
        let err = EvidocError::LockContention {
            repository_id: "repo-1".into(),
        };
        assert!(err.to_string().contains("repo-1"));
        let err = EvidocError::rule("api-endpoint-roles", "bad input");
        assert_eq!(err.to_string(), "Rule 'api-endpoint-roles' failed: bad input");
    }
}
