//! Shared helpers for reading persisted values.

use std::fmt::Display;

use super::job::JobStatus;

// =============================================================================
// Type Parsing
// =============================================================================

/// Trait for parsing strings into enum types with a default fallback.
/// Used for deserializing database values where invalid strings should fall back gracefully.
/// Logs a warning when an invalid value is encountered.
pub trait ParseWithDefault: Sized {
    /// The name of this type for logging purposes.
    fn type_name() -> &'static str;

    /// The default value to use when parsing fails.
    fn default_value() -> Self;

    /// Try to parse the string, returning None if invalid.
    fn try_parse(s: &str) -> Option<Self>;

    /// Parse a string into this type, returning a default value if parsing fails.
    fn parse_or_default(s: &str) -> Self {
        match Self::try_parse(s) {
            Some(v) => v,
            None => {
                tracing::warn!("Invalid {} value '{}', using default", Self::type_name(), s);
                Self::default_value()
            }
        }
    }
}

impl ParseWithDefault for JobStatus {
    fn type_name() -> &'static str {
        "JobStatus"
    }

    // An unreadable status must never be treated as a live lock
    fn default_value() -> Self {
        JobStatus::Failed
    }

    fn try_parse(s: &str) -> Option<Self> {
        JobStatus::parse(s)
    }
}

// =============================================================================
// Result Helpers
// =============================================================================

/// Keep the value of `result`, logging and discarding an error.
///
/// For persisted fields whose corruption must not make the whole row unreadable.
pub fn log_filter_warn<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{}: {}", context, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_parse_with_default() {
        assert_eq!(JobStatus::parse_or_default("completed"), JobStatus::Completed);
        assert_eq!(JobStatus::parse_or_default("garbage"), JobStatus::Failed);
    }

    #[test]
    fn test_log_filter_warn() {
        let ok: Result<i32, String> = Ok(3);
        let err: Result<i32, String> = Err("bad".into());
        assert_eq!(log_filter_warn(ok, "ctx"), Some(3));
        assert_eq!(log_filter_warn(err, "ctx"), None);
    }
}
