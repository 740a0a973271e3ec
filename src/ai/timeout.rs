//! Timeout helpers for calls to the enhancement provider.

use std::future::Future;
use std::time::Duration;

use crate::types::{EvidocError, Result};

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(EvidocError::timeout(operation_name, timeout)),
    }
}

/// Execute an async operation with a timeout, wrapping a non-Result output
pub async fn with_timeout_map<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(EvidocError::timeout(operation_name, timeout)),
    }
}
