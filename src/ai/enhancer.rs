//! Enhancer Abstraction
//!
//! Optional text-generation collaborator that proposes fixes for rule
//! violations. Nothing in the pipeline depends on it for correctness. When
//! the provider is down or no request succeeds, the result is
//! [`EnhancementStatus::Skipped`] and the deterministic documents are kept.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::ollama::OllamaEnhancer;
use super::timeout::with_timeout;
use crate::config::{AiConfig, AiProviderKind};
use crate::constants::ai::{ENHANCEMENT_TIMEOUT_SECS, MAX_FIX_REQUESTS};
use crate::types::{EnhancementStatus, EvidocError, FixSuggestion, Result, RuleViolation};

/// Shared enhancer handle for detached pipeline tasks
pub type SharedEnhancer = Arc<dyn Enhancer>;

#[async_trait]
pub trait Enhancer: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Whether the provider can serve requests right now
    async fn health_check(&self) -> Result<bool>;

    /// Suggest replacement text for one violation
    async fn suggest_fix(&self, violation: &RuleViolation) -> Result<FixSuggestion>;

    /// Suggest fixes for the most severe violations.
    ///
    /// A failed request only drops its own suggestion; the call errors when
    /// every request failed.
    async fn suggest_fixes(&self, violations: &[RuleViolation]) -> Result<Vec<FixSuggestion>> {
        let mut suggestions = Vec::new();
        let mut last_error = None;
        for violation in violations.iter().take(MAX_FIX_REQUESTS) {
            match self.suggest_fix(violation).await {
                Ok(suggestion) => suggestions.push(suggestion),
                Err(e) => {
                    warn!(
                        provider = self.name(),
                        violation = %violation.id,
                        error = %e,
                        "Fix suggestion failed"
                    );
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if suggestions.is_empty() => Err(e),
            _ => Ok(suggestions),
        }
    }
}

/// Build the configured enhancer; `None` when enhancement has no provider
pub fn create_enhancer(config: &AiConfig) -> Result<Option<SharedEnhancer>> {
    match config.provider {
        AiProviderKind::Ollama => Ok(Some(Arc::new(OllamaEnhancer::new(config)?))),
        AiProviderKind::None => Ok(None),
    }
}

/// Run the enhancer over `violations`, degrading every failure to a skip
pub async fn enhance(
    enhancer: &dyn Enhancer,
    violations: &[RuleViolation],
) -> (Vec<FixSuggestion>, EnhancementStatus) {
    enhance_within(
        enhancer,
        violations,
        Duration::from_secs(ENHANCEMENT_TIMEOUT_SECS),
    )
    .await
}

/// [`enhance`] with an explicit budget for the fix requests
pub async fn enhance_within(
    enhancer: &dyn Enhancer,
    violations: &[RuleViolation],
    budget: Duration,
) -> (Vec<FixSuggestion>, EnhancementStatus) {
    if violations.is_empty() {
        return (Vec::new(), EnhancementStatus::Applied { suggestions: 0 });
    }

    match enhancer.health_check().await {
        Ok(true) => {}
        Ok(false) => {
            let error = EvidocError::AiUnavailable(format!("{} is not reachable", enhancer.name()));
            warn!(provider = enhancer.name(), error = %error, "Skipping enhancement");
            return (Vec::new(), skipped(&error));
        }
        Err(e) => {
            warn!(provider = enhancer.name(), error = %e, "Skipping enhancement");
            return (Vec::new(), skipped(&e));
        }
    }

    let requests = enhancer.suggest_fixes(violations);
    match with_timeout(budget, requests, "fix suggestions").await {
        Ok(suggestions) => {
            info!(
                provider = enhancer.name(),
                suggestions = suggestions.len(),
                "Enhancement applied"
            );
            let status = EnhancementStatus::Applied {
                suggestions: suggestions.len(),
            };
            (suggestions, status)
        }
        Err(e) => {
            warn!(provider = enhancer.name(), error = %e, "Enhancement failed, using deterministic output");
            (Vec::new(), skipped(&e))
        }
    }
}

fn skipped(error: &EvidocError) -> EnhancementStatus {
    EnhancementStatus::Skipped {
        reason: error.to_string(),
    }
}
