use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, warn};

use super::catalog::{DocContent, Finding, Rule, RuleContext, default_catalog};
use crate::constants::rules::MAX_SCORE;
use crate::types::{AnalysisResult, EvidocError, RuleViolation, RulesResult, RulesSummary, Severity};

/// Evaluates the rule catalog against an analysis result.
///
/// Evaluation performs no I/O and is deterministic: the same analysis and
/// documentation always produce an identical `RulesResult`.
pub struct RulesEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesEngine {
    pub fn new() -> Self {
        Self {
            rules: default_catalog(),
        }
    }

    /// Engine with a custom catalog
    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn validate(&self, analysis: &AnalysisResult, doc_content: Option<&str>) -> RulesResult {
        let doc = doc_content.map(DocContent::new);
        let ctx = RuleContext {
            analysis,
            doc: doc.as_ref(),
        };

        let mut violations = Vec::new();
        let mut skipped_rules = Vec::new();
        let mut penalty_total: u32 = 0;

        for rule in &self.rules {
            let findings = match evaluate(rule.as_ref(), &ctx) {
                Ok(findings) => findings,
                Err(e) => {
                    warn!(rule = rule.name(), error = %e, "Rule failed, skipping");
                    skipped_rules.push(rule.name().to_string());
                    continue;
                }
            };

            debug!(rule = rule.name(), count = findings.len(), "Rule evaluated");
            penalty_total = penalty_total
                .saturating_add(rule.penalty().saturating_mul(findings.len() as u32));
            violations.extend(to_violations(rule.as_ref(), findings));
        }

        violations.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.rule_name.cmp(&b.rule_name))
                .then_with(|| a.entity_id.cmp(&b.entity_id))
                .then_with(|| a.id.cmp(&b.id))
        });

        let summary = summarize(&violations);
        RulesResult {
            violations,
            summary,
            score: MAX_SCORE.saturating_sub(penalty_total),
            skipped_rules,
        }
    }
}

/// Run one rule, turning both errors and panics into a rule evaluation error
fn evaluate(rule: &dyn Rule, ctx: &RuleContext<'_>) -> crate::types::Result<Vec<Finding>> {
    match catch_unwind(AssertUnwindSafe(|| rule.check(ctx))) {
        Ok(Ok(findings)) => Ok(findings),
        Ok(Err(e)) => Err(EvidocError::rule(rule.name(), e.to_string())),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "rule panicked".to_string());
            Err(EvidocError::rule(rule.name(), message))
        }
    }
}

/// Ids are `rule:entity`, with `#n` appended for repeated findings on one entity
fn to_violations(rule: &dyn Rule, findings: Vec<Finding>) -> Vec<RuleViolation> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    findings
        .into_iter()
        .map(|finding| {
            let base = format!("{}:{}", rule.name(), finding.entity_id);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            let id = if *count == 1 {
                base
            } else {
                format!("{}#{}", base, count)
            };
            RuleViolation {
                id,
                rule_name: rule.name().to_string(),
                severity: rule.severity(),
                message: finding.message,
                entity_id: finding.entity_id,
                entity_type: finding.entity_type,
                suggestion: finding.suggestion,
            }
        })
        .collect()
}

fn summarize(violations: &[RuleViolation]) -> RulesSummary {
    let mut summary = RulesSummary::default();
    for v in violations {
        match v.severity {
            Severity::Error => summary.errors += 1,
            Severity::Warning => summary.warnings += 1,
            Severity::Info => summary.info += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiEndpoint, EntityType, HttpMethod, RouteFramework};
    use proptest::prelude::*;

    fn api(path: &str, documented: bool) -> ApiEndpoint {
        ApiEndpoint {
            id: format!("api:GET {}@api/users.js:1", path),
            method: HttpMethod::Get,
            path: path.to_string(),
            controller: Some("users".into()),
            roles: Vec::new(),
            file_path: "api/users.js".into(),
            line: 1,
            framework: RouteFramework::Express,
            documented,
            documents_errors: false,
            authenticated: false,
        }
    }

    struct Failing;

    impl Rule for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn severity(&self) -> Severity {
            Severity::Error
        }
        fn check(&self, _ctx: &RuleContext<'_>) -> crate::types::Result<Vec<Finding>> {
            Err(EvidocError::rule("failing", "boom"))
        }
    }

    struct Panicking;

    impl Rule for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }
        fn severity(&self) -> Severity {
            Severity::Error
        }
        fn check(&self, _ctx: &RuleContext<'_>) -> crate::types::Result<Vec<Finding>> {
            panic!("index out of bounds")
        }
    }

    struct EveryApi;

    impl Rule for EveryApi {
        fn name(&self) -> &'static str {
            "every-api"
        }
        fn severity(&self) -> Severity {
            Severity::Warning
        }
        fn check(&self, ctx: &RuleContext<'_>) -> crate::types::Result<Vec<Finding>> {
            Ok(ctx
                .analysis
                .apis
                .iter()
                .map(|a| Finding::new(a.id.clone(), EntityType::Api, "seen"))
                .collect())
        }
    }

    #[test]
    fn test_empty_analysis_has_no_violations() {
        let result = RulesEngine::new().validate(&AnalysisResult::default(), None);
        assert!(result.violations.is_empty());
        assert_eq!(result.summary, RulesSummary::default());
        assert_eq!(result.score, MAX_SCORE);
    }

    #[test]
    fn test_two_undocumented_endpoints_two_warnings() {
        let analysis = AnalysisResult {
            apis: vec![api("/users", false), api("/users/:id", false)],
            ..Default::default()
        };
        let result = RulesEngine::new().validate(&analysis, None);
        assert_eq!(result.summary.warnings, 2);
        assert_eq!(result.summary.errors, 0);
        assert!(result
            .violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
            .all(|v| v.rule_name == "api-endpoint-documented"));
    }

    #[test]
    fn test_failing_rules_are_skipped() {
        let analysis = AnalysisResult {
            apis: vec![api("/a", false)],
            ..Default::default()
        };
        let engine = RulesEngine::with_rules(vec![
            Box::new(Failing),
            Box::new(Panicking),
            Box::new(EveryApi),
        ]);
        let result = engine.validate(&analysis, None);
        assert_eq!(result.skipped_rules, vec!["failing", "panicking"]);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].rule_name, "every-api");
    }

    #[test]
    fn test_doc_rules_and_score() {
        let doc = "# Tool\n## Overview\n## Installation\n#### Deep\n![](a.png)";
        let result = RulesEngine::new().validate(&AnalysisResult::default(), Some(doc));
        // Usage + Troubleshooting missing (2 x 15), H2 -> H4 jump (10), image (5)
        assert_eq!(result.summary.errors, 2);
        assert_eq!(result.summary.warnings, 2);
        assert_eq!(result.score, 100 - 30 - 10 - 5);
        assert!(result.violations.iter().all(|v| v.entity_id == "doc:README"));
    }

    #[test]
    fn test_repeated_findings_get_distinct_ids() {
        let doc = "# A\n### B\n# C\n### D\n## Overview\n## Install\n## Usage\n## FAQ";
        let result = RulesEngine::new().validate(&AnalysisResult::default(), Some(doc));
        let ids: Vec<&str> = result
            .violations
            .iter()
            .filter(|v| v.rule_name == "doc-heading-sequence")
            .map(|v| v.id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["doc-heading-sequence:doc:README", "doc-heading-sequence:doc:README#2"]
        );
    }

    #[test]
    fn test_score_floors_at_zero() {
        let apis: Vec<ApiEndpoint> = (0..40).map(|i| api(&format!("/r{}", i), false)).collect();
        let analysis = AnalysisResult {
            apis,
            ..Default::default()
        };
        assert_eq!(RulesEngine::new().validate(&analysis, None).score, 0);
    }

    proptest! {
        #[test]
        fn prop_validation_is_pure(flags in proptest::collection::vec(any::<bool>(), 0..12), doc in proptest::option::of("[#a-z \n]{0,60}")) {
            let apis: Vec<ApiEndpoint> = flags
                .iter()
                .enumerate()
                .map(|(i, documented)| api(&format!("/p{}", i), *documented))
                .collect();
            let undocumented = flags.iter().filter(|d| !**d).count();
            let analysis = AnalysisResult { apis, ..Default::default() };

            let engine = RulesEngine::new();
            let first = engine.validate(&analysis, doc.as_deref());
            let second = engine.validate(&analysis, doc.as_deref());
            prop_assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );

            let api_warnings = first
                .violations
                .iter()
                .filter(|v| v.rule_name == "api-endpoint-documented")
                .count();
            prop_assert_eq!(api_warnings, undocumented);
        }
    }
}
