use serde::{Deserialize, Serialize};

use super::entity::EntityType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleViolation {
    pub id: String,
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
    pub entity_id: String,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesSummary {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl RulesSummary {
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.info
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesResult {
    pub violations: Vec<RuleViolation>,
    pub summary: RulesSummary,
    /// 100 minus the penalties of all violations, floored at zero
    pub score: u32,
    /// Rules that failed internally and were left out of this result
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_rules: Vec<String>,
}

impl RulesResult {
    pub fn for_entity<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a RuleViolation> {
        self.violations.iter().filter(move |v| v.entity_id == entity_id)
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}
