use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Marker attached to every synthesized claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Backed directly by a non-empty evidence field
    Verified,
    /// Derived from evidence through a named heuristic
    Inferred,
    /// Absence detected; always paired with a remediation
    Missing,
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Verified => "Verified",
            Self::Inferred => "Inferred",
            Self::Missing => "Missing",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The four synthesized document sections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSet {
    pub readme: String,
    pub api_docs: String,
    pub setup_guide: String,
    pub architecture: String,
}

impl DocumentSet {
    /// Sections in a fixed order with their canonical keys
    pub fn sections(&self) -> [(&'static str, &str); 4] {
        [
            ("readme", self.readme.as_str()),
            ("apiDocs", self.api_docs.as_str()),
            ("setupGuide", self.setup_guide.as_str()),
            ("architecture", self.architecture.as_str()),
        ]
    }
}

/// AI-suggested replacement text for a rule violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixSuggestion {
    pub violation_id: String,
    pub original: String,
    pub suggested: String,
    pub confidence: f32,
}

/// Whether optional enhancement contributed to a document set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EnhancementStatus {
    Disabled,
    Applied { suggestions: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "Unknown output format '{}' (expected markdown, html or json)",
                other
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Html => write!(f, "html"),
            Self::Json => write!(f, "json"),
        }
    }
}
