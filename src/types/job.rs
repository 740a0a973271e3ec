use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{DocumentSet, EnhancementStatus};

/// Persisted generation status.
///
/// A repository without a record is implicitly idle.
///
/// ```text
/// (idle) ──► Generating ──► Completed
///                 │
///                 └──────► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Generating,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "generating" => Some(Self::Generating),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage reported through `current_step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Queued,
    ExtractingEvidence,
    IndexingSources,
    BuildingGraph,
    ValidatingRules,
    Enhancing,
    Synthesizing,
    Finalizing,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::ExtractingEvidence => "extracting_evidence",
            Self::IndexingSources => "indexing_sources",
            Self::BuildingGraph => "building_graph",
            Self::ValidatingRules => "validating_rules",
            Self::Enhancing => "enhancing",
            Self::Synthesizing => "synthesizing",
            Self::Finalizing => "finalizing",
        }
    }

    /// Progress percentage recorded when the step starts
    pub fn progress(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::ExtractingEvidence => 10,
            Self::IndexingSources => 25,
            Self::BuildingGraph => 40,
            Self::ValidatingRules => 55,
            Self::Enhancing => 70,
            Self::Synthesizing => 80,
            Self::Finalizing => 95,
        }
    }
}

/// Per-repository singleton job record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub repository_id: String,
    /// Identifies the run that currently owns the record
    pub run_id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub current_step: Option<String>,
    pub error_message: Option<String>,
    pub source_path: Option<String>,
    pub generation_started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub readme: Option<String>,
    pub api_docs: Option<String>,
    pub setup_guide: Option<String>,
    pub architecture: Option<String>,
    /// Fingerprint of the analysis the stored documents were built from
    pub version: Option<String>,
    pub enhancement: Option<EnhancementStatus>,
}

impl GenerationJob {
    /// Whether a `generating` record still holds the lock at `now`
    pub fn holds_lock(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.status == JobStatus::Generating && now - self.generation_started_at < window
    }

    pub fn documents(&self) -> Option<DocumentSet> {
        Some(DocumentSet {
            readme: self.readme.clone()?,
            api_docs: self.api_docs.clone()?,
            setup_guide: self.setup_guide.clone()?,
            architecture: self.architecture.clone()?,
        })
    }
}

/// Immediate answer to a trigger request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TriggerOutcome {
    Generating {
        repository_id: String,
        run_id: String,
    },
    Conflict {
        repository_id: String,
        started_at: DateTime<Utc>,
        retry_after_secs: i64,
    },
}

impl TriggerOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
