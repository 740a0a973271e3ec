//! Generation Pipeline
//!
//! snapshot -> evidence -> source index -> entity graph -> rules ->
//! optional enhancement -> synthesis -> version stamp.
//!
//! The deterministic part ([`analyze`]) is shared with validate-only
//! requests. Gaps in extraction, parsing or rule evaluation degrade into
//! Missing claims and skipped entries; only loading the repository or an
//! unexpected failure aborts the run.

use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::ai::{SharedEnhancer, enhance};
use crate::analyzer::{ChangeHistory, EntityGraphBuilder, EvidenceExtractor, RepoSnapshot, SourceIndex};
use crate::config::AnalysisConfig;
use crate::docs::DocumentSynthesizer;
use crate::rules::RulesEngine;
use crate::types::{
    AnalysisResult, DocumentSet, EnhancementStatus, EvidocError, PipelineStep, RepoEvidence,
    Result, RulesResult,
};

/// README candidates checked for document structure rules
const README_FILES: &[&str] = &["README.md", "readme.md", "Readme.md", "README.markdown", "README"];

/// Reports step starts; an error stops the run
pub type ProgressFn = Arc<dyn Fn(PipelineStep) -> Result<()> + Send + Sync>;

/// Where the pipeline reads the repository from
#[derive(Debug, Clone)]
pub enum RepoSource {
    /// Local checkout; change history is read with `git log` when available
    Path(PathBuf),
    /// Already loaded snapshot
    Snapshot(Arc<RepoSnapshot>),
}

impl RepoSource {
    pub fn path(&self) -> Option<String> {
        match self {
            Self::Path(path) => Some(path.display().to_string()),
            Self::Snapshot(_) => None,
        }
    }

    fn load(&self, config: &AnalysisConfig) -> Result<(Arc<RepoSnapshot>, ChangeHistory)> {
        match self {
            Self::Path(path) => {
                let snapshot = RepoSnapshot::load(path, config)?;
                let history = ChangeHistory::load(path)?;
                Ok((Arc::new(snapshot), history))
            }
            Self::Snapshot(snapshot) => Ok((snapshot.clone(), ChangeHistory::default())),
        }
    }
}

/// Deterministic analysis of one snapshot
#[derive(Debug, Clone)]
pub struct RepoAnalysis {
    pub evidence: RepoEvidence,
    pub analysis: AnalysisResult,
    pub rules: RulesResult,
}

/// Run extraction, graph building and rule validation.
///
/// `doc` overrides the README found in the snapshot for document rules.
pub fn analyze(
    snapshot: &RepoSnapshot,
    history: &ChangeHistory,
    rules: &RulesEngine,
    doc: Option<&str>,
    progress: &dyn Fn(PipelineStep) -> Result<()>,
) -> Result<RepoAnalysis> {
    progress(PipelineStep::ExtractingEvidence)?;
    let evidence = EvidenceExtractor::new().extract(snapshot);

    progress(PipelineStep::IndexingSources)?;
    let mut index = SourceIndex::new();
    index.add_source_files(snapshot.source_files());

    progress(PipelineStep::BuildingGraph)?;
    let analysis = EntityGraphBuilder::new().analyze_with_history(&index, &evidence, history);

    progress(PipelineStep::ValidatingRules)?;
    let doc = doc.or_else(|| README_FILES.iter().find_map(|f| snapshot.content(f)));
    let rules = rules.validate(&analysis, doc);

    info!(
        files = snapshot.len(),
        entities = analysis.entities.len(),
        apis = analysis.apis.len(),
        violations = rules.violations.len(),
        score = rules.score,
        "Repository analyzed"
    );
    Ok(RepoAnalysis {
        evidence,
        analysis,
        rules,
    })
}

/// SHA-256 over the serialized analysis and evidence
pub fn fingerprint(analysis: &AnalysisResult, evidence: &RepoEvidence) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(analysis)?);
    hasher.update(serde_json::to_vec(evidence)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Result of a successful pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub documents: DocumentSet,
    pub rules: RulesResult,
    pub version: String,
    pub enhancement: EnhancementStatus,
}

pub struct Pipeline {
    analysis_config: AnalysisConfig,
    rules: Arc<RulesEngine>,
    enhancer: Option<SharedEnhancer>,
}

impl Pipeline {
    pub fn new(analysis_config: AnalysisConfig, enhancer: Option<SharedEnhancer>) -> Self {
        Self {
            analysis_config,
            rules: Arc::new(RulesEngine::new()),
            enhancer,
        }
    }

    pub async fn run(&self, source: RepoSource, progress: ProgressFn) -> Result<PipelineOutput> {
        let config = self.analysis_config.clone();
        let rules = self.rules.clone();
        let blocking_progress = progress.clone();

        // Parsing is CPU-bound; keep it off the async workers
        let analyzed = tokio::task::spawn_blocking(move || {
            let (snapshot, history) = source.load(&config)?;
            analyze(&snapshot, &history, &rules, None, blocking_progress.as_ref())
        })
        .await
        .map_err(|e| EvidocError::generation(PipelineStep::BuildingGraph.as_str(), e.to_string()))??;

        progress(PipelineStep::Enhancing)?;
        let (fixes, enhancement) = match &self.enhancer {
            Some(enhancer) => enhance(enhancer.as_ref(), &analyzed.rules.violations).await,
            None => (Vec::new(), EnhancementStatus::Disabled),
        };

        progress(PipelineStep::Synthesizing)?;
        let fixes = (!fixes.is_empty()).then_some(fixes.as_slice());
        let documents = DocumentSynthesizer::new()
            .with_analysis(&analyzed.analysis)
            .synthesize(&analyzed.evidence, Some(&analyzed.rules), fixes);

        progress(PipelineStep::Finalizing)?;
        let version = fingerprint(&analyzed.analysis, &analyzed.evidence)?;

        Ok(PipelineOutput {
            documents,
            rules: analyzed.rules,
            version,
            enhancement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::enhancer::tests::FakeEnhancer;
    use std::sync::Mutex;

    fn snapshot() -> RepoSnapshot {
        RepoSnapshot::from_files([
            (
                "package.json",
                r#"{"name":"orders","description":"Order API","dependencies":{"express":"^4"}}"#,
            ),
            (
                "src/api/users.js",
                "const router = require('express').Router();\n\
                 router.get('/users', listUsers);\n\
                 router.get('/users/:id', getUser);\n",
            ),
        ])
    }

    fn no_progress() -> ProgressFn {
        Arc::new(|_| Ok(()))
    }

    #[test]
    fn test_analyze_reports_steps_in_order() {
        let steps = Mutex::new(Vec::new());
        let record = |step: PipelineStep| -> Result<()> {
            steps.lock().unwrap().push(step);
            Ok(())
        };
        let result = analyze(
            &snapshot(),
            &ChangeHistory::default(),
            &RulesEngine::new(),
            None,
            &record,
        )
        .unwrap();

        assert_eq!(
            *steps.lock().unwrap(),
            vec![
                PipelineStep::ExtractingEvidence,
                PipelineStep::IndexingSources,
                PipelineStep::BuildingGraph,
                PipelineStep::ValidatingRules,
            ]
        );
        assert_eq!(result.analysis.apis.len(), 2);
        assert_eq!(result.rules.summary.warnings, 2);
    }

    #[test]
    fn test_progress_error_stops_analysis() {
        let stop = |step: PipelineStep| -> Result<()> {
            if step == PipelineStep::BuildingGraph {
                Err(EvidocError::generation(step.as_str(), "superseded"))
            } else {
                Ok(())
            }
        };
        let result = analyze(&snapshot(), &ChangeHistory::default(), &RulesEngine::new(), None, &stop);
        assert!(result.is_err());
    }

    #[test]
    fn test_doc_override_feeds_document_rules() {
        let result = analyze(
            &snapshot(),
            &ChangeHistory::default(),
            &RulesEngine::new(),
            Some("# Title\n## Overview\n## Installation\n## Usage\n## FAQ\n"),
            &|_| Ok(()),
        )
        .unwrap();
        assert!(result.rules.violations.iter().all(|v| v.entity_id != "doc:README"));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = analyze(&snapshot(), &ChangeHistory::default(), &RulesEngine::new(), None, &|_| Ok(()))
            .unwrap();
        let b = analyze(&snapshot(), &ChangeHistory::default(), &RulesEngine::new(), None, &|_| Ok(()))
            .unwrap();
        let v1 = fingerprint(&a.analysis, &a.evidence).unwrap();
        assert_eq!(v1, fingerprint(&b.analysis, &b.evidence).unwrap());
        assert_eq!(v1.len(), 64);
        assert_ne!(
            v1,
            fingerprint(&AnalysisResult::default(), &RepoEvidence::default()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_run_without_enhancer() {
        let pipeline = Pipeline::new(AnalysisConfig::default(), None);
        let output = pipeline
            .run(RepoSource::Snapshot(Arc::new(snapshot())), no_progress())
            .await
            .unwrap();
        assert_eq!(output.enhancement, EnhancementStatus::Disabled);
        assert!(output.documents.readme.starts_with("# orders"));
        assert!(output.documents.api_docs.contains("## GET /users/:id"));
        assert!(!output.documents.api_docs.contains("AI suggestion"));
    }

    #[tokio::test]
    async fn test_run_with_failing_enhancer_keeps_documents() {
        let enhancer: SharedEnhancer = Arc::new(FakeEnhancer::new(true, true));
        let with_failure = Pipeline::new(AnalysisConfig::default(), Some(enhancer))
            .run(RepoSource::Snapshot(Arc::new(snapshot())), no_progress())
            .await
            .unwrap();
        let baseline = Pipeline::new(AnalysisConfig::default(), None)
            .run(RepoSource::Snapshot(Arc::new(snapshot())), no_progress())
            .await
            .unwrap();

        assert!(matches!(with_failure.enhancement, EnhancementStatus::Skipped { .. }));
        assert_eq!(with_failure.documents, baseline.documents);
        assert_eq!(with_failure.version, baseline.version);
    }

    #[tokio::test]
    async fn test_run_with_enhancer_appends_fixes() {
        let enhancer: SharedEnhancer = Arc::new(FakeEnhancer::new(true, false));
        let output = Pipeline::new(AnalysisConfig::default(), Some(enhancer))
            .run(RepoSource::Snapshot(Arc::new(snapshot())), no_progress())
            .await
            .unwrap();
        assert!(matches!(output.enhancement, EnhancementStatus::Applied { suggestions } if suggestions > 0));
        assert!(output.documents.api_docs.contains("AI suggestion (enhancement"));
    }

    #[tokio::test]
    async fn test_missing_repository_fails() {
        let pipeline = Pipeline::new(AnalysisConfig::default(), None);
        let result = pipeline
            .run(RepoSource::Path(PathBuf::from("/definitely/not/a/repo")), no_progress())
            .await;
        assert!(matches!(result, Err(EvidocError::NotFound(_))));
    }
}
