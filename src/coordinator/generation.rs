//! Generation Coordinator
//!
//! Owns the per-repository job lifecycle:
//!
//! ```text
//! trigger ──► try_start (conditional upsert) ──► Conflict
//!                 │
//!                 ▼
//!          detached worker ──► pipeline ──► complete / fail
//! ```
//!
//! The caller gets its answer as soon as the start is persisted. The worker
//! only talks to the job store, always under the run id it was started with.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::clock::{SharedClock, SystemClock};
use super::pipeline::{Pipeline, PipelineOutput, ProgressFn, RepoSource, analyze};
use crate::ai::SharedEnhancer;
use crate::analyzer::{ChangeHistory, RepoSnapshot};
use crate::config::{AnalysisConfig, Config};
use crate::rules::RulesEngine;
use crate::storage::{Completion, SharedJobStore, StartResult};
use crate::types::{
    EvidocError, GenerationJob, PipelineStep, Result, RulesResult, TriggerOutcome,
};

pub struct GenerationCoordinator {
    store: SharedJobStore,
    clock: SharedClock,
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
    lock_window: chrono::Duration,
}

impl GenerationCoordinator {
    /// `enhancer` is ignored unless `generation.enhance` is set
    pub fn new(config: &Config, store: SharedJobStore, enhancer: Option<SharedEnhancer>) -> Self {
        let enhancer = if config.generation.enhance {
            enhancer
        } else {
            None
        };
        Self {
            store,
            clock: Arc::new(SystemClock),
            pipeline: Arc::new(Pipeline::new(config.analysis.clone(), enhancer)),
            permits: Arc::new(Semaphore::new(config.generation.max_concurrent_jobs.max(1))),
            lock_window: config.generation.lock_window(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Acknowledge a generation request and run the pipeline detached.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self, repository_id: &str, source: RepoSource) -> Result<TriggerOutcome> {
        self.spawn(repository_id, source).map(|(outcome, _)| outcome)
    }

    /// Like [`trigger`](Self::trigger), also returning the worker handle
    pub fn spawn(
        &self,
        repository_id: &str,
        source: RepoSource,
    ) -> Result<(TriggerOutcome, Option<JoinHandle<()>>)> {
        let now = self.clock.now();
        let source_path = source.path();

        let job = match self.store.try_start(
            repository_id,
            source_path.as_deref(),
            now,
            self.lock_window,
        )? {
            StartResult::Started(job) => job,
            StartResult::Busy(job) => {
                let elapsed = now - job.generation_started_at;
                let retry_after_secs = (self.lock_window - elapsed).num_seconds().max(1);
                info!(
                    repository_id,
                    run_id = %job.run_id,
                    retry_after_secs,
                    "Generation already in progress, rejecting trigger"
                );
                return Ok((
                    TriggerOutcome::Conflict {
                        repository_id: repository_id.to_string(),
                        started_at: job.generation_started_at,
                        retry_after_secs,
                    },
                    None,
                ));
            }
        };

        info!(repository_id, run_id = %job.run_id, "Generation started");

        let worker = Worker {
            store: self.store.clone(),
            clock: self.clock.clone(),
            pipeline: self.pipeline.clone(),
            repository_id: repository_id.to_string(),
            run_id: job.run_id.clone(),
        };
        let permits = self.permits.clone();
        let handle = tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    worker.finish(Err(EvidocError::generation(
                        PipelineStep::Queued.as_str(),
                        format!("worker pool closed: {}", e),
                    )));
                    return;
                }
            };
            worker.run(source).await;
        });

        Ok((
            TriggerOutcome::Generating {
                repository_id: repository_id.to_string(),
                run_id: job.run_id,
            },
            Some(handle),
        ))
    }

    pub fn status(&self, repository_id: &str) -> Result<Option<GenerationJob>> {
        self.store.get(repository_id)
    }

    pub fn jobs(&self) -> Result<Vec<GenerationJob>> {
        self.store.list()
    }

}

/// Synchronous rule validation of a checkout; nothing is persisted.
pub fn validate_only(
    repo_path: &Path,
    config: &AnalysisConfig,
    doc: Option<&str>,
) -> Result<RulesResult> {
    let snapshot = RepoSnapshot::load(repo_path, config)?;
    let history = ChangeHistory::load(repo_path)?;
    let analyzed = analyze(&snapshot, &history, &RulesEngine::new(), doc, &|_| Ok(()))?;
    Ok(analyzed.rules)
}

/// Everything a detached run needs
struct Worker {
    store: SharedJobStore,
    clock: SharedClock,
    pipeline: Arc<Pipeline>,
    repository_id: String,
    run_id: String,
}

impl Worker {
    async fn run(&self, source: RepoSource) {
        let progress = self.progress_fn();
        let result = AssertUnwindSafe(self.pipeline.run(source, progress))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(EvidocError::generation("pipeline", format!("panicked: {}", message)))
            });
        self.finish(result);
    }

    /// Record each step; stop once the run no longer owns the record
    fn progress_fn(&self) -> ProgressFn {
        let store = self.store.clone();
        let clock = self.clock.clone();
        let repository_id = self.repository_id.clone();
        let run_id = self.run_id.clone();
        Arc::new(move |step: PipelineStep| {
            debug!(repository_id = %repository_id, run_id = %run_id, step = step.as_str(), "Pipeline step");
            if store.update_progress(&repository_id, &run_id, step, clock.now())? {
                Ok(())
            } else {
                Err(EvidocError::generation(step.as_str(), "run superseded"))
            }
        })
    }

    fn finish(&self, result: Result<PipelineOutput>) {
        let now = self.clock.now();
        let repository_id = self.repository_id.as_str();
        let run_id = self.run_id.as_str();

        let written = match &result {
            Ok(output) => self.store.complete(
                repository_id,
                run_id,
                &Completion {
                    documents: &output.documents,
                    version: &output.version,
                    enhancement: &output.enhancement,
                },
                now,
            ),
            Err(e) => self.store.fail(repository_id, run_id, &e.to_string(), now),
        };

        match (&result, written) {
            (Ok(output), Ok(true)) => info!(
                repository_id,
                run_id,
                version = %output.version,
                score = output.rules.score,
                "Generation completed"
            ),
            (Err(e), Ok(true)) => error!(
                repository_id,
                run_id,
                kind = %e.kind(),
                error = %e,
                "Generation failed"
            ),
            (_, Ok(false)) => warn!(repository_id, run_id, "Run superseded, result discarded"),
            (_, Err(e)) => error!(
                repository_id,
                run_id,
                error = %e,
                "Failed to persist generation result"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::enhancer::tests::FakeEnhancer;
    use crate::coordinator::clock::ManualClock;
    use crate::storage::{Database, JobStore, SqliteJobStore};
    use crate::types::{EnhancementStatus, JobStatus};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    const USERS_API: &str = "\
const router = require('express').Router();
router.get('/users', listUsers);
router.get('/users/:id', getUser);
module.exports = router;
";

    fn store() -> Arc<SqliteJobStore> {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        Arc::new(SqliteJobStore::new(Arc::new(db)))
    }

    fn repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name":"orders","description":"Order API"}"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("api")).unwrap();
        std::fs::write(dir.path().join("api/users.js"), USERS_API).unwrap();
        dir
    }

    fn build_coordinator(
        store: Arc<SqliteJobStore>,
        clock: Arc<ManualClock>,
        config: &Config,
        enhancer: Option<SharedEnhancer>,
    ) -> GenerationCoordinator {
        GenerationCoordinator::new(config, store, enhancer).with_clock(clock)
    }

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_trigger_within_window_conflicts_and_after_window_restarts() {
        let dir = repo();
        let store = store();
        let clock = Arc::new(ManualClock::new(t0()));
        let coordinator = build_coordinator(store.clone(), clock.clone(), &Config::default(), None);
        let source = || RepoSource::Path(dir.path().to_path_buf());

        let (first, first_handle) = coordinator.spawn("R", source()).unwrap();
        let TriggerOutcome::Generating { run_id: first_run, .. } = first else {
            panic!("expected generating, got {:?}", first);
        };
        // The record is already `generating` before the worker runs
        let record = store.get("R").unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Generating);
        assert_eq!(record.progress, 0);

        clock.advance(Duration::minutes(2));
        let (second, second_handle) = coordinator.spawn("R", source()).unwrap();
        assert!(second_handle.is_none());
        match second {
            TriggerOutcome::Conflict {
                started_at,
                retry_after_secs,
                ..
            } => {
                assert_eq!(started_at, t0());
                assert_eq!(retry_after_secs, 180);
            }
            other => panic!("expected conflict, got {:?}", other),
        }

        clock.advance(Duration::minutes(4));
        let (third, third_handle) = coordinator.spawn("R", source()).unwrap();
        let TriggerOutcome::Generating { run_id: third_run, .. } = third else {
            panic!("expected generating, got {:?}", third);
        };
        assert_ne!(first_run, third_run);

        first_handle.unwrap().await.unwrap();
        third_handle.unwrap().await.unwrap();

        let record = store.get("R").unwrap().unwrap();
        assert_eq!(record.run_id, third_run);
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.generation_started_at, t0() + Duration::minutes(6));
        assert!(record.readme.as_deref().unwrap().starts_with("# orders"));
        assert!(record.api_docs.as_deref().unwrap().contains("## GET /users"));
        assert_eq!(record.version.as_deref().map(str::len), Some(64));
        assert_eq!(record.enhancement, Some(EnhancementStatus::Disabled));
    }

    #[tokio::test]
    async fn test_missing_repository_fails_job() {
        let store = store();
        let clock = Arc::new(ManualClock::new(t0()));
        let coordinator = build_coordinator(store.clone(), clock.clone(), &Config::default(), None);

        let (outcome, handle) = coordinator
            .spawn("gone", RepoSource::Path("/no/such/checkout".into()))
            .unwrap();
        assert!(!outcome.is_conflict());
        handle.unwrap().await.unwrap();

        let record = coordinator.status("gone").unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.error_message.unwrap().contains("/no/such/checkout"));

        // A failed record does not hold the lock
        let (retry, _) = coordinator
            .spawn("gone", RepoSource::Path("/no/such/checkout".into()))
            .unwrap();
        assert!(!retry.is_conflict());
    }

    #[tokio::test]
    async fn test_independent_repositories_do_not_conflict() {
        let dir = repo();
        let store = store();
        let clock = Arc::new(ManualClock::new(t0()));
        let coordinator = build_coordinator(store.clone(), clock, &Config::default(), None);

        let (a, ha) = coordinator.spawn("A", RepoSource::Path(dir.path().into())).unwrap();
        let (b, hb) = coordinator.spawn("B", RepoSource::Path(dir.path().into())).unwrap();
        assert!(!a.is_conflict());
        assert!(!b.is_conflict());
        ha.unwrap().await.unwrap();
        hb.unwrap().await.unwrap();

        let jobs = coordinator.jobs().unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.status == JobStatus::Completed));
        assert_eq!(jobs[0].version, jobs[1].version);
    }

    #[tokio::test]
    async fn test_enhancer_only_used_when_enabled() {
        let dir = repo();
        let mut config = Config::default();
        config.generation.enhance = true;
        let store = store();
        let clock = Arc::new(ManualClock::new(t0()));
        let enhancer: SharedEnhancer = Arc::new(FakeEnhancer::new(true, false));
        let coordinator = build_coordinator(store.clone(), clock, &config, Some(enhancer));

        let (_, handle) = coordinator.spawn("R", RepoSource::Path(dir.path().into())).unwrap();
        handle.unwrap().await.unwrap();

        let record = store.get("R").unwrap().unwrap();
        assert!(matches!(
            record.enhancement,
            Some(EnhancementStatus::Applied { suggestions }) if suggestions > 0
        ));
        assert!(record.api_docs.unwrap().contains("AI suggestion"));

        let disabled = build_coordinator(
            store.clone(),
            Arc::new(ManualClock::new(t0())),
            &Config::default(),
            Some(Arc::new(FakeEnhancer::new(true, false)) as SharedEnhancer),
        );
        let (_, handle) = disabled.spawn("S", RepoSource::Path(dir.path().into())).unwrap();
        handle.unwrap().await.unwrap();
        assert_eq!(
            store.get("S").unwrap().unwrap().enhancement,
            Some(EnhancementStatus::Disabled)
        );
    }

    #[test]
    fn test_validate_only_two_undocumented_routes() {
        let dir = repo();
        let result = validate_only(dir.path(), &AnalysisConfig::default(), None).unwrap();
        assert_eq!(result.summary.warnings, 2);
        assert!(result.violations.iter().any(|v| v.rule_name == "api-endpoint-documented"));
    }

    #[test]
    fn test_validate_only_empty_repository() {
        let dir = TempDir::new().unwrap();
        let result = validate_only(dir.path(), &AnalysisConfig::default(), None).unwrap();
        assert!(result.violations.is_empty());
        assert_eq!(result.score, 100);
    }
}
