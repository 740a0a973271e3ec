//! Generation Job Store
//!
//! Persists the per-repository job record. The `idle -> generating`
//! transition is a single conditional upsert, so two concurrent triggers can
//! never both acquire the lock. Every later write names the `run_id` it was
//! started with; a superseded run's writes match no row and are dropped.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use super::database::Database;
use crate::types::{
    DocumentSet, EnhancementStatus, GenerationJob, JobStatus, ParseWithDefault, PipelineStep,
    Result, ResultExt, log_filter_warn,
};

/// Outcome of a conditional start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartResult {
    /// The caller now owns the record under a fresh run id
    Started(GenerationJob),
    /// Another run holds the lock; the current record is returned
    Busy(GenerationJob),
}

/// Job record persistence.
///
/// All timestamps are supplied by the caller so lock-window decisions use a
/// single clock.
pub trait JobStore: Send + Sync {
    fn try_start(
        &self,
        repository_id: &str,
        source_path: Option<&str>,
        now: DateTime<Utc>,
        lock_window: Duration,
    ) -> Result<StartResult>;

    /// Returns `false` when `run_id` no longer owns the record
    fn update_progress(
        &self,
        repository_id: &str,
        run_id: &str,
        step: PipelineStep,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    fn complete(
        &self,
        repository_id: &str,
        run_id: &str,
        completion: &Completion<'_>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    fn fail(
        &self,
        repository_id: &str,
        run_id: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    fn get(&self, repository_id: &str) -> Result<Option<GenerationJob>>;

    fn list(&self) -> Result<Vec<GenerationJob>>;
}

pub type SharedJobStore = Arc<dyn JobStore>;

/// Terminal payload of a successful run
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    pub documents: &'a DocumentSet,
    pub version: &'a str,
    pub enhancement: &'a EnhancementStatus,
}

pub struct SqliteJobStore {
    db: Arc<Database>,
}

const JOB_COLUMNS: &str = "repository_id, run_id, status, progress, current_step, error_message, \
     source_path, generation_started_at, updated_at, readme, api_docs, setup_guide, architecture, \
     version, enhancement";

impl SqliteJobStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl JobStore for SqliteJobStore {
    fn try_start(
        &self,
        repository_id: &str,
        source_path: Option<&str>,
        now: DateTime<Utc>,
        lock_window: Duration,
    ) -> Result<StartResult> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let repository_id = repository_id.to_string();
        let source_path = source_path.map(str::to_string);
        let now_text = timestamp(now);
        let cutoff = timestamp(now - lock_window);

        self.db.transaction(move |conn| {
            let affected = conn
                .execute(
                    "INSERT INTO generation_jobs
                        (repository_id, run_id, status, progress, current_step, source_path,
                         generation_started_at, updated_at)
                     VALUES (?1, ?2, 'generating', 0, ?3, ?4, ?5, ?5)
                     ON CONFLICT(repository_id) DO UPDATE SET
                        run_id = excluded.run_id,
                        status = 'generating',
                        progress = 0,
                        current_step = excluded.current_step,
                        error_message = NULL,
                        source_path = COALESCE(excluded.source_path, generation_jobs.source_path),
                        generation_started_at = excluded.generation_started_at,
                        updated_at = excluded.updated_at
                     WHERE generation_jobs.status != 'generating'
                        OR generation_jobs.generation_started_at <= ?6",
                    params![
                        repository_id,
                        run_id,
                        PipelineStep::Queued.as_str(),
                        source_path,
                        now_text,
                        cutoff
                    ],
                )
                .with_context("Failed to start generation job")?;

            let job = load(conn, &repository_id)?.ok_or_else(|| {
                crate::types::EvidocError::NotFound(format!("job for {}", repository_id))
            })?;

            if affected == 0 {
                debug!(repository_id = %repository_id, "Generation lock held by another run");
                Ok(StartResult::Busy(job))
            } else {
                Ok(StartResult::Started(job))
            }
        })
    }

    fn update_progress(
        &self,
        repository_id: &str,
        run_id: &str,
        step: PipelineStep,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.db.connection()?;
        let affected = conn
            .execute(
                "UPDATE generation_jobs SET progress = ?3, current_step = ?4, updated_at = ?5
                 WHERE repository_id = ?1 AND run_id = ?2 AND status = 'generating'",
                params![
                    repository_id,
                    run_id,
                    step.progress(),
                    step.as_str(),
                    timestamp(now)
                ],
            )
            .with_context("Failed to update job progress")?;
        Ok(affected > 0)
    }

    fn complete(
        &self,
        repository_id: &str,
        run_id: &str,
        completion: &Completion<'_>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let enhancement = serde_json::to_string(completion.enhancement)?;
        let documents = completion.documents;
        let conn = self.db.connection()?;
        let affected = conn
            .execute(
                "UPDATE generation_jobs SET
                    status = 'completed', progress = 100, current_step = NULL, error_message = NULL,
                    readme = ?3, api_docs = ?4, setup_guide = ?5, architecture = ?6,
                    version = ?7, enhancement = ?8, updated_at = ?9
                 WHERE repository_id = ?1 AND run_id = ?2 AND status = 'generating'",
                params![
                    repository_id,
                    run_id,
                    documents.readme,
                    documents.api_docs,
                    documents.setup_guide,
                    documents.architecture,
                    completion.version,
                    enhancement,
                    timestamp(now)
                ],
            )
            .with_context("Failed to complete generation job")?;
        Ok(affected > 0)
    }

    fn fail(
        &self,
        repository_id: &str,
        run_id: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.db.connection()?;
        let affected = conn
            .execute(
                "UPDATE generation_jobs SET status = 'failed', error_message = ?3, updated_at = ?4
                 WHERE repository_id = ?1 AND run_id = ?2 AND status = 'generating'",
                params![repository_id, run_id, message, timestamp(now)],
            )
            .with_context("Failed to record job failure")?;
        Ok(affected > 0)
    }

    fn get(&self, repository_id: &str) -> Result<Option<GenerationJob>> {
        let conn = self.db.connection()?;
        load(&conn, repository_id)
    }

    fn list(&self) -> Result<Vec<GenerationJob>> {
        let conn = self.db.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM generation_jobs ORDER BY repository_id",
                JOB_COLUMNS
            ))
            .with_context("Failed to prepare job listing")?;
        let jobs = stmt
            .query_map([], map_job)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(jobs)
    }
}

fn load(conn: &Connection, repository_id: &str) -> Result<Option<GenerationJob>> {
    let job = conn
        .query_row(
            &format!(
                "SELECT {} FROM generation_jobs WHERE repository_id = ?1",
                JOB_COLUMNS
            ),
            params![repository_id],
            map_job,
        )
        .optional()?;
    Ok(job)
}

/// Fixed-width UTC text so SQL string comparison matches time order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_job(row: &Row<'_>) -> rusqlite::Result<GenerationJob> {
    let status: String = row.get(2)?;
    let progress: i64 = row.get(3)?;
    let started: String = row.get(7)?;
    let updated: String = row.get(8)?;
    let enhancement: Option<String> = row.get(14)?;

    Ok(GenerationJob {
        repository_id: row.get(0)?,
        run_id: row.get(1)?,
        status: JobStatus::parse_or_default(&status),
        progress: progress.clamp(0, 100) as u8,
        current_step: row.get(4)?,
        error_message: row.get(5)?,
        source_path: row.get(6)?,
        generation_started_at: parse_timestamp(7, &started)?,
        updated_at: parse_timestamp(8, &updated)?,
        readme: row.get(9)?,
        api_docs: row.get(10)?,
        setup_guide: row.get(11)?,
        architecture: row.get(12)?,
        version: row.get(13)?,
        enhancement: enhancement
            .and_then(|e| log_filter_warn(serde_json::from_str(&e), "Invalid enhancement status")),
    })
}
