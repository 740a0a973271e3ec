//! Generate Command
//!
//! Trigger documentation generation for a local checkout.
//!
//! Usage:
//!   evidoc generate <repo> [--id ID] [--wait] [--output DIR] [--format markdown|html|json]

use std::path::PathBuf;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::ai::create_enhancer;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, default_repository_id, resolve_repo};
use crate::constants::storage::PROJECT_DIR;
use crate::coordinator::{GenerationCoordinator, RepoSource};
use crate::docs::{format_documents, write_documents};
use crate::types::{EvidocError, GenerationJob, JobStatus, OutputFormat, Result, TriggerOutcome};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct GenerateOptions {
    pub repo: PathBuf,
    pub id: Option<String>,
    pub wait: bool,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
}

pub async fn run(options: GenerateOptions) -> Result<()> {
    let out = Output::new();
    let repo = resolve_repo(&options.repo)?;
    let repository_id = options
        .id
        .clone()
        .unwrap_or_else(|| default_repository_id(&repo));

    let ctx = CommandContext::load()?;
    let enhancer = create_enhancer(&ctx.config.ai)?;
    let coordinator = GenerationCoordinator::new(&ctx.config, ctx.store.clone(), enhancer);

    let (outcome, handle) = coordinator.spawn(&repository_id, RepoSource::Path(repo.clone()))?;
    let run_id = match outcome {
        TriggerOutcome::Generating { run_id, .. } => {
            out.success(&format!("generating {} (run {})", repository_id, run_id));
            run_id
        }
        TriggerOutcome::Conflict {
            started_at,
            retry_after_secs,
            ..
        } => {
            out.warning(&format!(
                "conflict: generation for {} started at {} is still running; retry in {}s",
                repository_id,
                started_at.to_rfc3339(),
                retry_after_secs
            ));
            return Err(EvidocError::LockContention { repository_id });
        }
    };

    if !options.wait {
        // The worker lives in this process; let it finish before exiting
        join_worker(handle).await?;
        out.info(&format!("Run `evidoc status {}` to see the result", repository_id));
        return Ok(());
    }

    let job = wait_for(&coordinator, &repository_id, &run_id, &out).await?;
    join_worker(handle).await?;

    match job.status {
        JobStatus::Completed => {
            let documents = job
                .documents()
                .ok_or_else(|| EvidocError::Storage("completed job has no documents".into()))?;
            let format = options.format.unwrap_or(ctx.config.generation.output_format);
            let dir = options
                .output
                .unwrap_or_else(|| PathBuf::from(PROJECT_DIR).join("docs").join(&repository_id));
            let written = write_documents(&dir, &format_documents(&documents, format)?)?;

            out.success(&format!("Generation completed for {}", repository_id));
            for path in written {
                println!("  {}", path.display());
            }
            Ok(())
        }
        JobStatus::Failed => Err(EvidocError::generation(
            job.current_step.unwrap_or_else(|| "unknown".into()),
            job.error_message.unwrap_or_default(),
        )),
        JobStatus::Generating => Err(EvidocError::Storage(format!(
            "run {} ended without a terminal status",
            run_id
        ))),
    }
}

/// Wait for the detached worker to exit
async fn join_worker(handle: Option<JoinHandle<()>>) -> Result<()> {
    let Some(handle) = handle else {
        return Ok(());
    };
    handle.await.map_err(|e| {
        warn!(error = %e, "Generation worker did not exit cleanly");
        EvidocError::generation("worker", e.to_string())
    })
}

/// Poll the job record until this run reaches a terminal state
async fn wait_for(
    coordinator: &GenerationCoordinator,
    repository_id: &str,
    run_id: &str,
    out: &Output,
) -> Result<GenerationJob> {
    let mut last_step: Option<String> = None;
    loop {
        let job = coordinator
            .status(repository_id)?
            .ok_or_else(|| EvidocError::NotFound(format!("job for {}", repository_id)))?;
        if job.run_id != run_id {
            return Err(EvidocError::generation(
                "waiting",
                format!("run {} was superseded by {}", run_id, job.run_id),
            ));
        }
        if job.current_step != last_step {
            if let Some(step) = &job.current_step {
                out.info(&format!("[{:>3}%] {}", job.progress, step));
            }
            last_step = job.current_step.clone();
        }
        if job.status.is_terminal() {
            return Ok(job);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_worker_without_handle() {
        assert!(join_worker(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_join_worker_reports_panicked_worker() {
        let handle = tokio::spawn(async {
            panic!("worker blew up");
        });
        let err = join_worker(Some(handle)).await.unwrap_err();
        assert!(matches!(err, EvidocError::GenerationFailed { ref step, .. } if step == "worker"));
    }
}
