//! Status Command
//!
//! Read the persisted job record for a repository.

use chrono::Utc;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, parse_format};
use crate::types::{JobStatus, Result};

pub fn run(repository_id: Option<&str>, format: &str) -> Result<()> {
    let json_output = parse_format(format)?;
    let ctx = CommandContext::load()?;
    let out = Output::new();

    let Some(repository_id) = repository_id else {
        let jobs = ctx.store.list()?;
        if json_output {
            println!("{}", serde_json::to_string_pretty(&jobs)?);
        } else if jobs.is_empty() {
            out.info("No generation jobs recorded yet. Run 'evidoc generate <repo>' first.");
        } else {
            out.header("Generation Jobs");
            for job in &jobs {
                println!(
                    "  {:<24} {:<11} {:>3}%  {}",
                    job.repository_id,
                    job.status.as_str(),
                    job.progress,
                    job.updated_at.to_rfc3339()
                );
            }
        }
        return Ok(());
    };

    match ctx.store.get(repository_id)? {
        Some(job) if json_output => println!("{}", serde_json::to_string_pretty(&job)?),
        Some(job) => {
            out.job(&job);
            let window = ctx.config.generation.lock_window();
            if job.status == JobStatus::Generating && !job.holds_lock(Utc::now(), window) {
                out.warning("Lock window expired: this run is treated as abandoned and the next trigger starts fresh");
            }
        }
        None if json_output => println!(
            "{}",
            serde_json::json!({ "repositoryId": repository_id, "status": "idle" })
        ),
        None => out.info(&format!("{} is idle (no generation recorded)", repository_id)),
    }
    Ok(())
}
