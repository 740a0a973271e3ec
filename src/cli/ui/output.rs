use console::style;

use crate::types::{EnhancementStatus, GenerationJob, JobStatus};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Human-readable job record
    pub fn job(&self, job: &GenerationJob) {
        let status = match job.status {
            JobStatus::Generating => style(job.status.as_str()).cyan(),
            JobStatus::Completed => style(job.status.as_str()).green(),
            JobStatus::Failed => style(job.status.as_str()).red(),
        };

        self.header(&format!("Repository {}", job.repository_id));
        println!("  Status:   {} ({}%)", status, job.progress);
        if let Some(step) = &job.current_step {
            println!("  Step:     {}", step);
        }
        println!("  Run:      {}", style(&job.run_id).dim());
        if let Some(path) = &job.source_path {
            println!("  Source:   {}", path);
        }
        println!("  Started:  {}", job.generation_started_at.to_rfc3339());
        println!("  Updated:  {}", job.updated_at.to_rfc3339());
        if let Some(version) = &job.version {
            println!("  Version:  {}", &version[..version.len().min(12)]);
        }
        match &job.enhancement {
            Some(EnhancementStatus::Applied { suggestions }) => {
                println!("  AI:       {} suggestion(s)", suggestions)
            }
            Some(EnhancementStatus::Skipped { reason }) => println!("  AI:       skipped ({})", reason),
            Some(EnhancementStatus::Disabled) | None => {}
        }
        if let Some(error) = &job.error_message {
            self.error(error);
        }

        if let Some(docs) = job.documents() {
            self.section("Documents");
            for (name, content) in [
                ("README", &docs.readme),
                ("API", &docs.api_docs),
                ("SETUP", &docs.setup_guide),
                ("ARCHITECTURE", &docs.architecture),
            ] {
                println!("  {:<13} {} lines", name, content.lines().count());
            }
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
