//! Validate Command
//!
//! Run extraction, graph building and rule validation without persisting a job.

use std::path::{Path, PathBuf};

use crate::cli::util::{parse_format, resolve_repo};
use crate::config::ConfigLoader;
use crate::coordinator::validate_only;
use crate::rules::Reporter;
use crate::types::{EvidocError, Result};

pub fn run(repo: &Path, doc: Option<PathBuf>, format: &str, report: Option<PathBuf>) -> Result<()> {
    let json_output = parse_format(format)?;
    let repo = resolve_repo(repo)?;
    let config = ConfigLoader::load()?;

    let doc_content = doc.map(std::fs::read_to_string).transpose()?;
    let result = validate_only(&repo, &config.analysis, doc_content.as_deref())?;

    if json_output {
        println!("{}", Reporter::to_json(&result)?);
    } else {
        Reporter::print_summary(&result);
    }

    if let Some(report) = report {
        if let Some(parent) = report.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Reporter::generate_json(&result, &report)?;
        if !json_output {
            println!();
            println!("Report saved to: {}", report.display());
        }
    }

    if result.has_errors() {
        return Err(EvidocError::rule(
            "validate",
            format!("{} documentation error(s) found", result.summary.errors),
        ));
    }
    Ok(())
}
