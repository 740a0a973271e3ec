//! Evidence Command
//!
//! Print the evidence extracted from a checkout as JSON.

use std::path::Path;

use crate::analyzer::{EvidenceExtractor, RepoSnapshot};
use crate::cli::util::resolve_repo;
use crate::config::ConfigLoader;
use crate::types::Result;

pub fn run(repo: &Path) -> Result<()> {
    let repo = resolve_repo(repo)?;
    let config = ConfigLoader::load()?;
    let snapshot = RepoSnapshot::load(&repo, &config.analysis)?;
    let evidence = EvidenceExtractor::new().extract(&snapshot);
    println!("{}", serde_json::to_string_pretty(&evidence)?);
    Ok(())
}
