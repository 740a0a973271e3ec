//! Config Command
//!
//! Manage evidoc configuration.
//!
//! Usage:
//!   evidoc config show [-f json]
//!   evidoc config path
//!   evidoc config init [--force]

use console::style;

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the effective (merged) configuration
pub fn show(format: &str) -> Result<()> {
    let config = ConfigLoader::load()?;
    println!("{}", ConfigLoader::render(&config, format == "json")?);
    Ok(())
}

/// Show configuration file locations
pub fn path() -> Result<()> {
    let root = std::env::current_dir()?;
    for (label, path, exists) in ConfigLoader::describe_paths(&root) {
        let marker = if exists {
            style("exists").green()
        } else {
            style("not found").dim()
        };
        match path {
            Some(path) => println!("{:<8} {} ({})", label, path.display(), marker),
            None => println!("{:<8} unavailable", label),
        }
    }
    println!("{:<8} EVIDOC_* (e.g. EVIDOC_GENERATION__LOCK_WINDOW_SECS)", "Env");
    Ok(())
}

/// Write a default project configuration
pub fn init(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let path = ConfigLoader::init_project(&root, force)?;
    Output::new().success("Initialized project configuration");
    println!("  Config: {}", path.display());
    Ok(())
}
