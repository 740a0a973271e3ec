//! Repository Analysis
//!
//! Everything that turns a repository checkout into facts:
//! - Snapshot loading (gitignore-aware walk with size limits)
//! - Tree-sitter parsing and the per-run source index
//! - Evidence extraction from manifests and layout
//! - Entity graph construction (services, APIs, roles, files)

pub mod classification;
pub mod evidence;
pub mod graph;
pub mod history;
pub mod parser;
pub mod scanner;
pub mod source_index;

pub use evidence::EvidenceExtractor;
pub use graph::EntityGraphBuilder;
pub use history::ChangeHistory;
pub use scanner::RepoSnapshot;
pub use source_index::SourceIndex;
