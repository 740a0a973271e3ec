//! evidoc - Evidence-Based Repository Documentation
//!
//! Analyzes a repository snapshot and produces documentation in which every
//! statement is traceable to a concrete artifact, tagged Verified, Inferred
//! or Missing.
//!
//! ## Pipeline
//!
//! ```text
//! RepoSnapshot ──► EvidenceExtractor ──► RepoEvidence ─────────────┐
//!      │                                                           ▼
//!      └──► SourceIndex ──► EntityGraphBuilder ──► RulesEngine ──► DocumentSynthesizer
//!                                                       │               ▲
//!                                                       └──► Enhancer ──┘ (optional)
//! ```
//!
//! Generation runs detached under a per-repository time-based lock managed by
//! [`coordinator::GenerationCoordinator`]; callers observe it through the
//! persisted [`types::GenerationJob`] record.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use evidoc::{Config, Database, GenerationCoordinator, RepoSource, SqliteJobStore};
//!
//! let db = Database::open(".evidoc/jobs.db")?;
//! db.initialize()?;
//! let store = Arc::new(SqliteJobStore::new(Arc::new(db)));
//! let coordinator = GenerationCoordinator::new(&Config::default(), store, None);
//! let outcome = coordinator.trigger("orders", RepoSource::Path("./orders".into()))?;
//! ```
//!
//! ## Modules
//!
//! - [`analyzer`]: snapshot loading, tree-sitter parsing, evidence and entity graph
//! - [`rules`]: documentation rule catalog and engine
//! - [`docs`]: confidence-tagged document synthesis and output formats
//! - [`ai`]: optional fix-suggestion enhancer
//! - [`storage`]: SQLite job records with connection pooling
//! - [`coordinator`]: job lifecycle and the generation pipeline

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod docs;
pub mod rules;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::error::{ErrorKind, EvidocError, Result, ResultExt};

pub use storage::{Database, JobStore, PoolConfig, SharedDatabase, SqliteJobStore};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use analyzer::{EntityGraphBuilder, EvidenceExtractor, RepoSnapshot, SourceIndex};
pub use coordinator::{GenerationCoordinator, RepoSource, validate_only};
pub use docs::{DocumentSynthesizer, synthesize};
pub use rules::RulesEngine;

pub use ai::{Enhancer, OllamaEnhancer};
