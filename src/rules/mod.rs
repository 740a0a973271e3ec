//! Documentation Rules
//!
//! A fixed catalog of documentation-health rules evaluated against the
//! entity graph and, when supplied, the existing README:
//! - API endpoints: inline docs, declared roles, documented error responses
//! - Services and roles referenced in the README
//! - Import cycles
//! - README structure: required sections, heading hierarchy, image alt text

pub mod catalog;
pub mod engine;
pub mod markdown;
pub mod reporter;

pub use catalog::{DocContent, Finding, Rule, RuleContext, default_catalog};
pub use engine::RulesEngine;
pub use markdown::DocOutline;
pub use reporter::Reporter;
