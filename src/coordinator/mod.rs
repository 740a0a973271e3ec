//! Generation coordination: job lifecycle, lock window and the detached
//! documentation pipeline.

pub mod clock;
pub mod generation;
pub mod pipeline;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use generation::{GenerationCoordinator, validate_only};
pub use pipeline::{Pipeline, PipelineOutput, ProgressFn, RepoAnalysis, RepoSource, analyze, fingerprint};
