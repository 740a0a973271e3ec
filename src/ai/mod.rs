//! AI Enhancement Layer
//!
//! Optional fix suggestions for rule violations. Output stays complete and
//! deterministic when no provider is configured or the provider fails.

pub mod enhancer;
pub mod ollama;
pub mod timeout;

pub use enhancer::{Enhancer, SharedEnhancer, create_enhancer, enhance, enhance_within};
pub use ollama::OllamaEnhancer;
pub use timeout::{with_timeout, with_timeout_map};
