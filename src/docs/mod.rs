//! Document synthesis: confidence-tagged sections and output formats

pub mod confidence;
pub mod diagram;
pub mod format;
pub mod synthesizer;

pub use confidence::{Claim, ClaimKey, ClaimSpec};
pub use diagram::mermaid_diagram;
pub use format::{RenderedFile, format_documents, write_documents};
pub use synthesizer::{DocumentSynthesizer, synthesize};
