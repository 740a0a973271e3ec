//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Generation lock constants
pub mod lock {
    /// A `generating` job younger than this holds the per-repository lock (5 minutes)
    pub const DEFAULT_WINDOW_SECS: u64 = 300;

    /// Default number of pipelines allowed to run at the same time
    pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;
}

/// File analysis constants
pub mod analysis {
    /// Maximum file size to read into a snapshot (1MB)
    pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

    /// Maximum number of files kept in one snapshot
    pub const MAX_FILES: usize = 20_000;

    /// Directories that never contribute evidence
    pub const DEFAULT_EXCLUDES: &[&str] = &[
        "**/node_modules/**",
        "**/.git/**",
        "**/dist/**",
        "**/build/**",
        "**/target/**",
        "**/__pycache__/**",
        "**/.venv/**",
        "**/venv/**",
        "**/.next/**",
        "**/coverage/**",
    ];
}

/// Rules engine constants
pub mod rules {
    /// Score a document set starts from before penalties
    pub const MAX_SCORE: u32 = 100;

    /// Deepest heading level accepted by the heading depth rule
    pub const MAX_HEADING_DEPTH: usize = 4;

    /// Entity id used for violations against the supplied documentation
    pub const DOC_ENTITY_ID: &str = "doc:README";
}

/// AI enhancer constants
pub mod ai {
    pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

    pub const DEFAULT_MODEL: &str = "llama3.2";

    /// Request timeout for a single enhancement call (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    pub const DEFAULT_TOP_P: f32 = 0.9;

    pub const DEFAULT_TOP_K: u32 = 40;

    /// Timeout for the availability probe (seconds)
    pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

    /// Confidence assigned to suggestions from a local model
    pub const SUGGESTION_CONFIDENCE: f32 = 0.6;

    /// Upper bound of violations sent for fix suggestions in one run
    pub const MAX_FIX_REQUESTS: usize = 10;

    /// Budget for all fix requests of one run (seconds)
    pub const ENHANCEMENT_TIMEOUT_SECS: u64 = 120;
}

/// Storage constants
pub mod storage {
    /// Project data directory
    pub const PROJECT_DIR: &str = ".evidoc";

    /// Default database file inside the project data directory
    pub const DEFAULT_DATABASE_FILE: &str = "jobs.db";

    /// SQLite busy timeout (milliseconds)
    pub const BUSY_TIMEOUT_MS: u64 = 5_000;
}

/// Document synthesis constants
pub mod docs {
    /// Edges drawn in the architecture diagram before it is truncated
    pub const MAX_DIAGRAM_EDGES: usize = 60;

    /// File names written for each document section (markdown)
    pub const SECTION_FILES: &[(&str, &str)] = &[
        ("readme", "README"),
        ("apiDocs", "API"),
        ("setupGuide", "SETUP"),
        ("architecture", "ARCHITECTURE"),
    ];
}
