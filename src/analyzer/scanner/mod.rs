pub mod file_scanner;
pub mod snapshot;

pub use file_scanner::{EntryKind, FileScanner, ScannedEntry};
pub use snapshot::{RepoSnapshot, SnapshotFile};
