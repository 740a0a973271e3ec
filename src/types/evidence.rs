use serde::{Deserialize, Serialize};

/// Deterministic facts extracted from a repository snapshot.
///
/// A field holds a value only when a concrete artifact backs it; the default
/// value (empty / `false` / `None`) always means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoEvidence {
    pub meta: MetaEvidence,
    pub stack: StackEvidence,
    pub files: FileFlags,
    pub structure: StructureEvidence,
    pub api_evidence: ApiEvidence,
    pub dependencies: Vec<String>,
    pub dev_dependencies: Vec<String>,
    pub scripts: Vec<ScriptEntry>,
}

impl RepoEvidence {
    pub fn script(&self, name: &str) -> Option<&ScriptEntry> {
        self.scripts.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaEvidence {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub license: Option<String>,
    /// Ordered by file count, then name
    pub languages: Vec<String>,
}

/// Stack categories; an empty list means no classified dependency was seen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackEvidence {
    pub frontend: Vec<String>,
    pub backend: Vec<String>,
    pub database: Vec<String>,
    pub tools: Vec<String>,
}

impl StackEvidence {
    pub fn is_empty(&self) -> bool {
        self.frontend.is_empty()
            && self.backend.is_empty()
            && self.database.is_empty()
            && self.tools.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFlags {
    pub has_package_json: bool,
    pub has_readme: bool,
    pub has_tests: bool,
    pub has_docker: bool,
    pub has_gitignore: bool,
    pub has_license: bool,
    pub has_env_example: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureEvidence {
    /// Top-level directories
    pub folders: Vec<String>,
    pub entry_files: Vec<String>,
    pub config_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvidence {
    pub has_api_folder: bool,
    pub controllers_found: usize,
    /// Source files under `api/` or `routes/` directories
    pub routes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub name: String,
    pub command: String,
}
