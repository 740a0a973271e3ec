use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, HttpMethod, Relationship, RouteFramework};

/// Output of the entity graph builder.
///
/// Every collection is sorted by discovery path and then name so that an
/// unchanged snapshot serializes to identical bytes on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub services: Vec<ServiceInfo>,
    pub apis: Vec<ApiEndpoint>,
    pub roles: Vec<RoleInfo>,
    pub dependencies: Vec<FileDependency>,
    pub files: Vec<FileInfo>,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    /// Files the source index could not parse
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<SkippedFile>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Check that every relationship endpoint refers to an entity in this result
    pub fn dangling_relationships(&self) -> Vec<&Relationship> {
        let ids: std::collections::HashSet<&str> =
            self.entities.iter().map(|e| e.id.as_str()).collect();
        self.relationships
            .iter()
            .filter(|r| !ids.contains(r.from.as_str()) || !ids.contains(r.to.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    pub id: String,
    pub method: HttpMethod,
    pub path: String,
    /// Controller entity name (file stem of the declaring file)
    pub controller: Option<String>,
    pub roles: Vec<String>,
    pub file_path: String,
    pub line: usize,
    pub framework: RouteFramework,
    /// A doc comment or docstring is attached to the declaration
    pub documented: bool,
    /// The attached documentation names an error status or failure mode
    pub documents_errors: bool,
    /// Guarded by roles or an authentication marker
    pub authenticated: bool,
}

impl ApiEndpoint {
    pub fn signature(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    pub fn is_public(&self) -> bool {
        !self.authenticated
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub id: String,
    pub name: String,
    /// Ids of endpoints that require this role
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDependency {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: String,
    pub language: Option<String>,
    pub change_frequency: u32,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}
