use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Build the canonical id for an entity of `entity_type` keyed by `key`.
pub fn entity_id(entity_type: EntityType, key: &str) -> String {
    format!("{}:{}", entity_type.as_str(), key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
    pub file_path: String,
    pub metadata: EntityMetadata,
}

impl Entity {
    /// Creates an entity whose type is taken from its details variant
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        file_path: impl Into<String>,
        details: EntityDetails,
    ) -> Self {
        Self {
            id: id.into(),
            entity_type: details.entity_type(),
            name: name.into(),
            file_path: file_path.into(),
            metadata: EntityMetadata {
                details,
                extra: BTreeMap::new(),
            },
        }
    }

    /// Attach an unanchored extension value
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.extra.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Service,
    Api,
    Role,
    File,
    Controller,
    Function,
    Class,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Api => "api",
            Self::Role => "role",
            Self::File => "file",
            Self::Controller => "controller",
            Self::Function => "function",
            Self::Class => "class",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed per-kind facts plus a residual open map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    #[serde(flatten)]
    pub details: EntityDetails,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDetails {
    Service {
        /// Directory or file that anchors the service
        root: String,
        convention: ServiceConvention,
    },
    Api {
        method: HttpMethod,
        path: String,
        line: usize,
        framework: RouteFramework,
    },
    Role {
        declared_in: Vec<String>,
    },
    File {
        language: Option<String>,
        change_frequency: u32,
    },
    Controller {
        route_count: usize,
    },
    Function {
        line: usize,
        exported: bool,
    },
    Class {
        line: usize,
        exported: bool,
    },
}

impl EntityDetails {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Service { .. } => EntityType::Service,
            Self::Api { .. } => EntityType::Api,
            Self::Role { .. } => EntityType::Role,
            Self::File { .. } => EntityType::File,
            Self::Controller { .. } => EntityType::Controller,
            Self::Function { .. } => EntityType::Function,
            Self::Class { .. } => EntityType::Class,
        }
    }
}

/// Structural convention a service was recognized by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceConvention {
    /// Child of a `services/`, `apps/` or `packages/` directory
    ServiceDirectory,
    /// Module file inside a `services/` directory
    ServiceModule,
    /// `*.service.ts` style suffix
    ServiceSuffix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    All,
}

impl HttpMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "patch" => Some(Self::Patch),
            "delete" | "del" => Some(Self::Delete),
            "head" => Some(Self::Head),
            "options" => Some(Self::Options),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::All => "ALL",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration style a route was matched by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteFramework {
    /// `app.get('/path', ...)` / `router.post(...)`
    Express,
    /// `@Get('path')` inside a `@Controller` class
    Nest,
    /// `@app.get("/path")` / `@router.post(...)`
    FastApi,
    /// `@app.route("/path", methods=[...])`
    Flask,
}

impl RouteFramework {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Express => "Express",
            Self::Nest => "NestJS",
            Self::FastApi => "FastAPI",
            Self::Flask => "Flask",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

impl Relationship {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relationship_type,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    DependsOn,
    Exposes,
    Uses,
    Imports,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_follows_details() {
        let entity = Entity::new(
            "role:admin",
            "admin",
            "src/api/users.ts",
            EntityDetails::Role {
                declared_in: vec!["src/api/users.ts".into()],
            },
        );
        assert_eq!(entity.entity_type, EntityType::Role);
    }

    #[test]
    fn test_entity_serializes_tagged_metadata() {
        let entity = Entity::new(
            entity_id(EntityType::File, "src/a.ts"),
            "a.ts",
            "src/a.ts",
            EntityDetails::File {
                language: Some("TypeScript".into()),
                change_frequency: 3,
            },
        );
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["filePath"], "src/a.ts");
        assert_eq!(json["metadata"]["kind"], "file");
        assert_eq!(json["metadata"]["change_frequency"], 3);
        assert!(json["metadata"].get("extra").is_none());
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("del"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("use"), None);
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
    }

    #[test]
    fn test_relationship_metadata() {
        let rel = Relationship::new("file:a", "file:b", RelationshipType::Imports)
            .with_metadata("line", serde_json::json!(4));
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "imports");
        assert_eq!(json["metadata"]["line"], 4);
    }
}
