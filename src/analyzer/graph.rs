//! Entity Graph Builder
//!
//! Turns the source index and repository evidence into typed entities
//! (services, APIs, roles, files, controllers, exported symbols) and the
//! relationships between them. Detection is purely structural: directory
//! naming, route declarations, role/guard markers and import statements.
//!
//! Output ordering is fixed (discovery path, then type, then name) so an
//! unchanged snapshot always yields an identical `AnalysisResult`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use super::history::ChangeHistory;
use super::parser::{RouteDeclaration, SymbolKind};
use super::source_index::{RouteMatch, SourceIndex};
use crate::types::{
    AnalysisResult, ApiEndpoint, Entity, EntityDetails, EntityType, FileInfo,
    Relationship, RelationshipType, RepoEvidence, RoleInfo, ServiceConvention, ServiceInfo,
    entity_id,
};

// =============================================================================
// Marker Patterns
// =============================================================================

/// Calls and decorators whose arguments name required roles
static ROLE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:@Roles|\b(?:requireRoles?|require_roles?|hasRoles?|has_roles?|hasAnyRole|checkRoles?|allowRoles?|authorize|RoleChecker))\s*\(([^)]*)\)",
    )
    .expect("valid regex")
});

/// `roles: ['admin']` / `roles=["admin"]`
static ROLE_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\broles\s*[:=]\s*\[([^\]]*)\]").expect("valid regex")
});

static QUOTED_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']([A-Za-z][A-Za-z0-9_:\-]*)["']"#).expect("valid regex")
});

/// `Role.ADMIN` style enum members
static MEMBER_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z]*\.([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex")
});

static AUTH_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:authenticate|authenticated|requireAuth|isAuthenticated|ensureAuthenticated|verifyToken|verify_token|login_required|jwt_required|UseGuards|AuthGuard|get_current_user|get_current_active_user|auth)\b",
    )
    .expect("valid regex")
});

/// Error statuses or failure wording in attached documentation
static ERROR_DOC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[45]\d\d\b|\berrors?\b|\bthrows?\b|\braises?\b|\bexceptions?\b")
        .expect("valid regex")
});

/// Declared response maps (`responses={404: ...}`)
static RESPONSES_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bresponses\s*[=:]").expect("valid regex")
});

const SERVICE_PARENTS: &[&str] = &["services", "service", "apps", "packages"];
const SERVICE_MODULE_DIRS: &[&str] = &["services", "service"];
const SERVICE_SUFFIXES: &[&str] = &[".service", "_service", "-service"];
const CONTROLLER_SUFFIXES: &[&str] = &[".controller", "_controller", ".routes", ".route"];

// =============================================================================
// Builder
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct EntityGraphBuilder;

impl EntityGraphBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, index: &SourceIndex, evidence: &RepoEvidence) -> AnalysisResult {
        self.analyze_with_history(index, evidence, &ChangeHistory::default())
    }

    pub fn analyze_with_history(
        &self,
        index: &SourceIndex,
        evidence: &RepoEvidence,
        history: &ChangeHistory,
    ) -> AnalysisResult {
        let mut graph = GraphAccumulator::default();

        let services = detect_services(index);
        let dependencies = index.import_edges();

        add_files(&mut graph, index, evidence, history);
        add_symbols(&mut graph, index);

        for service in &services {
            graph.entities.push(Entity::new(
                service.info.id.clone(),
                service.info.name.clone(),
                service.info.path.clone(),
                EntityDetails::Service {
                    root: service.info.path.clone(),
                    convention: service.convention,
                },
            ));
        }

        for dep in &dependencies {
            graph.relate(
                entity_id(EntityType::File, &dep.from),
                entity_id(EntityType::File, &dep.to),
                RelationshipType::Imports,
            );
            let from_service = owning_service(&services, &dep.from);
            let to_service = owning_service(&services, &dep.to);
            if let (Some(a), Some(b)) = (from_service, to_service)
                && a.info.id != b.info.id
            {
                graph.relate(a.info.id.clone(), b.info.id.clone(), RelationshipType::DependsOn);
            }
        }

        let apis = add_routes(&mut graph, index, &services);
        let roles = collect_roles(&mut graph, &apis);

        let mut result = AnalysisResult {
            services: services.into_iter().map(|s| s.info).collect(),
            apis,
            roles,
            dependencies,
            files: graph.files,
            entities: graph.entities,
            relationships: graph.relationships.into_iter().map(Relationship::from).collect(),
            skipped_files: index.skipped().to_vec(),
        };
        sort_result(&mut result);

        info!(
            services = result.services.len(),
            apis = result.apis.len(),
            roles = result.roles.len(),
            entities = result.entities.len(),
            relationships = result.relationships.len(),
            "Entity graph built"
        );
        result
    }
}

#[derive(Default)]
struct GraphAccumulator {
    entities: Vec<Entity>,
    files: Vec<FileInfo>,
    relationships: BTreeSet<RelationshipKey>,
}

/// Relationship ordered by (from, to, type); metadata is never attached here
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RelationshipKey {
    from: String,
    to: String,
    kind: RelationshipType,
}

impl From<RelationshipKey> for Relationship {
    fn from(key: RelationshipKey) -> Self {
        Relationship::new(key.from, key.to, key.kind)
    }
}

impl GraphAccumulator {
    fn relate(&mut self, from: String, to: String, kind: RelationshipType) {
        self.relationships.insert(RelationshipKey { from, to, kind });
    }
}

// =============================================================================
// Files and Symbols
// =============================================================================

fn add_files(
    graph: &mut GraphAccumulator,
    index: &SourceIndex,
    evidence: &RepoEvidence,
    history: &ChangeHistory,
) {
    for file in index.files() {
        let language = Some(file.language.family().to_string());
        let change_frequency = history.frequency(&file.path);

        let mut entity = Entity::new(
            entity_id(EntityType::File, &file.path),
            file_name(&file.path),
            file.path.clone(),
            EntityDetails::File {
                language: language.clone(),
                change_frequency,
            },
        );
        if evidence.structure.entry_files.contains(&file.path) {
            entity = entity.with_extra("entryPoint", serde_json::Value::Bool(true));
        }
        graph.entities.push(entity);

        graph.files.push(FileInfo {
            path: file.path.clone(),
            language,
            change_frequency,
            last_modified: history.last_modified(&file.path),
        });
    }
}

fn add_symbols(graph: &mut GraphAccumulator, index: &SourceIndex) {
    for file in index.files() {
        let file_id = entity_id(EntityType::File, &file.path);
        for symbol in file.symbols.iter().filter(|s| s.exported) {
            let (entity_type, details) = match symbol.kind {
                SymbolKind::Function => (
                    EntityType::Function,
                    EntityDetails::Function {
                        line: symbol.line,
                        exported: true,
                    },
                ),
                SymbolKind::Class => (
                    EntityType::Class,
                    EntityDetails::Class {
                        line: symbol.line,
                        exported: true,
                    },
                ),
            };
            let id = entity_id(entity_type, &format!("{}#{}", file.path, symbol.name));
            graph
                .entities
                .push(Entity::new(id.clone(), symbol.name.clone(), file.path.clone(), details));
            graph.relate(file_id.clone(), id, RelationshipType::Exposes);
        }
    }
}

// =============================================================================
// Services
// =============================================================================

#[derive(Debug, Clone)]
struct DetectedService {
    info: ServiceInfo,
    convention: ServiceConvention,
    /// Directory roots own everything below them; module roots own one file
    is_directory: bool,
}

fn detect_services(index: &SourceIndex) -> Vec<DetectedService> {
    let mut by_root: BTreeMap<String, DetectedService> = BTreeMap::new();

    for file in index.files() {
        let segments: Vec<&str> = file.path.split('/').collect();
        let last = segments.len() - 1;

        // services/<name>/... ; apps/<name>/... ; packages/<name>/...
        if let Some(pos) = segments[..last]
            .iter()
            .position(|s| SERVICE_PARENTS.contains(s))
            && pos + 1 < last
        {
            let root = segments[..=pos + 1].join("/");
            by_root.entry(root.clone()).or_insert_with(|| DetectedService {
                info: service_info(segments[pos + 1], &root),
                convention: ServiceConvention::ServiceDirectory,
                is_directory: true,
            });
            continue;
        }

        let stem = file_stem(segments[last]);
        if matches!(stem, "index" | "__init__" | "mod") {
            continue;
        }

        // services/<name>.ts
        if last > 0 && SERVICE_MODULE_DIRS.contains(&segments[last - 1]) {
            by_root.entry(file.path.clone()).or_insert_with(|| DetectedService {
                info: service_info(strip_any_suffix(stem, SERVICE_SUFFIXES), &file.path),
                convention: ServiceConvention::ServiceModule,
                is_directory: false,
            });
            continue;
        }

        // <name>.service.ts
        let stripped = strip_any_suffix(stem, SERVICE_SUFFIXES);
        if stripped != stem && !stripped.is_empty() {
            by_root.entry(file.path.clone()).or_insert_with(|| DetectedService {
                info: service_info(stripped, &file.path),
                convention: ServiceConvention::ServiceSuffix,
                is_directory: false,
            });
        }
    }

    by_root.into_values().collect()
}

fn service_info(name: &str, root: &str) -> ServiceInfo {
    ServiceInfo {
        id: entity_id(EntityType::Service, root),
        name: name.to_string(),
        path: root.to_string(),
    }
}

/// The most specific service containing `path`
fn owning_service<'a>(services: &'a [DetectedService], path: &str) -> Option<&'a DetectedService> {
    services
        .iter()
        .filter(|s| {
            if s.is_directory {
                path.starts_with(&format!("{}/", s.info.path))
            } else {
                path == s.info.path
            }
        })
        .max_by_key(|s| (s.info.path.len(), !s.is_directory))
}

// =============================================================================
// Routes, Controllers and APIs
// =============================================================================

fn add_routes(
    graph: &mut GraphAccumulator,
    index: &SourceIndex,
    services: &[DetectedService],
) -> Vec<ApiEndpoint> {
    let mut apis = Vec::new();
    let matches = index.route_matches();

    for routes in matches.chunk_by(|a, b| a.file_path == b.file_path) {
        let Some(file_path) = routes.first().map(|m| m.file_path) else {
            continue;
        };
        let controller_name = strip_any_suffix(file_stem(file_name(file_path)), CONTROLLER_SUFFIXES)
            .to_string();
        let controller_id = entity_id(EntityType::Controller, file_path);
        graph.entities.push(Entity::new(
            controller_id.clone(),
            controller_name.clone(),
            file_path.to_string(),
            EntityDetails::Controller {
                route_count: routes.len(),
            },
        ));

        let service = owning_service(services, file_path);

        for RouteMatch { route, .. } in routes {
            let api = endpoint(file_path, route, &controller_name);
            graph.entities.push(Entity::new(
                api.id.clone(),
                api.signature(),
                file_path.to_string(),
                EntityDetails::Api {
                    method: route.method,
                    path: route.path.clone(),
                    line: route.line,
                    framework: route.framework,
                },
            ));
            graph.relate(controller_id.clone(), api.id.clone(), RelationshipType::Exposes);
            if let Some(service) = service {
                graph.relate(service.info.id.clone(), api.id.clone(), RelationshipType::Exposes);
            }
            apis.push(api);
        }
    }

    debug!(count = apis.len(), "Detected API endpoints");
    apis
}

fn endpoint(file_path: &str, route: &RouteDeclaration, controller: &str) -> ApiEndpoint {
    let roles = extract_roles(route);
    let guard_text = guard_text(route);
    let authenticated = !roles.is_empty() || AUTH_MARKER.is_match(&guard_text);

    let doc_text = route
        .doc
        .iter()
        .chain(route.annotations.iter())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let documents_errors =
        ERROR_DOC.is_match(&doc_text) || RESPONSES_ARG.is_match(&route.call_text);

    let key = format!("{} {}@{}:{}", route.method, route.path, file_path, route.line);

    ApiEndpoint {
        id: entity_id(EntityType::Api, &key),
        method: route.method,
        path: route.path.clone(),
        controller: Some(controller.to_string()),
        roles,
        file_path: file_path.to_string(),
        line: route.line,
        framework: route.framework,
        documented: route.doc.is_some(),
        documents_errors,
        authenticated,
    }
}

/// Declaration text that can carry guards: the registering call, its
/// decorators and the handler signature. Doc comments are excluded.
fn guard_text(route: &RouteDeclaration) -> String {
    let mut parts = vec![route.call_text.as_str()];
    parts.extend(route.annotations.iter().map(String::as_str));
    if let Some(signature) = &route.signature {
        parts.push(signature);
    }
    parts.join("\n")
}

fn extract_roles(route: &RouteDeclaration) -> Vec<String> {
    let text = guard_text(route);
    let mut roles = BTreeSet::new();

    for caps in ROLE_CALL.captures_iter(&text).chain(ROLE_LIST.captures_iter(&text)) {
        let Some(args) = caps.get(1) else { continue };
        for value in QUOTED_VALUE.captures_iter(args.as_str()) {
            if let Some(v) = value.get(1) {
                roles.insert(v.as_str().to_string());
            }
        }
        for member in MEMBER_VALUE.captures_iter(args.as_str()) {
            if let Some(v) = member.get(1) {
                roles.insert(v.as_str().to_ascii_lowercase());
            }
        }
    }
    roles.into_iter().collect()
}

fn collect_roles(graph: &mut GraphAccumulator, apis: &[ApiEndpoint]) -> Vec<RoleInfo> {
    let mut roles: BTreeMap<&str, (Vec<String>, BTreeSet<&str>)> = BTreeMap::new();
    for api in apis {
        for role in &api.roles {
            let entry = roles.entry(role.as_str()).or_default();
            entry.0.push(api.id.clone());
            entry.1.insert(api.file_path.as_str());
        }
    }

    let mut infos = Vec::new();
    for (name, (endpoints, files)) in roles {
        let id = entity_id(EntityType::Role, name);
        let declared_in: Vec<String> = files.iter().map(|f| f.to_string()).collect();
        for endpoint in &endpoints {
            graph.relate(endpoint.clone(), id.clone(), RelationshipType::Uses);
        }
        graph.entities.push(Entity::new(
            id.clone(),
            name,
            declared_in.first().cloned().unwrap_or_default(),
            EntityDetails::Role { declared_in },
        ));
        infos.push(RoleInfo {
            id,
            name: name.to_string(),
            endpoints,
        });
    }
    infos
}

// =============================================================================
// Ordering
// =============================================================================

fn sort_result(result: &mut AnalysisResult) {
    result
        .services
        .sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.name.cmp(&b.name)));
    result.apis.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then(a.line.cmp(&b.line))
            .then(a.method.cmp(&b.method))
            .then_with(|| a.path.cmp(&b.path))
    });
    for role in &mut result.roles {
        role.endpoints.sort();
    }
    result.files.sort_by(|a, b| a.path.cmp(&b.path));
    result.dependencies.sort();
    result.entities.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then(a.entity_type.cmp(&b.entity_type))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    result.entities.dedup_by(|a, b| a.id == b.id);
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// File name without its final extension (`users.controller.ts` -> `users.controller`)
fn file_stem(name: &str) -> &str {
    let name = name.rsplit('/').next().unwrap_or(name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn strip_any_suffix<'a>(name: &'a str, suffixes: &[&str]) -> &'a str {
    suffixes
        .iter()
        .find_map(|s| name.strip_suffix(s))
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::evidence::EvidenceExtractor;
    use crate::analyzer::scanner::RepoSnapshot;

    fn build(files: &[(&str, &str)]) -> AnalysisResult {
        let snapshot = RepoSnapshot::from_files(files.iter().copied());
        let evidence = EvidenceExtractor::new().extract(&snapshot);
        let mut index = SourceIndex::new();
        index.add_source_files(snapshot.source_files());
        EntityGraphBuilder::new().analyze(&index, &evidence)
    }

    const USERS_API: &str = "\
const router = require('express').Router();
router.get('/users', listUsers);
router.get('/users/:id', getUser);
module.exports = router;
";

    #[test]
    fn test_two_undocumented_get_routes() {
        let result = build(&[("api/users.js", USERS_API)]);
        assert_eq!(result.apis.len(), 2);
        assert!(result.apis.iter().all(|a| !a.documented));
        assert!(result.apis.iter().all(|a| a.controller.as_deref() == Some("users")));
        assert!(result.dangling_relationships().is_empty());
    }

    #[test]
    fn test_one_controller_per_route_file() {
        let orders = "router.post('/orders', createOrder);\n";
        let result = build(&[
            ("api/users.js", USERS_API),
            ("api/orders.js", orders),
            ("src/util.ts", "export const x = () => 1;"),
        ]);

        let controllers: Vec<(&str, usize)> = result
            .entities
            .iter()
            .filter_map(|e| match e.metadata.details {
                EntityDetails::Controller { route_count } => Some((e.file_path.as_str(), route_count)),
                _ => None,
            })
            .collect();
        assert_eq!(controllers, vec![("api/orders.js", 1), ("api/users.js", 2)]);
        assert_eq!(result.apis.len(), 3);
        assert_eq!(result.apis[0].controller.as_deref(), Some("orders"));
    }

    #[test]
    fn test_no_routes_yields_empty_apis() {
        let result = build(&[("src/util.ts", "export const x = () => 1;")]);
        assert!(result.apis.is_empty());
        assert!(result.roles.is_empty());
        assert_eq!(result.files.len(), 1);
    }

    #[test]
    fn test_empty_index_yields_empty_result() {
        let result = build(&[]);
        assert!(result.is_empty());
        assert_eq!(result, AnalysisResult::default());
    }

    #[test]
    fn test_roles_and_authentication() {
        let src = "\
/** Delete a user. Responds 404 when missing. */
router.delete('/users/:id', requireRole('admin'), remove);
router.get('/me', authenticate, me);
router.get('/health', health);
";
        let result = build(&[("src/routes/users.js", src)]);
        let by_path = |p: &str| result.apis.iter().find(|a| a.path == p).unwrap();

        let delete = by_path("/users/:id");
        assert_eq!(delete.roles, vec!["admin"]);
        assert!(delete.authenticated);
        assert!(delete.documented);
        assert!(delete.documents_errors);

        assert!(by_path("/me").authenticated);
        assert!(by_path("/me").roles.is_empty());
        assert!(by_path("/health").is_public());

        assert_eq!(result.roles.len(), 1);
        assert_eq!(result.roles[0].name, "admin");
        assert!(result.relationships.iter().any(|r| r.to == "role:admin"
            && r.relationship_type == RelationshipType::Uses));
    }

    #[test]
    fn test_nest_roles_decorator_with_enum_members() {
        let src = "\
@Controller('orders')
export class OrdersController {
  @Roles(Role.Admin, 'auditor')
  @Get()
  findAll() {}
}
";
        let result = build(&[("src/orders/orders.controller.ts", src)]);
        assert_eq!(result.apis.len(), 1);
        assert_eq!(result.apis[0].path, "/orders");
        assert_eq!(result.apis[0].roles, vec!["admin", "auditor"]);
        assert_eq!(result.apis[0].controller.as_deref(), Some("orders"));
    }

    #[test]
    fn test_services_and_dependencies() {
        let result = build(&[
            ("services/billing/index.ts", "import { notify } from '../notifications/send';\nexport function charge() {}"),
            ("services/notifications/send.ts", "export function notify() {}"),
            ("src/user.service.ts", "export class UserService {}"),
        ]);
        let names: Vec<&str> = result.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["billing", "notifications", "user"]);
        assert!(result.relationships.iter().any(|r| {
            r.from == "service:services/billing"
                && r.to == "service:services/notifications"
                && r.relationship_type == RelationshipType::DependsOn
        }));
        assert!(result.dangling_relationships().is_empty());
    }

    #[test]
    fn test_circular_imports_are_recorded() {
        let result = build(&[
            ("a.js", "require('./b');"),
            ("b.js", "require('./a');"),
        ]);
        assert_eq!(result.dependencies.len(), 2);
        let imports = result
            .relationships
            .iter()
            .filter(|r| r.relationship_type == RelationshipType::Imports)
            .count();
        assert_eq!(imports, 2);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let files = [
            ("api/users.js", USERS_API),
            ("api/orders.py", "@app.get('/orders')\ndef orders():\n    pass\n"),
            ("services/mail/send.ts", "export function send() {}"),
        ];
        let first = build(&files);
        let second = build(&files);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_history_feeds_file_frequency() {
        let snapshot = RepoSnapshot::from_files([("src/app.ts", "export function main() {}")]);
        let evidence = EvidenceExtractor::new().extract(&snapshot);
        let mut index = SourceIndex::new();
        index.add_source_files(snapshot.source_files());
        let history = ChangeHistory::from_entries([("src/app.ts", None), ("src/app.ts", None)]);

        let result = EntityGraphBuilder::new().analyze_with_history(&index, &evidence, &history);
        assert_eq!(result.files[0].change_frequency, 2);
        let file_entity = result.entity("file:src/app.ts").unwrap();
        assert_eq!(
            file_entity.metadata.details,
            EntityDetails::File {
                language: Some("TypeScript".into()),
                change_frequency: 2
            }
        );
        assert!(file_entity.metadata.extra.contains_key("entryPoint"));
    }
}
