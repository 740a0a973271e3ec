//! Document Synthesizer
//!
//! Assembles the README, API reference, setup guide and architecture
//! sections from repository evidence. Every fact goes through
//! [`Claim::resolve`], so a value only appears as Verified when the
//! evidence field behind it is non-empty, and absent facts are rendered as
//! Missing with their remediation.
//!
//! Rule violations are listed inline in the section that owns the entity.
//! AI fix suggestions are appended beneath their violation and never replace
//! the deterministic text, so output is complete with or without them.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::confidence::{Claim, ClaimKey};
use super::diagram::mermaid_diagram;
use crate::constants::rules::{DOC_ENTITY_ID, MAX_SCORE};
use crate::types::{
    AnalysisResult, ApiEndpoint, Confidence, DocumentSet, EntityType, FixSuggestion,
    RepoEvidence, RuleViolation, RulesResult, StackEvidence,
};

const LEGEND: &str = "_Confidence: **Verified** facts come straight from repository artifacts, \
**Inferred** facts are derived by a named heuristic, **Missing** facts come with a remediation._";

/// Builds a [`DocumentSet`] from evidence, optional rule results and
/// optional AI fixes. Holds no state besides the optional entity graph used
/// for endpoint, service and diagram sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentSynthesizer<'a> {
    analysis: Option<&'a AnalysisResult>,
}

impl<'a> DocumentSynthesizer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include endpoint, service, role and diagram claims from the graph
    pub fn with_analysis(mut self, analysis: &'a AnalysisResult) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn synthesize(
        &self,
        evidence: &RepoEvidence,
        rules: Option<&RulesResult>,
        fixes: Option<&[FixSuggestion]>,
    ) -> DocumentSet {
        let findings = Findings::new(rules, fixes);

        let documents = DocumentSet {
            readme: self.readme(evidence, &findings),
            api_docs: self.api_docs(evidence, &findings),
            setup_guide: setup_guide(evidence),
            architecture: self.architecture(evidence, &findings),
        };

        debug!(
            violations = findings.violations.len(),
            fixes = findings.fixes.len(),
            with_graph = self.analysis.is_some(),
            "Synthesized documents"
        );
        documents
    }

    /// Evidence-level claims in rendering order
    pub fn evidence_claims(&self, evidence: &RepoEvidence) -> Vec<Claim> {
        let mut claims = readme_claims(evidence);
        claims.extend(setup_claims(evidence));
        claims.extend(structure_claims(evidence));
        claims
    }

    // =========================================================================
    // README
    // =========================================================================

    fn readme(&self, evidence: &RepoEvidence, findings: &Findings<'_>) -> String {
        let title = evidence.meta.name.as_deref().unwrap_or("Project");
        let claims = readme_claims(evidence);
        let mut content = format!("# {}\n\n", title);

        content.push_str("## Description\n\n");
        push_claims(&mut content, claims.iter().filter(|c| c.key == ClaimKey::Description));

        content.push_str("## Overview\n\n");
        push_claims(
            &mut content,
            claims.iter().filter(|c| {
                matches!(
                    c.key,
                    ClaimKey::Name | ClaimKey::Version | ClaimKey::License | ClaimKey::ProjectKind
                )
            }),
        );

        content.push_str("## Tech Stack\n\n");
        push_claims(
            &mut content,
            claims
                .iter()
                .filter(|c| matches!(c.key, ClaimKey::Languages | ClaimKey::Stack)),
        );

        content.push_str("## Project Health\n\n");
        push_claims(
            &mut content,
            claims
                .iter()
                .filter(|c| matches!(c.key, ClaimKey::Tests | ClaimKey::Docker)),
        );
        let score = Claim::verified(
            ClaimKey::QualityScore,
            findings.score.map(|s| format!("{}/{}", s, MAX_SCORE)),
        );
        content.push_str(&score.render());
        content.push_str("\n\n");

        let doc_findings = findings.matching(|v| v.entity_id == DOC_ENTITY_ID);
        findings.push_list(&mut content, "Documentation Findings", &doc_findings);

        content.push_str(LEGEND);
        content.push('\n');
        content
    }

    // =========================================================================
    // API reference
    // =========================================================================

    fn api_docs(&self, evidence: &RepoEvidence, findings: &Findings<'_>) -> String {
        let mut content = String::from("# API Reference\n\n");
        let mut rendered: BTreeSet<&str> = BTreeSet::new();

        if let Some(analysis) = self.analysis {
            let summary = (!analysis.apis.is_empty()).then(|| endpoint_summary(&analysis.apis));
            push_claims(&mut content, [Claim::verified(ClaimKey::ApiEndpoints, summary)].iter());

            for api in &analysis.apis {
                content.push_str(&format!("## {} {}\n\n", api.method, api.path));
                push_claims(&mut content, endpoint_claims(api).iter());
                let inline: Vec<&RuleViolation> = findings.for_entity(&api.id).collect();
                for violation in &inline {
                    content.push_str(&findings.render(violation));
                }
                if !inline.is_empty() {
                    content.push('\n');
                }
                rendered.insert(api.id.as_str());
            }
        }

        let routes = (!evidence.api_evidence.routes.is_empty()).then(|| {
            format!(
                "{} ({} controller files)",
                code_list(&evidence.api_evidence.routes),
                evidence.api_evidence.controllers_found
            )
        });
        content.push_str("## Route Files\n\n");
        push_claims(&mut content, [Claim::verified(ClaimKey::ApiLayout, routes)].iter());

        let remaining = findings.matching(|v| {
            matches!(v.entity_type, EntityType::Api | EntityType::Controller)
                && !rendered.contains(v.entity_id.as_str())
        });
        findings.push_list(&mut content, "Findings", &remaining);
        content
    }

    // =========================================================================
    // Architecture
    // =========================================================================

    fn architecture(&self, evidence: &RepoEvidence, findings: &Findings<'_>) -> String {
        let mut content = String::from("# Architecture\n\n## Structure\n\n");
        push_claims(&mut content, structure_claims(evidence).iter());

        if let Some(analysis) = self.analysis {
            content.push_str("## Services\n\n");
            let services = (!analysis.services.is_empty()).then(|| {
                analysis
                    .services
                    .iter()
                    .map(|s| format!("{} (`{}`)", s.name, s.path))
                    .collect::<Vec<_>>()
                    .join(", ")
            });
            push_claims(&mut content, [Claim::verified(ClaimKey::Services, services)].iter());

            content.push_str("## Roles\n\n");
            let roles = (!analysis.roles.is_empty()).then(|| {
                analysis
                    .roles
                    .iter()
                    .map(|r| format!("{} ({} endpoints)", r.name, r.endpoints.len()))
                    .collect::<Vec<_>>()
                    .join(", ")
            });
            push_claims(&mut content, [Claim::verified(ClaimKey::Roles, roles)].iter());

            content.push_str("## Module Diagram\n\n");
            let diagram = mermaid_diagram(analysis);
            let summary = diagram.as_ref().map(|_| {
                format!(
                    "{} services, {} file imports",
                    analysis.services.len(),
                    analysis.dependencies.len()
                )
            });
            let claim = Claim::resolve(ClaimKey::DependencyGraph, None, summary);
            content.push_str(&claim.render());
            content.push_str("\n\n");
            if let Some(diagram) = diagram {
                content.push_str(&format!("```mermaid\n{}```\n\n", diagram));
            }
        }

        let remaining = findings.matching(|v| {
            v.entity_id != DOC_ENTITY_ID
                && !matches!(v.entity_type, EntityType::Api | EntityType::Controller)
        });
        findings.push_list(&mut content, "Findings", &remaining);
        content
    }
}

/// Shorthand for `DocumentSynthesizer::new().synthesize(..)`
pub fn synthesize(
    evidence: &RepoEvidence,
    rules: Option<&RulesResult>,
    fixes: Option<&[FixSuggestion]>,
) -> DocumentSet {
    DocumentSynthesizer::new().synthesize(evidence, rules, fixes)
}

// =============================================================================
// Claim builders
// =============================================================================

fn readme_claims(evidence: &RepoEvidence) -> Vec<Claim> {
    let meta = &evidence.meta;
    vec![
        Claim::verified(ClaimKey::Name, meta.name.clone()),
        Claim::verified(ClaimKey::Description, meta.description.clone()),
        Claim::verified(ClaimKey::Version, meta.version.clone()),
        Claim::verified(ClaimKey::License, meta.license.clone()),
        Claim::resolve(ClaimKey::ProjectKind, None, project_kind(&evidence.stack)),
        Claim::verified(
            ClaimKey::Languages,
            (!meta.languages.is_empty()).then(|| meta.languages.join(", ")),
        ),
        Claim::verified(ClaimKey::Stack, stack_summary(&evidence.stack)),
        Claim::verified(
            ClaimKey::Tests,
            evidence.files.has_tests.then(|| "Test files present".to_string()),
        ),
        Claim::verified(
            ClaimKey::Docker,
            evidence
                .files
                .has_docker
                .then(|| "Dockerfile or compose file present".to_string()),
        ),
    ]
}

fn setup_claims(evidence: &RepoEvidence) -> Vec<Claim> {
    vec![
        Claim::resolve(ClaimKey::Runtime, None, runtime(evidence)),
        Claim::resolve(
            ClaimKey::Install,
            evidence.script("setup").map(|s| script_value("setup", &s.command)),
            install_command(evidence),
        ),
        Claim::verified(
            ClaimKey::Environment,
            evidence
                .files
                .has_env_example
                .then(|| "Copy the example env file to `.env` and fill in the values".to_string()),
        ),
        Claim::resolve(
            ClaimKey::StartCommand,
            start_script(evidence),
            run_entry_file(evidence),
        ),
        Claim::resolve(
            ClaimKey::EntryPoint,
            (!evidence.structure.entry_files.is_empty())
                .then(|| code_list(&evidence.structure.entry_files)),
            entry_from_start_script(evidence),
        ),
        Claim::resolve(
            ClaimKey::TestCommand,
            evidence.script("test").map(|s| script_value("test", &s.command)),
            test_runner(evidence),
        ),
    ]
}

fn structure_claims(evidence: &RepoEvidence) -> Vec<Claim> {
    let structure = &evidence.structure;
    vec![
        Claim::verified(
            ClaimKey::Folders,
            (!structure.folders.is_empty()).then(|| code_list(&structure.folders)),
        ),
        Claim::verified(
            ClaimKey::ConfigFiles,
            (!structure.config_files.is_empty()).then(|| code_list(&structure.config_files)),
        ),
    ]
}

fn endpoint_claims(api: &ApiEndpoint) -> Vec<Claim> {
    let source = format!("`{}:{}` ({})", api.file_path, api.line, api.framework.label());
    let access_verified = (!api.roles.is_empty()).then(|| format!("Roles: {}", api.roles.join(", ")));
    let access_inferred = api
        .authenticated
        .then(|| "Authentication required".to_string());
    let docs = api.documented.then(|| {
        if api.documents_errors {
            "Doc comment attached, including error responses".to_string()
        } else {
            "Doc comment attached".to_string()
        }
    });

    vec![
        Claim::verified(ClaimKey::EndpointSource, Some(source)),
        Claim::resolve(ClaimKey::EndpointAccess, access_verified, access_inferred),
        Claim::verified(ClaimKey::EndpointDocs, docs),
    ]
}

// =============================================================================
// Heuristics (each named in the confidence table)
// =============================================================================

/// project-kind-from-stack
fn project_kind(stack: &StackEvidence) -> Option<String> {
    match (stack.frontend.is_empty(), stack.backend.is_empty()) {
        (false, false) => Some("Full-stack application".to_string()),
        (true, false) => Some("Backend service".to_string()),
        (false, true) => Some("Frontend application".to_string()),
        (true, true) => None,
    }
}

/// runtime-from-manifest
fn runtime(evidence: &RepoEvidence) -> Option<String> {
    let mut runtimes = Vec::new();
    if evidence.files.has_package_json {
        runtimes.push("Node.js with npm");
    }
    if has_python_manifest(evidence) {
        runtimes.push("Python 3 with pip");
    }
    (!runtimes.is_empty()).then(|| runtimes.join(", "))
}

/// install-command-from-manifest
fn install_command(evidence: &RepoEvidence) -> Option<String> {
    let mut commands = Vec::new();
    if evidence.files.has_package_json {
        commands.push("`npm install`");
    }
    if has_config_file(evidence, "requirements.txt") {
        commands.push("`pip install -r requirements.txt`");
    } else if has_config_file(evidence, "pyproject.toml") || has_config_file(evidence, "setup.py") {
        commands.push("`pip install -e .`");
    }
    (!commands.is_empty()).then(|| commands.join(" then "))
}

fn start_script(evidence: &RepoEvidence) -> Option<String> {
    evidence
        .script("start")
        .map(|s| script_value("start", &s.command))
        .or_else(|| evidence.script("dev").map(|s| script_value("dev", &s.command)))
}

/// run-command-from-entry-file
fn run_entry_file(evidence: &RepoEvidence) -> Option<String> {
    evidence.structure.entry_files.iter().find_map(|file| {
        if file.ends_with(".py") {
            Some(format!("`python {}`", file))
        } else if file.ends_with(".js") {
            Some(format!("`node {}`", file))
        } else {
            None
        }
    })
}

/// entry-from-start-script
fn entry_from_start_script(evidence: &RepoEvidence) -> Option<String> {
    let command = &evidence.script("start")?.command;
    command
        .split_whitespace()
        .filter(|token| !token.starts_with('-'))
        .find(|token| {
            [".js", ".mjs", ".cjs", ".ts", ".py"]
                .iter()
                .any(|ext| token.ends_with(ext))
        })
        .map(|file| format!("`{}` (from the `start` script)", file))
}

/// test-runner-from-dependencies
fn test_runner(evidence: &RepoEvidence) -> Option<String> {
    const RUNNERS: &[(&str, &str)] = &[
        ("pytest", "`pytest`"),
        ("jest", "`npx jest`"),
        ("vitest", "`npx vitest run`"),
        ("mocha", "`npx mocha`"),
    ];
    RUNNERS.iter().find_map(|(dep, command)| {
        evidence
            .dev_dependencies
            .iter()
            .chain(evidence.dependencies.iter())
            .any(|d| d == dep)
            .then(|| command.to_string())
    })
}

fn has_python_manifest(evidence: &RepoEvidence) -> bool {
    ["pyproject.toml", "requirements.txt", "setup.py"]
        .iter()
        .any(|f| has_config_file(evidence, f))
}

fn has_config_file(evidence: &RepoEvidence, name: &str) -> bool {
    evidence.structure.config_files.iter().any(|f| f == name)
}

// =============================================================================
// Setup guide
// =============================================================================

fn setup_guide(evidence: &RepoEvidence) -> String {
    let claims = setup_claims(evidence);

    let mut content = String::from("# Setup Guide\n\n");
    content.push_str("## Prerequisites\n\n");
    push_claims(&mut content, pick(&claims, &[ClaimKey::Runtime]));
    content.push_str("## Installation\n\n");
    push_claims(
        &mut content,
        pick(&claims, &[ClaimKey::Install, ClaimKey::Environment]),
    );
    content.push_str("## Running\n\n");
    push_claims(
        &mut content,
        pick(&claims, &[ClaimKey::StartCommand, ClaimKey::EntryPoint]),
    );
    content.push_str("## Testing\n\n");
    push_claims(&mut content, pick(&claims, &[ClaimKey::TestCommand]));
    content
}

fn pick<'c>(claims: &'c [Claim], keys: &'c [ClaimKey]) -> impl Iterator<Item = &'c Claim> {
    claims.iter().filter(move |c| keys.contains(&c.key))
}

// =============================================================================
// Rendering helpers
// =============================================================================

fn push_claims<'c>(content: &mut String, claims: impl Iterator<Item = &'c Claim>) {
    for claim in claims {
        content.push_str(&claim.render());
        content.push('\n');
    }
    content.push('\n');
}

fn code_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("`{}`", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn script_value(name: &str, command: &str) -> String {
    let invocation = match name {
        "start" | "test" => format!("npm {}", name),
        other => format!("npm run {}", other),
    };
    format!("`{}` runs `{}`", invocation, command)
}

fn stack_summary(stack: &StackEvidence) -> Option<String> {
    let parts: Vec<String> = [
        ("Frontend", &stack.frontend),
        ("Backend", &stack.backend),
        ("Database", &stack.database),
        ("Tools", &stack.tools),
    ]
    .iter()
    .filter(|(_, deps)| !deps.is_empty())
    .map(|(label, deps)| format!("{}: {}", label, deps.join(", ")))
    .collect();
    (!parts.is_empty()).then(|| parts.join("; "))
}

fn endpoint_summary(apis: &[ApiEndpoint]) -> String {
    let frameworks: BTreeSet<&str> = apis.iter().map(|a| a.framework.label()).collect();
    format!(
        "{} endpoints declared ({})",
        apis.len(),
        frameworks.into_iter().collect::<Vec<_>>().join(", ")
    )
}

/// Violations plus AI fixes keyed by violation id
struct Findings<'a> {
    violations: &'a [RuleViolation],
    score: Option<u32>,
    fixes: HashMap<&'a str, &'a FixSuggestion>,
}

impl<'a> Findings<'a> {
    fn new(rules: Option<&'a RulesResult>, fixes: Option<&'a [FixSuggestion]>) -> Self {
        let mut by_violation = HashMap::new();
        for fix in fixes.unwrap_or_default() {
            by_violation.entry(fix.violation_id.as_str()).or_insert(fix);
        }
        Self {
            violations: rules.map(|r| r.violations.as_slice()).unwrap_or_default(),
            score: rules.map(|r| r.score),
            fixes: by_violation,
        }
    }

    fn for_entity<'s>(&'s self, entity_id: &'s str) -> impl Iterator<Item = &'a RuleViolation> + 's {
        self.violations.iter().filter(move |v| v.entity_id == entity_id)
    }

    fn matching(&self, predicate: impl Fn(&RuleViolation) -> bool) -> Vec<&'a RuleViolation> {
        self.violations.iter().filter(|v| predicate(v)).collect()
    }

    fn render(&self, violation: &RuleViolation) -> String {
        let mut line = format!(
            "- **{}** `{}`: {} _({}: rule `{}`)_\n",
            violation.severity,
            violation.rule_name,
            violation.message,
            Confidence::Verified,
            violation.rule_name
        );
        if let Some(suggestion) = &violation.suggestion {
            line.push_str(&format!("  - Remediation: {}\n", suggestion));
        }
        if let Some(fix) = self.fixes.get(violation.id.as_str()) {
            line.push_str(&format!(
                "  - AI suggestion (enhancement, confidence {:.0}%): {}\n",
                fix.confidence * 100.0,
                fix.suggested.trim()
            ));
        }
        line
    }

    fn push_list(&self, content: &mut String, title: &str, violations: &[&RuleViolation]) {
        if violations.is_empty() {
            return;
        }
        content.push_str(&format!("## {}\n\n", title));
        for violation in violations {
            content.push_str(&self.render(violation));
        }
        content.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        FileFlags, HttpMethod, MetaEvidence, RouteFramework, ScriptEntry, Severity,
        StructureEvidence,
    };
    use proptest::prelude::*;

    fn api(path: &str, documented: bool, roles: &[&str]) -> ApiEndpoint {
        ApiEndpoint {
            id: format!("api:GET {}@src/api/users.js:3", path),
            method: HttpMethod::Get,
            path: path.to_string(),
            controller: Some("users".into()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            file_path: "src/api/users.js".into(),
            line: 3,
            framework: RouteFramework::Express,
            documented,
            documents_errors: false,
            authenticated: !roles.is_empty(),
        }
    }

    fn violation(id: &str, entity_id: &str, entity_type: EntityType) -> RuleViolation {
        RuleViolation {
            id: id.to_string(),
            rule_name: "api-endpoint-documented".into(),
            severity: Severity::Warning,
            message: "GET /users has no documentation".into(),
            entity_id: entity_id.to_string(),
            entity_type,
            suggestion: Some("Add a doc comment".into()),
        }
    }

    fn node_evidence() -> RepoEvidence {
        RepoEvidence {
            meta: MetaEvidence {
                name: Some("orders".into()),
                description: Some("Order service".into()),
                version: Some("1.2.0".into()),
                license: None,
                languages: vec!["JavaScript".into()],
            },
            stack: StackEvidence {
                backend: vec!["Express".into()],
                ..Default::default()
            },
            files: FileFlags {
                has_package_json: true,
                has_readme: true,
                ..Default::default()
            },
            structure: StructureEvidence {
                folders: vec!["src".into()],
                entry_files: Vec::new(),
                config_files: vec!["package.json".into()],
            },
            scripts: vec![ScriptEntry {
                name: "start".into(),
                command: "node src/server.js".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_repository_readme_reports_missing_description() {
        let docs = synthesize(&RepoEvidence::default(), None, None);
        assert!(docs.readme.contains("## Description"));
        assert!(docs
            .readme
            .contains("- **Description**: _(Missing)_ Remediation: Add a one-sentence `description`"));
        assert!(!docs.readme.contains("(Verified"));
        assert!(!docs.setup_guide.contains("(Verified"));
        assert!(!docs.setup_guide.contains("(Inferred"));
    }

    #[test]
    fn test_verified_and_inferred_claims() {
        let docs = synthesize(&node_evidence(), None, None);
        assert!(docs
            .readme
            .contains("- **Description**: Order service _(Verified: `meta.description`)_"));
        assert!(docs.readme.contains("- **License**: _(Missing)_"));
        assert!(docs.readme.contains("Backend service _(Inferred: project-kind-from-stack)_"));
        assert!(docs
            .setup_guide
            .contains("`src/server.js` (from the `start` script) _(Inferred: entry-from-start-script)_"));
        assert!(docs
            .setup_guide
            .contains("`npm start` runs `node src/server.js` _(Verified: `scripts.start`)_"));
    }

    #[test]
    fn test_every_claim_line_has_exactly_one_marker() {
        let analysis = AnalysisResult {
            apis: vec![api("/users", false, &[])],
            ..Default::default()
        };
        let docs = DocumentSynthesizer::new()
            .with_analysis(&analysis)
            .synthesize(&node_evidence(), None, None);
        for (_, section) in docs.sections() {
            for line in section.lines().filter(|l| l.starts_with("- **")) {
                let markers = ["_(Verified", "_(Inferred", "_(Missing)_"]
                    .iter()
                    .filter(|m| line.contains(*m))
                    .count();
                assert_eq!(markers, 1, "line without a single marker: {}", line);
            }
        }
    }

    #[test]
    fn test_violations_inline_with_ai_fix() {
        let analysis = AnalysisResult {
            apis: vec![api("/users", false, &["admin"])],
            ..Default::default()
        };
        let api_id = analysis.apis[0].id.clone();
        let rules = RulesResult {
            violations: vec![violation("api-endpoint-documented:x", &api_id, EntityType::Api)],
            score: 95,
            ..Default::default()
        };
        let fixes = vec![FixSuggestion {
            violation_id: "api-endpoint-documented:x".into(),
            original: "GET /users has no documentation".into(),
            suggested: "Returns all users.".into(),
            confidence: 0.6,
        }];

        let docs = DocumentSynthesizer::new()
            .with_analysis(&analysis)
            .synthesize(&node_evidence(), Some(&rules), Some(&fixes));

        let endpoint = docs.api_docs.find("## GET /users").unwrap();
        let warning = docs.api_docs.find("GET /users has no documentation").unwrap();
        let fix = docs.api_docs.find("AI suggestion (enhancement, confidence 60%): Returns all users.").unwrap();
        assert!(endpoint < warning && warning < fix);
        assert!(docs.api_docs.contains("Roles: admin _(Verified: `roles`)_"));
        assert!(docs.readme.contains("95/100"));
        assert!(!docs.api_docs.contains("## Findings"));
    }

    #[test]
    fn test_output_without_fixes_keeps_baseline() {
        let analysis = AnalysisResult {
            apis: vec![api("/users", false, &[])],
            ..Default::default()
        };
        let rules = RulesResult {
            violations: vec![violation("v1", &analysis.apis[0].id, EntityType::Api)],
            ..Default::default()
        };
        let synthesizer = DocumentSynthesizer::new().with_analysis(&analysis);
        let plain = synthesizer.synthesize(&node_evidence(), Some(&rules), None);
        let fixes = vec![FixSuggestion {
            violation_id: "v1".into(),
            original: String::new(),
            suggested: "Document it".into(),
            confidence: 0.6,
        }];
        let enhanced = synthesizer.synthesize(&node_evidence(), Some(&rules), Some(&fixes));

        for line in plain.api_docs.lines() {
            assert!(enhanced.api_docs.contains(line));
        }
        assert!(!plain.api_docs.contains("AI suggestion"));
    }

    #[test]
    fn test_unrendered_api_violations_listed() {
        let rules = RulesResult {
            violations: vec![violation("v1", "api:GET /x@a.js:1", EntityType::Api)],
            ..Default::default()
        };
        let docs = synthesize(&RepoEvidence::default(), Some(&rules), None);
        assert!(docs.api_docs.contains("## Findings"));
        assert!(!docs.architecture.contains("## Findings"));
    }

    #[test]
    fn test_architecture_diagram_is_inferred() {
        let analysis = AnalysisResult {
            relationships: vec![crate::types::Relationship::new(
                "file:src/a.js",
                "file:src/b.js",
                crate::types::RelationshipType::Imports,
            )],
            ..Default::default()
        };
        let docs = DocumentSynthesizer::new()
            .with_analysis(&analysis)
            .synthesize(&RepoEvidence::default(), None, None);
        assert!(docs.architecture.contains("_(Inferred: mermaid-from-graph)_"));
        assert!(docs.architecture.contains("```mermaid\ngraph TD\n"));
        assert!(docs.architecture.contains("- **Services**: _(Missing)_"));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let evidence = node_evidence();
        assert_eq!(synthesize(&evidence, None, None), synthesize(&evidence, None, None));
    }

    proptest! {
        #[test]
        fn prop_no_hallucination(
            name in proptest::option::of("[a-z]{0,8}"),
            description in proptest::option::of("[a-z ]{0,12}"),
            has_tests in any::<bool>(),
            has_docker in any::<bool>(),
            has_env in any::<bool>(),
            folders in proptest::collection::vec("[a-z]{1,6}", 0..3),
        ) {
            let evidence = RepoEvidence {
                meta: MetaEvidence { name: name.clone(), description: description.clone(), ..Default::default() },
                files: FileFlags { has_tests, has_docker, has_env_example: has_env, ..Default::default() },
                structure: StructureEvidence { folders: folders.clone(), ..Default::default() },
                ..Default::default()
            };
            let present = |v: &Option<String>| v.as_ref().is_some_and(|s| !s.trim().is_empty());

            for claim in DocumentSynthesizer::new().evidence_claims(&evidence) {
                let backed = match claim.key {
                    ClaimKey::Name => present(&name),
                    ClaimKey::Description => present(&description),
                    ClaimKey::Tests => has_tests,
                    ClaimKey::Docker => has_docker,
                    ClaimKey::Environment => has_env,
                    ClaimKey::Folders => !folders.is_empty(),
                    _ => continue,
                };
                prop_assert_eq!(claim.confidence == Confidence::Verified, backed);
                prop_assert_eq!(claim.confidence == Confidence::Missing, !backed);
            }
        }
    }
}
