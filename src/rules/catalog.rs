//! Rule catalog.
//!
//! Each rule is a pure function of the analysis graph and the supplied
//! documentation. Severity and penalty belong to the rule definition.

use std::collections::{BTreeMap, BTreeSet};

use super::markdown::DocOutline;
use crate::constants::rules::{DOC_ENTITY_ID, MAX_HEADING_DEPTH};
use crate::types::{AnalysisResult, ApiEndpoint, EntityType, Result, Severity};

// =============================================================================
// Rule Interface
// =============================================================================

/// Existing documentation the rules are checked against
#[derive(Debug, Clone)]
pub struct DocContent<'a> {
    pub raw: &'a str,
    pub outline: DocOutline,
    lower: String,
}

impl<'a> DocContent<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            outline: DocOutline::parse(raw),
            lower: raw.to_lowercase(),
        }
    }

    /// Case-insensitive mention of `term` anywhere in the document
    pub fn mentions(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        !term.is_empty() && self.lower.contains(&term)
    }
}

pub struct RuleContext<'a> {
    pub analysis: &'a AnalysisResult,
    pub doc: Option<&'a DocContent<'a>>,
}

/// One problem reported by a rule, before the engine assigns its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub message: String,
    pub suggestion: Option<String>,
}

impl Finding {
    pub fn new(entity_id: impl Into<String>, entity_type: EntityType, message: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_type,
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    fn for_api(api: &ApiEndpoint, message: impl Into<String>) -> Self {
        Self::new(api.id.clone(), EntityType::Api, message)
    }

    fn for_doc(message: impl Into<String>) -> Self {
        Self::new(DOC_ENTITY_ID, EntityType::File, message)
    }
}

pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn severity(&self) -> Severity;

    /// Score points deducted per violation
    fn penalty(&self) -> u32 {
        match self.severity() {
            Severity::Error => 15,
            Severity::Warning => 5,
            Severity::Info => 1,
        }
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>>;
}

/// The fixed catalog, in evaluation order
pub fn default_catalog() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(ApiEndpointDocumented),
        Box::new(ApiEndpointRoles),
        Box::new(PublicEndpointErrorResponses),
        Box::new(ServiceReferencedInReadme),
        Box::new(RoleReferencedInDocs),
        Box::new(CircularImport),
        Box::new(DocRequiredSections),
        Box::new(DocHeadingSequence),
        Box::new(DocHeadingDepth),
        Box::new(DocImageAltText),
    ]
}

// =============================================================================
// Graph Rules
// =============================================================================

pub struct ApiEndpointDocumented;

impl Rule for ApiEndpointDocumented {
    fn name(&self) -> &'static str {
        "api-endpoint-documented"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        Ok(ctx
            .analysis
            .apis
            .iter()
            .filter(|api| !api.documented)
            .map(|api| {
                Finding::for_api(
                    api,
                    format!(
                        "{} ({}:{}) has no inline documentation",
                        api.signature(),
                        api.file_path,
                        api.line
                    ),
                )
                .with_suggestion(
                    "Add a doc comment or docstring above the route describing its purpose, parameters and responses",
                )
            })
            .collect())
    }
}

pub struct ApiEndpointRoles;

impl Rule for ApiEndpointRoles {
    fn name(&self) -> &'static str {
        "api-endpoint-roles"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        Ok(ctx
            .analysis
            .apis
            .iter()
            .filter(|api| api.roles.is_empty())
            .map(|api| {
                Finding::for_api(api, format!("{} does not declare required roles", api.signature()))
                    .with_suggestion(
                        "Declare the roles allowed to call this endpoint (role guard, decorator or middleware)",
                    )
            })
            .collect())
    }
}

pub struct PublicEndpointErrorResponses;

impl Rule for PublicEndpointErrorResponses {
    fn name(&self) -> &'static str {
        "public-endpoint-error-responses"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        Ok(ctx
            .analysis
            .apis
            .iter()
            .filter(|api| api.is_public() && !api.documents_errors)
            .map(|api| {
                Finding::for_api(
                    api,
                    format!("Public endpoint {} does not document its error responses", api.signature()),
                )
                .with_suggestion("Document the error status codes this endpoint can return (e.g. 400, 404)")
            })
            .collect())
    }
}

pub struct ServiceReferencedInReadme;

impl Rule for ServiceReferencedInReadme {
    fn name(&self) -> &'static str {
        "service-referenced-in-readme"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(doc) = ctx.doc else {
            return Ok(Vec::new());
        };
        Ok(ctx
            .analysis
            .services
            .iter()
            .filter(|service| !doc.mentions(&service.name))
            .map(|service| {
                Finding::new(
                    service.id.clone(),
                    EntityType::Service,
                    format!("Service '{}' is not referenced in the README", service.name),
                )
                .with_suggestion(format!(
                    "Describe the '{}' service ({}) in the README architecture section",
                    service.name, service.path
                ))
            })
            .collect())
    }
}

pub struct RoleReferencedInDocs;

impl Rule for RoleReferencedInDocs {
    fn name(&self) -> &'static str {
        "role-referenced-in-docs"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(doc) = ctx.doc else {
            return Ok(Vec::new());
        };
        Ok(ctx
            .analysis
            .roles
            .iter()
            .filter(|role| !doc.mentions(&role.name))
            .map(|role| {
                Finding::new(
                    role.id.clone(),
                    EntityType::Role,
                    format!("Role '{}' is not documented", role.name),
                )
                .with_suggestion(format!(
                    "List the '{}' role and the {} endpoint(s) it guards",
                    role.name,
                    role.endpoints.len()
                ))
            })
            .collect())
    }
}

pub struct CircularImport;

impl Rule for CircularImport {
    fn name(&self) -> &'static str {
        "circular-import"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let mut edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for dep in &ctx.analysis.dependencies {
            edges.entry(dep.from.as_str()).or_default().push(dep.to.as_str());
        }

        Ok(files_in_cycles(&edges)
            .into_iter()
            .map(|path| {
                Finding::new(
                    format!("file:{}", path),
                    EntityType::File,
                    format!("{} is part of an import cycle", path),
                )
                .with_suggestion("Move the shared code into a module both sides can import")
            })
            .collect())
    }
}

/// Nodes that can reach themselves again
fn files_in_cycles<'a>(edges: &BTreeMap<&'a str, Vec<&'a str>>) -> BTreeSet<&'a str> {
    let mut in_cycle = BTreeSet::new();
    for &start in edges.keys() {
        let mut stack: Vec<&str> = edges.get(start).cloned().unwrap_or_default();
        let mut seen = BTreeSet::new();
        while let Some(node) = stack.pop() {
            if node == start {
                in_cycle.insert(start);
                break;
            }
            if seen.insert(node)
                && let Some(next) = edges.get(node)
            {
                stack.extend(next.iter().copied());
            }
        }
    }
    in_cycle
}

// =============================================================================
// Documentation Structure Rules
// =============================================================================

/// `(section, keywords)`; a section is present when any heading contains a keyword
const REQUIRED_SECTIONS: &[(&str, &[&str])] = &[
    ("Introduction", &["introduction", "intro", "overview", "about", "getting started"]),
    ("Installation", &["installation", "install", "setup", "getting started"]),
    ("Usage", &["usage", "example", "quick start", "quickstart", "how to use"]),
    ("Troubleshooting", &["troubleshooting", "troubleshoot", "faq", "problems", "issues"]),
];

pub struct DocRequiredSections;

impl Rule for DocRequiredSections {
    fn name(&self) -> &'static str {
        "doc-required-sections"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(doc) = ctx.doc else {
            return Ok(Vec::new());
        };
        let titles = doc.outline.section_titles();

        Ok(REQUIRED_SECTIONS
            .iter()
            .filter(|(_, keywords)| {
                !titles
                    .iter()
                    .any(|title| keywords.iter().any(|k| title.contains(k)))
            })
            .map(|(section, _)| {
                Finding::for_doc(format!("Missing required section: {}", section))
                    .with_suggestion(format!("Add a '## {}' section to the README", section))
            })
            .collect())
    }
}

pub struct DocHeadingSequence;

impl Rule for DocHeadingSequence {
    fn name(&self) -> &'static str {
        "doc-heading-sequence"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn penalty(&self) -> u32 {
        10
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(doc) = ctx.doc else {
            return Ok(Vec::new());
        };
        Ok(doc
            .outline
            .headings
            .windows(2)
            .filter(|pair| pair[1].level > pair[0].level + 1)
            .map(|pair| {
                Finding::for_doc(format!(
                    "Heading level jumps from H{} to H{} (skipped levels) at line {}",
                    pair[0].level, pair[1].level, pair[1].line
                ))
                .with_suggestion(format!(
                    "Change '{}' to H{}",
                    pair[1].title,
                    pair[0].level + 1
                ))
            })
            .collect())
    }
}

pub struct DocHeadingDepth;

impl Rule for DocHeadingDepth {
    fn name(&self) -> &'static str {
        "doc-heading-depth"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(doc) = ctx.doc else {
            return Ok(Vec::new());
        };
        Ok(doc
            .outline
            .headings
            .iter()
            .filter(|h| h.level > MAX_HEADING_DEPTH)
            .map(|h| {
                Finding::for_doc(format!(
                    "Heading H{} '{}' is too deep (recommend max H{})",
                    h.level, h.title, MAX_HEADING_DEPTH
                ))
                .with_suggestion("Flatten the section or split it into its own document")
            })
            .collect())
    }
}

pub struct DocImageAltText;

impl Rule for DocImageAltText {
    fn name(&self) -> &'static str {
        "doc-image-alt-text"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(doc) = ctx.doc else {
            return Ok(Vec::new());
        };
        Ok(doc
            .outline
            .images
            .iter()
            .filter(|img| img.alt.is_empty())
            .map(|img| {
                Finding::for_doc(format!(
                    "Image '{}' on line {} is missing alt text",
                    img.src, img.line
                ))
                .with_suggestion("Describe what the image shows in its alt text")
            })
            .collect())
    }
}
