//! Confidence heuristic table.
//!
//! Every claim the synthesizer can make is listed here with the evidence
//! field that verifies it, the named heuristic allowed to infer it, and the
//! remediation shown when it is missing. The synthesizer never chooses a
//! confidence level on its own; it hands both candidate values to
//! [`Claim::resolve`].

use crate::types::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimKey {
    Name,
    Description,
    Version,
    License,
    Languages,
    Stack,
    ProjectKind,
    Tests,
    Docker,
    Runtime,
    Install,
    Environment,
    StartCommand,
    EntryPoint,
    TestCommand,
    ApiEndpoints,
    EndpointSource,
    EndpointAccess,
    EndpointDocs,
    ApiLayout,
    Folders,
    ConfigFiles,
    Services,
    Roles,
    DependencyGraph,
    QualityScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimSpec {
    pub label: &'static str,
    /// Evidence field that makes the claim Verified
    pub evidence: &'static str,
    /// Named heuristic that may make the claim Inferred
    pub heuristic: Option<&'static str>,
    /// Actionable instruction rendered with a Missing claim
    pub remediation: &'static str,
}

const fn spec(
    label: &'static str,
    evidence: &'static str,
    heuristic: Option<&'static str>,
    remediation: &'static str,
) -> ClaimSpec {
    ClaimSpec {
        label,
        evidence,
        heuristic,
        remediation,
    }
}

impl ClaimKey {
    pub fn spec(&self) -> ClaimSpec {
        match self {
            Self::Name => spec(
                "Name",
                "meta.name",
                None,
                "Add a `name` field to package.json or the [project] table of pyproject.toml.",
            ),
            Self::Description => spec(
                "Description",
                "meta.description",
                None,
                "Add a one-sentence `description` to package.json or pyproject.toml so readers know what the project does.",
            ),
            Self::Version => spec(
                "Version",
                "meta.version",
                None,
                "Set a `version` in the project manifest and tag releases with it.",
            ),
            Self::License => spec(
                "License",
                "meta.license",
                None,
                "Add a LICENSE file and a matching `license` field to the manifest.",
            ),
            Self::Languages => spec(
                "Languages",
                "meta.languages",
                None,
                "Commit the project's source files; no programming-language files were found.",
            ),
            Self::Stack => spec(
                "Tech stack",
                "stack",
                None,
                "Declare runtime dependencies in package.json, pyproject.toml or requirements.txt.",
            ),
            Self::ProjectKind => spec(
                "Project type",
                "stack",
                Some("project-kind-from-stack"),
                "Declare the frontend or backend framework as a dependency so the project type can be determined.",
            ),
            Self::Tests => spec(
                "Tests",
                "files.hasTests",
                None,
                "Add automated tests (a tests/ directory, *.test.ts or test_*.py files).",
            ),
            Self::Docker => spec(
                "Container setup",
                "files.hasDocker",
                None,
                "Add a Dockerfile or docker-compose.yml describing how to run the project in a container.",
            ),
            Self::Runtime => spec(
                "Runtime",
                "engines",
                Some("runtime-from-manifest"),
                "Add a dependency manifest (package.json, pyproject.toml or requirements.txt) that identifies the runtime.",
            ),
            Self::Install => spec(
                "Install dependencies",
                "scripts.setup",
                Some("install-command-from-manifest"),
                "Add a dependency manifest so contributors know how to install dependencies.",
            ),
            Self::Environment => spec(
                "Environment",
                "files.hasEnvExample",
                None,
                "Add a .env.example listing every environment variable the application reads.",
            ),
            Self::StartCommand => spec(
                "Start command",
                "scripts.start",
                Some("run-command-from-entry-file"),
                "Add a `start` (or `dev`) script to package.json, or document the command that runs the project.",
            ),
            Self::EntryPoint => spec(
                "Entry point",
                "structure.entryFiles",
                Some("entry-from-start-script"),
                "Add a conventional entry file (src/index.ts, main.py, app.py) or a `main` field in package.json.",
            ),
            Self::TestCommand => spec(
                "Test command",
                "scripts.test",
                Some("test-runner-from-dependencies"),
                "Add a `test` script to package.json or a test runner (pytest, jest, vitest) to the dev dependencies.",
            ),
            Self::ApiEndpoints => spec(
                "Endpoints",
                "route declarations",
                None,
                "Declare HTTP routes with a recognised convention (Express, NestJS, FastAPI, Flask) or document the API by hand in docs/api.md.",
            ),
            Self::EndpointSource => spec(
                "Declared in",
                "route declarations",
                None,
                "Keep route declarations in source so they can be traced to a file and line.",
            ),
            Self::EndpointAccess => spec(
                "Access",
                "roles",
                Some("access-from-auth-marker"),
                "If this endpoint should be protected, add a role or authentication guard; otherwise state in its doc comment that it is public.",
            ),
            Self::EndpointDocs => spec(
                "Description",
                "doc comment",
                None,
                "Add a doc comment or docstring above the handler describing its purpose, parameters and error responses.",
            ),
            Self::ApiLayout => spec(
                "Route files",
                "apiEvidence.routes",
                None,
                "Group HTTP handlers under an api/ or routes/ directory.",
            ),
            Self::Folders => spec(
                "Top-level folders",
                "structure.folders",
                None,
                "Organise sources into top-level folders such as src/ and tests/.",
            ),
            Self::ConfigFiles => spec(
                "Configuration files",
                "structure.configFiles",
                None,
                "Commit the project's configuration files (tsconfig.json, pyproject.toml, Dockerfile).",
            ),
            Self::Services => spec(
                "Services",
                "services",
                None,
                "Place each service under services/<name>/ or name its module *.service.ts so it can be documented.",
            ),
            Self::Roles => spec(
                "Roles",
                "roles",
                None,
                "Guard protected routes with explicit role checks such as requireRole('admin') or @Roles('admin').",
            ),
            Self::DependencyGraph => spec(
                "Module diagram",
                "dependencies",
                Some("mermaid-from-graph"),
                "No services, controllers or internal imports were detected; describe the module layout by hand.",
            ),
            Self::QualityScore => spec(
                "Quality score",
                "rulesResult.score",
                None,
                "Run validation to compute a documentation quality score.",
            ),
        }
    }
}

/// A synthesized statement with exactly one confidence marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub key: ClaimKey,
    pub confidence: Confidence,
    /// Rendered value; `None` only for Missing claims
    pub value: Option<String>,
}

impl Claim {
    /// Pick the confidence for `key`: Verified when the evidence value is
    /// present, Inferred when the key has a heuristic and it produced a
    /// value, Missing otherwise.
    pub fn resolve(key: ClaimKey, verified: Option<String>, inferred: Option<String>) -> Self {
        let verified = verified.filter(|v| !v.trim().is_empty());
        let inferred = inferred
            .filter(|v| !v.trim().is_empty())
            .filter(|_| key.spec().heuristic.is_some());

        match (verified, inferred) {
            (Some(value), _) => Self {
                key,
                confidence: Confidence::Verified,
                value: Some(value),
            },
            (None, Some(value)) => Self {
                key,
                confidence: Confidence::Inferred,
                value: Some(value),
            },
            (None, None) => Self {
                key,
                confidence: Confidence::Missing,
                value: None,
            },
        }
    }

    pub fn verified(key: ClaimKey, value: Option<String>) -> Self {
        Self::resolve(key, value, None)
    }

    /// Markdown list item carrying the confidence marker
    pub fn render(&self) -> String {
        let spec = self.key.spec();
        match (self.confidence, &self.value) {
            (Confidence::Verified, Some(value)) => format!(
                "- **{}**: {} _(Verified: `{}`)_",
                spec.label, value, spec.evidence
            ),
            (Confidence::Inferred, Some(value)) => format!(
                "- **{}**: {} _(Inferred: {})_",
                spec.label,
                value,
                spec.heuristic.unwrap_or("heuristic")
            ),
            _ => format!(
                "- **{}**: _(Missing)_ Remediation: {}",
                spec.label, spec.remediation
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_verified() {
        let claim = Claim::resolve(ClaimKey::EntryPoint, Some("src/index.ts".into()), Some("x".into()));
        assert_eq!(claim.confidence, Confidence::Verified);
    }

    #[test]
    fn test_inferred_requires_named_heuristic() {
        let claim = Claim::resolve(ClaimKey::Description, None, Some("guess".into()));
        assert_eq!(claim.confidence, Confidence::Missing);

        let claim = Claim::resolve(ClaimKey::EntryPoint, None, Some("src/server.js".into()));
        assert_eq!(claim.confidence, Confidence::Inferred);
        assert!(claim.render().contains("entry-from-start-script"));
    }

    #[test]
    fn test_blank_values_are_missing() {
        let claim = Claim::verified(ClaimKey::Name, Some("  ".into()));
        assert_eq!(claim.confidence, Confidence::Missing);
        assert!(claim.render().contains("Remediation:"));
    }
}
