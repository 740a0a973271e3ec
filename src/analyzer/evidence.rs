//! Evidence Extractor
//!
//! Pure extraction of deterministic repository facts from a snapshot.
//! Every populated field corresponds to an artifact that was actually
//! found: a manifest field, a file, a directory or an exact dependency
//! name match in the classification table. Nothing here fails; a manifest
//! that cannot be read leaves its fields at the "not found" value.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::classification::{StackCategory, classify};
use super::parser::Language;
use super::scanner::RepoSnapshot;
use crate::types::{
    ApiEvidence, EvidocError, FileFlags, MetaEvidence, RepoEvidence, ScriptEntry, StackEvidence,
    StructureEvidence,
};

// =============================================================================
// Artifact Tables
// =============================================================================

const ENTRY_FILES: &[&str] = &[
    "index.js",
    "index.ts",
    "main.js",
    "main.ts",
    "server.js",
    "server.ts",
    "app.js",
    "app.ts",
    "src/index.js",
    "src/index.ts",
    "src/index.tsx",
    "src/main.js",
    "src/main.ts",
    "src/main.tsx",
    "src/server.js",
    "src/server.ts",
    "src/app.js",
    "src/app.ts",
    "main.py",
    "app.py",
    "manage.py",
    "wsgi.py",
    "asgi.py",
    "src/main.py",
    "app/main.py",
];

const CONFIG_FILES: &[&str] = &[
    "package.json",
    "tsconfig.json",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "requirements.txt",
    "tox.ini",
    "pytest.ini",
    "Makefile",
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yaml",
    "nest-cli.json",
    ".prettierrc",
    ".editorconfig",
];

const CONFIG_PREFIXES: &[&str] = &[
    ".eslintrc",
    "eslint.config.",
    "vite.config.",
    "webpack.config.",
    "next.config.",
    "jest.config.",
    "vitest.config.",
    "babel.config.",
    "tailwind.config.",
    "rollup.config.",
];

const ENV_EXAMPLES: &[&str] = &[".env.example", ".env.sample", ".env.template"];

const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec"];

/// `(header marker, SPDX identifier)` recognised at the top of a LICENSE file
const LICENSE_MARKERS: &[(&str, &str)] = &[
    ("MIT License", "MIT"),
    ("Apache License", "Apache-2.0"),
    ("GNU AFFERO GENERAL PUBLIC LICENSE", "AGPL-3.0"),
    ("GNU LESSER GENERAL PUBLIC LICENSE", "LGPL-3.0"),
    ("GNU GENERAL PUBLIC LICENSE", "GPL-3.0"),
    ("Mozilla Public License", "MPL-2.0"),
    ("BSD 3-Clause License", "BSD-3-Clause"),
    ("BSD 2-Clause License", "BSD-2-Clause"),
    ("The Unlicense", "Unlicense"),
    ("ISC License", "ISC"),
];

// =============================================================================
// Extractor
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceExtractor;

impl EvidenceExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, snapshot: &RepoSnapshot) -> RepoEvidence {
        let mut manifest = ManifestFacts::default();
        if let Some(content) = snapshot.content("package.json") {
            manifest.merge_package_json(content);
        }
        if let Some(content) = snapshot.content("pyproject.toml") {
            manifest.merge_pyproject(content);
        }
        for (file, dev) in [("requirements.txt", false), ("requirements-dev.txt", true)] {
            if let Some(content) = snapshot.content(file) {
                manifest.merge_requirements(content, dev);
            }
        }

        let mut meta = MetaEvidence {
            name: manifest.name,
            description: manifest.description,
            version: manifest.version,
            license: manifest.license,
            languages: language_histogram(snapshot),
        };
        if meta.license.is_none() {
            meta.license = license_from_file(snapshot);
        }

        let dependencies: Vec<String> = manifest.dependencies.into_iter().collect();
        let dev_dependencies: Vec<String> = manifest.dev_dependencies.into_iter().collect();
        let stack = classify_stack(dependencies.iter().chain(dev_dependencies.iter()));

        let evidence = RepoEvidence {
            meta,
            stack,
            files: file_flags(snapshot),
            structure: structure(snapshot, manifest.main.as_deref()),
            api_evidence: api_evidence(snapshot),
            dependencies,
            dev_dependencies,
            scripts: manifest
                .scripts
                .into_iter()
                .map(|(name, command)| ScriptEntry { name, command })
                .collect(),
        };

        debug!(
            languages = evidence.meta.languages.len(),
            dependencies = evidence.dependencies.len(),
            "Evidence extracted"
        );
        evidence
    }
}

// =============================================================================
// Manifests
// =============================================================================

/// Facts read from dependency manifests; the first manifest to provide a
/// metadata field wins, dependency sets are unions.
#[derive(Debug, Default)]
struct ManifestFacts {
    name: Option<String>,
    description: Option<String>,
    version: Option<String>,
    license: Option<String>,
    main: Option<String>,
    dependencies: BTreeSet<String>,
    dev_dependencies: BTreeSet<String>,
    scripts: BTreeMap<String, String>,
}

impl ManifestFacts {
    fn merge_package_json(&mut self, content: &str) {
        let value: serde_json::Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %EvidocError::extraction("package.json", e.to_string()), "Manifest ignored");
                return;
            }
        };

        fill(&mut self.name, non_empty_str(&value["name"]));
        fill(&mut self.description, non_empty_str(&value["description"]));
        fill(&mut self.version, non_empty_str(&value["version"]));
        fill(
            &mut self.license,
            non_empty_str(&value["license"]).or_else(|| non_empty_str(&value["license"]["type"])),
        );
        fill(&mut self.main, non_empty_str(&value["main"]));

        for key in ["dependencies", "peerDependencies", "devDependencies"] {
            let Some(map) = value[key].as_object() else {
                continue;
            };
            let target = if key == "devDependencies" {
                &mut self.dev_dependencies
            } else {
                &mut self.dependencies
            };
            target.extend(map.keys().cloned());
        }

        if let Some(scripts) = value["scripts"].as_object() {
            for (name, command) in scripts {
                if let Some(command) = command.as_str() {
                    self.scripts
                        .entry(name.clone())
                        .or_insert_with(|| command.to_string());
                }
            }
        }
    }

    fn merge_pyproject(&mut self, content: &str) {
        let value: toml::Value = match toml::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %EvidocError::extraction("pyproject.toml", e.to_string()), "Manifest ignored");
                return;
            }
        };

        // PEP 621 first, then Poetry
        for table in [value.get("project"), value.get("tool").and_then(|t| t.get("poetry"))]
            .into_iter()
            .flatten()
        {
            fill(&mut self.name, toml_str(table.get("name")));
            fill(&mut self.description, toml_str(table.get("description")));
            fill(&mut self.version, toml_str(table.get("version")));
            fill(
                &mut self.license,
                toml_str(table.get("license"))
                    .or_else(|| toml_str(table.get("license").and_then(|l| l.get("text")))),
            );
        }

        if let Some(project) = value.get("project") {
            if let Some(deps) = project.get("dependencies").and_then(|d| d.as_array()) {
                self.dependencies
                    .extend(deps.iter().filter_map(|d| d.as_str()).filter_map(requirement_name));
            }
            if let Some(optional) = project.get("optional-dependencies").and_then(|d| d.as_table()) {
                for group in ["dev", "test"] {
                    if let Some(deps) = optional.get(group).and_then(|d| d.as_array()) {
                        self.dev_dependencies.extend(
                            deps.iter().filter_map(|d| d.as_str()).filter_map(requirement_name),
                        );
                    }
                }
            }
            if let Some(scripts) = project.get("scripts").and_then(|s| s.as_table()) {
                for (name, target) in scripts {
                    if let Some(target) = target.as_str() {
                        self.scripts
                            .entry(name.clone())
                            .or_insert_with(|| target.to_string());
                    }
                }
            }
        }

        if let Some(poetry) = value.get("tool").and_then(|t| t.get("poetry")) {
            if let Some(deps) = poetry.get("dependencies").and_then(|d| d.as_table()) {
                self.dependencies.extend(
                    deps.keys()
                        .filter(|k| k.as_str() != "python")
                        .map(|k| k.to_ascii_lowercase()),
                );
            }
            let dev_tables = [
                poetry.get("dev-dependencies"),
                poetry
                    .get("group")
                    .and_then(|g| g.get("dev"))
                    .and_then(|d| d.get("dependencies")),
            ];
            for deps in dev_tables.into_iter().flatten().filter_map(|d| d.as_table()) {
                self.dev_dependencies
                    .extend(deps.keys().map(|k| k.to_ascii_lowercase()));
            }
        }
    }

    fn merge_requirements(&mut self, content: &str, dev: bool) {
        let names = content.lines().filter_map(|line| {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() || line.starts_with('-') {
                None
            } else {
                requirement_name(line)
            }
        });
        if dev {
            self.dev_dependencies.extend(names);
        } else {
            self.dependencies.extend(names);
        }
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn non_empty_str(value: &serde_json::Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn toml_str(value: Option<&toml::Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Distribution name of a PEP 508 requirement (`fastapi[all]>=0.100` -> `fastapi`)
fn requirement_name(spec: &str) -> Option<String> {
    let name: String = spec
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name.to_ascii_lowercase())
    }
}

fn license_from_file(snapshot: &RepoSnapshot) -> Option<String> {
    let content = snapshot
        .files()
        .filter(|f| !f.path.contains('/'))
        .find(|f| is_license_name(&f.path))
        .and_then(|f| f.content.as_deref())?;

    let header: String = content.lines().take(5).collect::<Vec<_>>().join("\n");
    LICENSE_MARKERS
        .iter()
        .find(|(marker, _)| header.contains(marker))
        .map(|(_, spdx)| spdx.to_string())
}

// =============================================================================
// Languages and Stack
// =============================================================================

/// Programming language families by file count (descending), ties by name
fn language_histogram(snapshot: &RepoSnapshot) -> Vec<String> {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for file in snapshot.files() {
        let language = Language::from_path(&file.path);
        if language.is_programming() {
            *counts.entry(language.family()).or_default() += 1;
        }
    }

    let mut ordered: Vec<(&str, usize)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ordered.into_iter().map(|(name, _)| name.to_string()).collect()
}

fn classify_stack<'a>(dependencies: impl Iterator<Item = &'a String>) -> StackEvidence {
    let mut buckets: BTreeMap<StackCategory, BTreeSet<&'static str>> = BTreeMap::new();
    for dep in dependencies {
        if let Some((display, category)) = classify(dep) {
            buckets
                .entry(category)
                .or_default()
                .insert(display);
        }
    }

    let take = |category: StackCategory| -> Vec<String> {
        buckets
            .get(&category)
            .map(|set| set.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default()
    };

    StackEvidence {
        frontend: take(StackCategory::Frontend),
        backend: take(StackCategory::Backend),
        database: take(StackCategory::Database),
        tools: take(StackCategory::Tools),
    }
}

// =============================================================================
// Files, Structure and API Layout
// =============================================================================

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_license_name(path: &str) -> bool {
    let upper = file_name(path).to_ascii_uppercase();
    upper.starts_with("LICENSE") || upper.starts_with("LICENCE") || upper.starts_with("COPYING")
}

fn is_test_file(path: &str) -> bool {
    let name = file_name(path);
    let in_test_dir = TEST_DIRS.iter().any(|dir| in_dir(path, dir));
    in_test_dir
        || name.contains(".test.")
        || name.contains(".spec.")
        || (name.starts_with("test_") && name.ends_with(".py"))
        || name.ends_with("_test.py")
}

fn file_flags(snapshot: &RepoSnapshot) -> FileFlags {
    let top_level = || snapshot.files().filter(|f| !f.path.contains('/'));

    FileFlags {
        has_package_json: snapshot.has_file("package.json"),
        has_readme: top_level().any(|f| f.path.to_ascii_lowercase().starts_with("readme")),
        has_tests: snapshot.files().any(|f| is_test_file(&f.path))
            || snapshot
                .directories()
                .any(|d| TEST_DIRS.contains(&file_name(d))),
        has_docker: snapshot.files().any(|f| {
            let name = file_name(&f.path);
            name == "Dockerfile"
                || name.starts_with("Dockerfile.")
                || name.starts_with("docker-compose.")
                || name == "compose.yaml"
                || name == "compose.yml"
        }),
        has_gitignore: snapshot.has_file(".gitignore"),
        has_license: top_level().any(|f| is_license_name(&f.path)),
        has_env_example: ENV_EXAMPLES.iter().any(|f| snapshot.has_file(f)),
    }
}

fn structure(snapshot: &RepoSnapshot, manifest_main: Option<&str>) -> StructureEvidence {
    let folders = snapshot
        .directories()
        .filter(|d| !d.contains('/') && !d.starts_with('.'))
        .map(str::to_string)
        .collect();

    let mut entry_files: BTreeSet<String> = ENTRY_FILES
        .iter()
        .filter(|f| snapshot.has_file(f))
        .map(|f| f.to_string())
        .collect();
    if let Some(main) = manifest_main.map(|m| m.trim_start_matches("./"))
        && snapshot.has_file(main)
    {
        entry_files.insert(main.to_string());
    }

    let config_files = snapshot
        .files()
        .filter(|f| !f.path.contains('/'))
        .filter(|f| {
            CONFIG_FILES.contains(&f.path.as_str())
                || CONFIG_PREFIXES.iter().any(|p| f.path.starts_with(p))
        })
        .map(|f| f.path.clone())
        .collect();

    StructureEvidence {
        folders,
        entry_files: entry_files.into_iter().collect(),
        config_files,
    }
}

/// `path` sits somewhere below a directory named `dir`
fn in_dir(path: &str, dir: &str) -> bool {
    path.split('/').rev().skip(1).any(|s| s == dir)
}

fn api_evidence(snapshot: &RepoSnapshot) -> ApiEvidence {
    let has_api_folder = snapshot.directories().any(|d| file_name(d) == "api");

    let sources: Vec<&str> = snapshot
        .files()
        .map(|f| f.path.as_str())
        .filter(|p| Language::from_path(p).is_programming())
        .collect();

    let controllers_found = sources
        .iter()
        .filter(|p| {
            in_dir(p, "controllers") || file_name(p).to_ascii_lowercase().contains("controller")
        })
        .count();

    let routes = sources
        .iter()
        .filter(|p| in_dir(p, "api") || in_dir(p, "routes"))
        .map(|p| p.to_string())
        .collect();

    ApiEvidence {
        has_api_folder,
        controllers_found,
        routes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn extract(files: &[(&str, &str)]) -> RepoEvidence {
        EvidenceExtractor::new().extract(&RepoSnapshot::from_files(files.iter().copied()))
    }

    #[test]
    fn test_empty_repository_has_no_evidence() {
        let evidence = extract(&[]);
        assert_eq!(evidence, RepoEvidence::default());
        assert!(!evidence.files.has_package_json);
        assert!(!evidence.files.has_readme);
    }

    #[test]
    fn test_unrecognized_files_yield_nothing() {
        let evidence = extract(&[("notes.txt", "hello")]);
        assert_eq!(evidence.meta, MetaEvidence::default());
        assert!(evidence.stack.is_empty());
        assert_eq!(evidence.files, FileFlags::default());
    }

    #[test]
    fn test_package_json_manifest() {
        let pkg = r#"{
            "name": "shop-api",
            "description": "Order service",
            "version": "1.2.0",
            "license": "MIT",
            "main": "src/server.js",
            "scripts": { "start": "node src/server.js", "test": "jest" },
            "dependencies": { "express": "^4", "mongoose": "^7" },
            "devDependencies": { "jest": "^29" }
        }"#;
        let evidence = extract(&[
            ("package.json", pkg),
            ("src/server.js", "const x = 1;"),
            ("README.md", "# Shop"),
        ]);

        assert_eq!(evidence.meta.name.as_deref(), Some("shop-api"));
        assert_eq!(evidence.meta.license.as_deref(), Some("MIT"));
        assert_eq!(evidence.dependencies, vec!["express", "mongoose"]);
        assert_eq!(evidence.dev_dependencies, vec!["jest"]);
        assert_eq!(evidence.stack.backend, vec!["Express"]);
        assert_eq!(evidence.stack.database, vec!["MongoDB"]);
        assert_eq!(evidence.stack.tools, vec!["Jest"]);
        assert_eq!(evidence.script("start").unwrap().command, "node src/server.js");
        assert!(evidence.structure.entry_files.contains(&"src/server.js".to_string()));
        assert!(evidence.files.has_package_json);
        assert!(evidence.files.has_readme);
    }

    #[test]
    fn test_malformed_manifest_is_not_fatal() {
        let evidence = extract(&[("package.json", "{ not json")]);
        assert!(evidence.files.has_package_json);
        assert!(evidence.meta.name.is_none());
        assert!(evidence.dependencies.is_empty());
    }

    #[test]
    fn test_pyproject_and_requirements() {
        let pyproject = r#"
[project]
name = "inventory"
version = "0.3.0"
dependencies = ["fastapi[all]>=0.100", "SQLAlchemy==2.0"]

[project.optional-dependencies]
dev = ["pytest>=7"]
"#;
        let evidence = extract(&[
            ("pyproject.toml", pyproject),
            ("requirements.txt", "# pinned\nredis==5.0\n-r base.txt\n"),
        ]);
        assert_eq!(evidence.meta.name.as_deref(), Some("inventory"));
        assert_eq!(evidence.dependencies, vec!["fastapi", "redis", "sqlalchemy"]);
        assert_eq!(evidence.dev_dependencies, vec!["pytest"]);
        assert_eq!(evidence.stack.backend, vec!["FastAPI"]);
        assert_eq!(evidence.stack.database, vec!["Redis", "SQLAlchemy"]);
    }

    #[test]
    fn test_license_from_file_header() {
        let evidence = extract(&[("LICENSE", "MIT License\n\nCopyright (c) 2024")]);
        assert!(evidence.files.has_license);
        assert_eq!(evidence.meta.license.as_deref(), Some("MIT"));

        let unknown = extract(&[("LICENSE", "All rights reserved.")]);
        assert!(unknown.files.has_license);
        assert!(unknown.meta.license.is_none());
    }

    #[test]
    fn test_language_histogram_order() {
        let evidence = extract(&[
            ("a.py", ""),
            ("b.py", ""),
            ("c.ts", ""),
            ("d.tsx", ""),
            ("e.js", ""),
            ("styles.css", ""),
            ("README.md", ""),
        ]);
        assert_eq!(evidence.meta.languages, vec!["Python", "TypeScript", "JavaScript"]);
    }

    #[test]
    fn test_flags_and_structure() {
        let evidence = extract(&[
            (".gitignore", "node_modules"),
            (".env.example", "PORT=3000"),
            ("Dockerfile", "FROM node"),
            ("tsconfig.json", "{}"),
            ("vite.config.ts", "export default {}"),
            ("src/index.ts", ""),
            ("src/users.test.ts", ""),
            (".github/workflows/ci.yml", ""),
        ]);
        assert!(evidence.files.has_gitignore);
        assert!(evidence.files.has_env_example);
        assert!(evidence.files.has_docker);
        assert!(evidence.files.has_tests);
        assert_eq!(evidence.structure.folders, vec!["src"]);
        assert_eq!(evidence.structure.entry_files, vec!["src/index.ts"]);
        assert_eq!(evidence.structure.config_files, vec!["Dockerfile", "tsconfig.json", "vite.config.ts"]);
    }

    #[test]
    fn test_api_layout() {
        let evidence = extract(&[
            ("src/api/users.js", ""),
            ("src/api/orders.js", ""),
            ("src/controllers/user.controller.ts", ""),
            ("src/routes/health.ts", ""),
            ("src/api/README.md", ""),
        ]);
        assert!(evidence.api_evidence.has_api_folder);
        assert_eq!(evidence.api_evidence.controllers_found, 1);
        assert_eq!(
            evidence.api_evidence.routes,
            vec!["src/api/orders.js", "src/api/users.js", "src/routes/health.ts"]
        );
    }

    #[test]
    fn test_extract_is_idempotent() {
        let snapshot = RepoSnapshot::from_files([
            ("package.json", r#"{"name":"x","dependencies":{"react":"18"}}"#),
            ("src/App.tsx", ""),
        ]);
        let extractor = EvidenceExtractor::new();
        assert_eq!(extractor.extract(&snapshot), extractor.extract(&snapshot));
    }

    proptest! {
        #[test]
        fn prop_language_order_independent_of_insertion(mut names in proptest::collection::vec("[a-z]{1,6}\\.(py|ts|js|go)", 0..20)) {
            let forward: Vec<(String, String)> = names.iter().map(|n| (n.clone(), String::new())).collect();
            names.reverse();
            let backward: Vec<(String, String)> = names.iter().map(|n| (n.clone(), String::new())).collect();

            let a = EvidenceExtractor::new().extract(&RepoSnapshot::from_files(forward));
            let b = EvidenceExtractor::new().extract(&RepoSnapshot::from_files(backward));
            prop_assert_eq!(a, b);
        }
    }
}
