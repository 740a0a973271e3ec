//! Source Index
//!
//! Parses each source file of a snapshot exactly once and answers the
//! symbol, import and route queries used by the graph builder and rules.
//! Files that fail to parse are recorded and skipped; they never abort the
//! rest of the index.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use super::parser::{
    Grammar, Language, ParsedFile, Parser, RouteDeclaration, create_parser,
};
use crate::types::{FileDependency, SkippedFile};

const JS_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// A route declaration together with the file that declares it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub file_path: &'a str,
    pub route: &'a RouteDeclaration,
}

#[derive(Default)]
pub struct SourceIndex {
    files: BTreeMap<String, ParsedFile>,
    skipped: Vec<SkippedFile>,
    parsers: HashMap<Language, Box<dyn Parser>>,
}

impl std::fmt::Debug for SourceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceIndex")
            .field("files", &self.files.len())
            .field("skipped", &self.skipped.len())
            .finish()
    }
}

impl SourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `(path, content)` pairs. Paths already in the index are left
    /// untouched; unsupported languages are ignored; parse failures are
    /// recorded as skipped files.
    pub fn add_source_files<I, P, C>(&mut self, files: I)
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: AsRef<str>,
    {
        for (path, content) in files {
            let path = path.into().replace('\\', "/");
            if self.files.contains_key(&path) || self.skipped.iter().any(|s| s.path == path) {
                debug!(path = %path, "Already indexed, skipping");
                continue;
            }

            let language = Language::from_path(&path);
            if !language.has_parser_support() {
                continue;
            }

            let parser = match self.parser_for(language) {
                Some(p) => p,
                None => continue,
            };

            match parser.parse(&path, content.as_ref()) {
                Ok(parsed) => {
                    self.files.insert(path, parsed);
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Skipping unparseable file");
                    self.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn parser_for(&mut self, language: Language) -> Option<&dyn Parser> {
        if !self.parsers.contains_key(&language) {
            match create_parser(language) {
                Ok(parser) => {
                    self.parsers.insert(language, parser);
                }
                Err(e) => {
                    warn!(language = %language, error = %e, "Parser unavailable");
                    return None;
                }
            }
        }
        self.parsers.get(&language).map(|p| p.as_ref())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Indexed files in path order
    pub fn files(&self) -> impl Iterator<Item = &ParsedFile> {
        self.files.values()
    }

    pub fn file(&self, path: &str) -> Option<&ParsedFile> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Files that were skipped with the reason
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// All route declarations, ordered by file path then line
    pub fn route_matches(&self) -> Vec<RouteMatch<'_>> {
        self.files
            .values()
            .flat_map(|f| {
                f.routes.iter().map(move |route| RouteMatch {
                    file_path: f.path.as_str(),
                    route,
                })
            })
            .collect()
    }

    /// File-to-file import edges between indexed files.
    ///
    /// Package imports and specifiers that do not resolve to an indexed file
    /// are dropped. Self-imports are dropped; cycles are kept.
    pub fn import_edges(&self) -> Vec<FileDependency> {
        let mut edges = BTreeSet::new();
        for file in self.files.values() {
            for import in &file.imports {
                if let Some(target) = self.resolve_import(file, &import.specifier)
                    && target != file.path
                {
                    edges.insert(FileDependency {
                        from: file.path.clone(),
                        to: target,
                    });
                }
            }
        }
        edges.into_iter().collect()
    }

    fn resolve_import(&self, file: &ParsedFile, specifier: &str) -> Option<String> {
        match file.language.grammar()? {
            Grammar::TypeScript | Grammar::Tsx => self.resolve_js(&file.path, specifier),
            Grammar::Python => self.resolve_python(&file.path, specifier),
        }
    }

    fn resolve_js(&self, from: &str, specifier: &str) -> Option<String> {
        if !specifier.starts_with('.') {
            return None;
        }
        let base = join_relative(parent_dir(from), specifier)?;

        if self.files.contains_key(&base) {
            return Some(base);
        }
        // `./user.js` written for a `user.ts` source
        let stem = base
            .rsplit_once('.')
            .filter(|(_, ext)| JS_EXTENSIONS.contains(ext))
            .map(|(stem, _)| stem.to_string());

        let mut candidates = Vec::new();
        for root in [Some(base.clone()), stem].into_iter().flatten() {
            candidates.extend(JS_EXTENSIONS.iter().map(|ext| format!("{}.{}", root, ext)));
        }
        candidates.extend(JS_EXTENSIONS.iter().map(|ext| format!("{}/index.{}", base, ext)));
        candidates.into_iter().find(|c| self.files.contains_key(c))
    }

    fn resolve_python(&self, from: &str, specifier: &str) -> Option<String> {
        let dots = specifier.chars().take_while(|c| *c == '.').count();
        let module = &specifier[dots..];

        let base = if dots == 0 {
            String::new()
        } else {
            let mut dir = parent_dir(from).to_string();
            for _ in 1..dots {
                dir = parent_dir(&dir).to_string();
            }
            dir
        };

        let module_path = module.replace('.', "/");
        let joined = match (base.is_empty(), module_path.is_empty()) {
            (_, true) => return None,
            (true, false) => module_path,
            (false, false) => format!("{}/{}", base, module_path),
        };

        [format!("{}.py", joined), format!("{}/__init__.py", joined)]
            .into_iter()
            .find(|c| self.files.contains_key(c))
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Join a `./` or `../` specifier onto a directory; `None` when it climbs past the root
fn join_relative(dir: &str, specifier: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(files: &[(&str, &str)]) -> SourceIndex {
        let mut index = SourceIndex::new();
        index.add_source_files(files.iter().map(|(p, c)| (p.to_string(), *c)));
        index
    }

    #[test]
    fn test_unparseable_file_is_skipped_not_fatal() {
        let index = index(&[
            ("src/ok.ts", "export function ok() {}"),
            ("src/broken.ts", "function ( {"),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.skipped().len(), 1);
        assert_eq!(index.skipped()[0].path, "src/broken.ts");
    }

    #[test]
    fn test_no_reparse_of_indexed_path() {
        let mut idx = index(&[("src/a.ts", "export function first() {}")]);
        idx.add_source_files([("src/a.ts", "export function second() {}")]);
        let names: Vec<&str> = idx
            .file("src/a.ts")
            .unwrap()
            .symbols
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["first"]);
    }

    #[test]
    fn test_unsupported_languages_ignored() {
        let idx = index(&[("README.md", "# Title"), ("main.go", "package main")]);
        assert!(idx.is_empty());
        assert!(idx.skipped().is_empty());
    }

    #[test]
    fn test_js_import_resolution() {
        let idx = index(&[
            ("src/app.ts", "import { db } from './db';\nimport routes from './routes';\nimport express from 'express';"),
            ("src/db.ts", "export const db = () => 1;"),
            ("src/routes/index.ts", "import { db } from '../db.js';"),
        ]);
        let edges = idx.import_edges();
        assert_eq!(
            edges,
            vec![
                FileDependency { from: "src/app.ts".into(), to: "src/db.ts".into() },
                FileDependency { from: "src/app.ts".into(), to: "src/routes/index.ts".into() },
                FileDependency { from: "src/routes/index.ts".into(), to: "src/db.ts".into() },
            ]
        );
    }

    #[test]
    fn test_python_import_resolution() {
        let idx = index(&[
            ("app/main.py", "from .api.users import list_users\nimport app.db\nimport os\n"),
            ("app/api/users.py", "from ..db import session\n"),
            ("app/api/__init__.py", ""),
            ("app/db.py", "session = None\n"),
        ]);
        let edges = idx.import_edges();
        assert!(edges.contains(&FileDependency { from: "app/main.py".into(), to: "app/api/users.py".into() }));
        assert!(edges.contains(&FileDependency { from: "app/main.py".into(), to: "app/db.py".into() }));
        assert!(edges.contains(&FileDependency { from: "app/api/users.py".into(), to: "app/db.py".into() }));
        assert_eq!(edges.len(), 3);
    }

    #[test]
    fn test_cycles_are_kept() {
        let idx = index(&[
            ("a.js", "const b = require('./b');"),
            ("b.js", "const a = require('./a');"),
        ]);
        assert_eq!(idx.import_edges().len(), 2);
    }

    #[test]
    fn test_route_matches_in_path_order() {
        let idx = index(&[
            ("src/b.js", "app.get('/b', h);"),
            ("src/a.js", "app.get('/a', h);"),
        ]);
        let paths: Vec<&str> = idx.route_matches().iter().map(|m| m.route.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("src/api", "../db").as_deref(), Some("src/db"));
        assert_eq!(join_relative("", "./x").as_deref(), Some("x"));
        assert!(join_relative("", "../x").is_none());
    }
}
