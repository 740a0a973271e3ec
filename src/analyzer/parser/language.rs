//! Language Detection Module
//!
//! Single source of truth for language detection: the extension histogram used
//! as evidence and the choice of tree-sitter grammar both come from this table.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

// =============================================================================
// Language Metadata Table
// =============================================================================

/// What a language contributes to the evidence histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageKind {
    /// Counted as a project language
    Programming,
    /// Markup, styles and data files; never counted
    Support,
}

/// Tree-sitter grammar used to parse a language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    TypeScript,
    Tsx,
    Python,
}

struct LanguageMeta {
    display_name: &'static str,
    /// Name reported in the evidence language list (dialects fold into their base)
    family: &'static str,
    extensions: &'static [&'static str],
    kind: LanguageKind,
    grammar: Option<Grammar>,
}

macro_rules! lang_meta {
    ($display:literal, $family:literal, [$($ext:literal),*], $kind:ident, $grammar:expr) => {
        LanguageMeta {
            display_name: $display,
            family: $family,
            extensions: &[$($ext),*],
            kind: LanguageKind::$kind,
            grammar: $grammar,
        }
    };
}

impl Language {
    fn meta(&self) -> LanguageMeta {
        match self {
            Language::TypeScript => lang_meta!("TypeScript", "TypeScript", ["ts", "mts", "cts"], Programming, Some(Grammar::TypeScript)),
            Language::Tsx => lang_meta!("TSX", "TypeScript", ["tsx"], Programming, Some(Grammar::Tsx)),
            Language::JavaScript => lang_meta!("JavaScript", "JavaScript", ["js", "mjs", "cjs"], Programming, Some(Grammar::Tsx)),
            Language::Jsx => lang_meta!("JSX", "JavaScript", ["jsx"], Programming, Some(Grammar::Tsx)),
            Language::Python => lang_meta!("Python", "Python", ["py", "pyw"], Programming, Some(Grammar::Python)),

            Language::Rust => lang_meta!("Rust", "Rust", ["rs"], Programming, None),
            Language::Go => lang_meta!("Go", "Go", ["go"], Programming, None),
            Language::C => lang_meta!("C", "C", ["c", "h"], Programming, None),
            Language::Cpp => lang_meta!("C++", "C++", ["cpp", "cc", "cxx", "hpp", "hh", "hxx"], Programming, None),
            Language::Java => lang_meta!("Java", "Java", ["java"], Programming, None),
            Language::Kotlin => lang_meta!("Kotlin", "Kotlin", ["kt", "kts"], Programming, None),
            Language::Scala => lang_meta!("Scala", "Scala", ["scala", "sc"], Programming, None),
            Language::CSharp => lang_meta!("C#", "C#", ["cs"], Programming, None),
            Language::Ruby => lang_meta!("Ruby", "Ruby", ["rb", "rake"], Programming, None),
            Language::Php => lang_meta!("PHP", "PHP", ["php"], Programming, None),
            Language::Swift => lang_meta!("Swift", "Swift", ["swift"], Programming, None),
            Language::Dart => lang_meta!("Dart", "Dart", ["dart"], Programming, None),
            Language::Elixir => lang_meta!("Elixir", "Elixir", ["ex", "exs"], Programming, None),
            Language::Vue => lang_meta!("Vue", "Vue", ["vue"], Programming, None),
            Language::Svelte => lang_meta!("Svelte", "Svelte", ["svelte"], Programming, None),
            Language::Bash => lang_meta!("Shell", "Shell", ["sh", "bash", "zsh"], Programming, None),
            Language::Sql => lang_meta!("SQL", "SQL", ["sql"], Programming, None),

            Language::Html => lang_meta!("HTML", "HTML", ["html", "htm"], Support, None),
            Language::Css => lang_meta!("CSS", "CSS", ["css", "scss", "sass", "less"], Support, None),
            Language::Json => lang_meta!("JSON", "JSON", ["json"], Support, None),
            Language::Yaml => lang_meta!("YAML", "YAML", ["yaml", "yml"], Support, None),
            Language::Toml => lang_meta!("TOML", "TOML", ["toml"], Support, None),
            Language::Markdown => lang_meta!("Markdown", "Markdown", ["md", "markdown"], Support, None),
            Language::Dockerfile => lang_meta!("Dockerfile", "Dockerfile", [], Support, None),

            Language::Unknown => lang_meta!("Unknown", "Unknown", [], Support, None),
        }
    }
}

// =============================================================================
// Language Enum Definition
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    Python,
    Rust,
    Go,
    C,
    Cpp,
    Java,
    Kotlin,
    Scala,
    CSharp,
    Ruby,
    Php,
    Swift,
    Dart,
    Elixir,
    Vue,
    Svelte,
    Bash,
    Sql,
    Html,
    Css,
    Json,
    Yaml,
    Toml,
    Markdown,
    Dockerfile,
    #[default]
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        self.meta().display_name
    }

    /// Name used in the evidence language list
    pub fn family(&self) -> &'static str {
        self.meta().family
    }

    pub fn from_extension(ext: &str) -> Self {
        let ext_lower = ext.to_lowercase();
        Self::all_variants()
            .iter()
            .copied()
            .find(|lang| lang.meta().extensions.iter().any(|e| *e == ext_lower))
            .unwrap_or(Language::Unknown)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            let lower = filename.to_lowercase();
            if lower == "dockerfile" || lower.starts_with("dockerfile.") {
                return Language::Dockerfile;
            }
            // Type declaration files describe shapes, not code
            if lower.ends_with(".d.ts") {
                return Language::Unknown;
            }
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    pub fn is_programming(&self) -> bool {
        self.meta().kind == LanguageKind::Programming
    }

    pub fn grammar(&self) -> Option<Grammar> {
        self.meta().grammar
    }

    pub fn has_parser_support(&self) -> bool {
        self.grammar().is_some()
    }

    fn all_variants() -> &'static [Language] {
        &[
            Language::TypeScript, Language::Tsx, Language::JavaScript, Language::Jsx,
            Language::Python, Language::Rust, Language::Go, Language::C, Language::Cpp,
            Language::Java, Language::Kotlin, Language::Scala, Language::CSharp,
            Language::Ruby, Language::Php, Language::Swift, Language::Dart,
            Language::Elixir, Language::Vue, Language::Svelte, Language::Bash,
            Language::Sql, Language::Html, Language::Css, Language::Json,
            Language::Yaml, Language::Toml, Language::Markdown, Language::Dockerfile,
        ]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
