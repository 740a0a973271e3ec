//! Language Parser Module
//!
//! Tree-sitter based parsers for the languages whose routes and imports feed
//! the entity graph: TypeScript/JavaScript (Express, NestJS) and Python
//! (FastAPI, Flask).
//!
//! ## Parser Factory
//!
//! ```rust,ignore
//! use evidoc::analyzer::parser::{Language, create_parser};
//!
//! let parser = create_parser(Language::TypeScript)?;
//! let parsed = parser.parse("src/routes/users.ts", content)?;
//! ```

pub mod language;
pub mod python;
pub mod traits;
pub mod typescript;

pub use language::{Grammar, Language, LanguageKind};
pub use python::PythonParser;
pub use traits::{
    CommentStyle, DeclarationContext, ImportRef, ParsedFile, Parser, RouteDeclaration, Symbol,
    SymbolKind, declaration_context, get_node_text, node_line,
};
pub use typescript::{TypeScriptParser, join_route_path};

use crate::types::{EvidocError, Result};

/// Create a parser for the given language.
///
/// Returns an error if the language has no grammar wired in.
pub fn create_parser(language: Language) -> Result<Box<dyn Parser>> {
    match language.grammar() {
        Some(Grammar::Python) => Ok(Box::new(PythonParser::new()?)),
        Some(Grammar::TypeScript | Grammar::Tsx) => Ok(Box::new(TypeScriptParser::new(language)?)),
        None => Err(EvidocError::Config(format!(
            "No parser support for language: {}",
            language
        ))),
    }
}

/// Try to create a parser for a file path.
///
/// Returns None if the language is not detected or not supported.
pub fn create_parser_for_path(path: &str) -> Option<Box<dyn Parser>> {
    let language = Language::from_path(path);
    if language.has_parser_support() {
        create_parser(language).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_parser_typescript() {
        let parser = create_parser(Language::TypeScript).unwrap();
        assert_eq!(parser.language(), Language::TypeScript);
    }

    #[test]
    fn test_create_parser_python() {
        let parser = create_parser(Language::Python).unwrap();
        assert_eq!(parser.language(), Language::Python);
    }

    #[test]
    fn test_create_parser_unsupported() {
        assert!(create_parser(Language::Go).is_err());
    }

    #[test]
    fn test_create_parser_for_path() {
        assert_eq!(
            create_parser_for_path("src/app.jsx").map(|p| p.language()),
            Some(Language::Jsx)
        );
        assert!(create_parser_for_path("README.md").is_none());
        assert!(create_parser_for_path("types/index.d.ts").is_none());
    }
}
