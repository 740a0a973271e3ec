use serde::{Deserialize, Serialize};

use super::Language;
use crate::types::{EvidocError, HttpMethod, Result, RouteFramework};

/// Syntactic facts extracted from one source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub path: String,
    pub language: Language,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportRef>,
    pub routes: Vec<RouteDeclaration>,
}

impl ParsedFile {
    pub fn new(path: &str, language: Language) -> Self {
        Self {
            path: path.to_string(),
            language,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// 1-based line of the declaration
    pub line: usize,
    pub exported: bool,
}

/// An import/require specifier as written in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRef {
    pub specifier: String,
    pub line: usize,
}

/// A route declaration matched by one of the framework conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDeclaration {
    pub method: HttpMethod,
    pub path: String,
    pub framework: RouteFramework,
    /// 1-based line of the declaration
    pub line: usize,
    /// Object the route was registered on (`router`, `app`, ...)
    pub receiver: Option<String>,
    /// Argument list of the registering call or decorator
    pub call_text: String,
    /// Comment block or docstring attached to the declaration
    pub doc: Option<String>,
    /// Neighbouring decorator lines
    pub annotations: Vec<String>,
    /// Handler signature when it is separate from the declaration
    pub signature: Option<String>,
}

pub trait Parser: Send + Sync {
    fn parse(&self, path: &str, content: &str) -> Result<ParsedFile>;
    fn language(&self) -> Language;
}

/// Extract text content from a tree-sitter node.
/// Returns empty string if extraction fails (with debug logging).
#[inline]
pub fn get_node_text<'a>(node: tree_sitter::Node, content: &'a [u8]) -> &'a str {
    node.utf8_text(content).unwrap_or_else(|e| {
        tracing::debug!(
            "UTF-8 extraction failed at {}:{}-{}:{}: {}",
            node.start_position().row + 1,
            node.start_position().column,
            node.end_position().row + 1,
            node.end_position().column,
            e
        );
        ""
    })
}

/// 1-based start line of a node
#[inline]
pub fn node_line(node: tree_sitter::Node) -> usize {
    node.start_position().row + 1
}

/// Create a tree-sitter parser for the given language.
pub fn create_ts_parser<L: Into<tree_sitter::Language>>(
    language: L,
    lang_name: &str,
) -> Result<tree_sitter::Parser> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language.into())
        .map_err(|e| EvidocError::Parse {
            message: format!("Failed to set {} language: {}", lang_name, e),
            path: String::new(),
        })?;
    Ok(parser)
}

/// Parse `content`, rejecting trees that contain syntax errors
pub fn parse_tree(
    parser: &mut tree_sitter::Parser,
    path: &str,
    content: &str,
) -> Result<tree_sitter::Tree> {
    let tree = parser
        .parse(content, None)
        .ok_or_else(|| EvidocError::Parse {
            message: "parser returned no tree".to_string(),
            path: path.to_string(),
        })?;

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error_line(root).unwrap_or(1);
        return Err(EvidocError::Parse {
            message: format!("syntax error near line {}", line),
            path: path.to_string(),
        });
    }
    Ok(tree)
}

fn first_error_line(node: tree_sitter::Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node_line(node));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error()
            && let Some(line) = first_error_line(child)
        {
            return Some(line);
        }
    }
    None
}

/// Strip string prefixes and quotes: `f"/x"`, `'/x'`, `` `/x` `` -> `/x`
pub fn unquote(text: &str) -> String {
    let trimmed = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let trimmed = trimmed
        .trim_start_matches("\"\"\"")
        .trim_end_matches("\"\"\"");
    trimmed
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

// =============================================================================
// Declaration Context
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `//`, `/* */` and JSDoc
    Slash,
    /// `#` comments and docstrings
    Hash,
}

impl CommentStyle {
    fn is_comment(&self, line: &str) -> bool {
        match self {
            Self::Slash => {
                line.starts_with("//")
                    || line.starts_with("/*")
                    || line.starts_with('*')
                    || line.ends_with("*/")
            }
            Self::Hash => line.starts_with('#'),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationContext {
    pub doc: Option<String>,
    pub annotations: Vec<String>,
    pub signature: Option<String>,
}

/// Gather the comment block, neighbouring decorators and (for Python) the
/// handler signature and docstring around a declaration spanning
/// `start_row..=end_row` (0-based).
pub fn declaration_context(
    lines: &[&str],
    start_row: usize,
    end_row: usize,
    style: CommentStyle,
) -> DeclarationContext {
    let mut ctx = DeclarationContext::default();

    let mut top = start_row.min(lines.len());
    while top > 0 && lines[top - 1].trim_start().starts_with('@') {
        top -= 1;
        ctx.annotations.push(lines[top].trim().to_string());
    }
    ctx.annotations.reverse();

    let mut below = end_row + 1;
    while below < lines.len() && lines[below].trim_start().starts_with('@') {
        ctx.annotations.push(lines[below].trim().to_string());
        below += 1;
    }

    let mut doc_lines: Vec<String> = Vec::new();
    let mut row = top;
    while row > 0 {
        let line = lines[row - 1].trim();
        if line.is_empty() || !style.is_comment(line) {
            break;
        }
        doc_lines.push(line.to_string());
        row -= 1;
    }
    doc_lines.reverse();

    if style == CommentStyle::Hash {
        if let Some((signature, body_row)) = python_signature(lines, below) {
            ctx.signature = Some(signature);
            if doc_lines.is_empty()
                && let Some(docstring) = python_docstring(lines, body_row)
            {
                doc_lines.push(docstring);
            }
        }
    }

    if !doc_lines.is_empty() {
        ctx.doc = Some(doc_lines.join("\n"));
    }
    ctx
}

/// `def` header starting at `row`, possibly spanning lines; returns it with the first body row
fn python_signature(lines: &[&str], row: usize) -> Option<(String, usize)> {
    let first = lines.get(row)?.trim_start();
    if !(first.starts_with("def ") || first.starts_with("async def ")) {
        return None;
    }
    let mut parts = Vec::new();
    let mut current = row;
    while let Some(line) = lines.get(current) {
        parts.push(line.trim());
        current += 1;
        if line.trim_end().ends_with(':') {
            break;
        }
    }
    Some((parts.join(" "), current))
}

fn python_docstring(lines: &[&str], row: usize) -> Option<String> {
    let mut current = row;
    while lines.get(current).is_some_and(|l| l.trim().is_empty()) {
        current += 1;
    }
    let first = lines.get(current)?.trim();
    let quote = ["\"\"\"", "'''"].into_iter().find(|q| first.starts_with(q))?;

    let rest = &first[quote.len()..];
    if let Some(end) = rest.find(quote) {
        return Some(rest[..end].trim().to_string());
    }

    let mut collected = vec![rest.trim().to_string()];
    for line in lines.iter().skip(current + 1) {
        if let Some(end) = line.find(quote) {
            collected.push(line[..end].trim().to_string());
            break;
        }
        collected.push(line.trim().to_string());
    }
    Some(collected.join("\n").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'/users'"), "/users");
        assert_eq!(unquote("\"/users\""), "/users");
        assert_eq!(unquote("`/users`"), "/users");
        assert_eq!(unquote("f\"/items\""), "/items");
    }

    #[test]
    fn test_slash_doc_comment_above_declaration() {
        let src = "/**\n * List users.\n */\nrouter.get('/users', list);";
        let lines: Vec<&str> = src.lines().collect();
        let ctx = declaration_context(&lines, 3, 3, CommentStyle::Slash);
        assert!(ctx.doc.unwrap().contains("List users"));
    }

    #[test]
    fn test_blank_line_breaks_doc_block() {
        let src = "// unrelated\n\nrouter.get('/users', list);";
        let lines: Vec<&str> = src.lines().collect();
        let ctx = declaration_context(&lines, 2, 2, CommentStyle::Slash);
        assert!(ctx.doc.is_none());
    }

    #[test]
    fn test_decorator_annotations_collected() {
        let src = "  // Fetch one\n  @Roles('admin')\n  @Get(':id')\n  @ApiResponse({ status: 404 })\n  findOne() {}";
        let lines: Vec<&str> = src.lines().collect();
        let ctx = declaration_context(&lines, 2, 2, CommentStyle::Slash);
        assert_eq!(
            ctx.annotations,
            vec!["@Roles('admin')", "@ApiResponse({ status: 404 })"]
        );
        assert_eq!(ctx.doc.as_deref(), Some("// Fetch one"));
    }

    #[test]
    fn test_python_docstring_and_signature() {
        let src = "@app.get(\"/items\")\ndef list_items(\n    user=Depends(require_role(\"admin\")),\n):\n    \"\"\"List items.\n\n    Raises 404 when empty.\n    \"\"\"\n    return []";
        let lines: Vec<&str> = src.lines().collect();
        let ctx = declaration_context(&lines, 0, 0, CommentStyle::Hash);
        assert!(ctx.signature.unwrap().contains("require_role"));
        let doc = ctx.doc.unwrap();
        assert!(doc.contains("List items."));
        assert!(doc.contains("Raises 404"));
    }

    #[test]
    fn test_python_single_line_docstring_only() {
        let src = "@app.delete(\"/items/{id}\")\nasync def delete_item(id: int):\n    \"\"\"Delete one item.\"\"\"\n    return None";
        let lines: Vec<&str> = src.lines().collect();
        let ctx = declaration_context(&lines, 0, 0, CommentStyle::Hash);
        assert_eq!(ctx.doc.as_deref(), Some("Delete one item."));
        assert_eq!(ctx.signature.as_deref(), Some("async def delete_item(id: int):"));
    }

    #[test]
    fn test_python_hash_comment_wins_over_docstring() {
        let src = "# Remove an item\n@app.delete(\"/items/{id}\")\ndef delete_item(id):\n    \"\"\"Docstring.\"\"\"\n    return None";
        let lines: Vec<&str> = src.lines().collect();
        let ctx = declaration_context(&lines, 1, 1, CommentStyle::Hash);
        assert_eq!(ctx.doc.as_deref(), Some("# Remove an item"));
    }

    #[test]
    fn test_python_without_docstring() {
        let src = "@app.get(\"/items\")\ndef list_items():\n    return []";
        let lines: Vec<&str> = src.lines().collect();
        let ctx = declaration_context(&lines, 0, 0, CommentStyle::Hash);
        assert!(ctx.doc.is_none());
        assert_eq!(ctx.signature.as_deref(), Some("def list_items():"));
    }
}
