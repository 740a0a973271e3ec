use tree_sitter::{Query, QueryCursor, StreamingIterator};

use super::Language;
use super::traits::{
    CommentStyle, ImportRef, ParsedFile, Parser, RouteDeclaration, Symbol, SymbolKind,
    create_ts_parser, declaration_context, get_node_text, node_line, parse_tree, unquote,
};
use crate::types::{EvidocError, HttpMethod, Result, RouteFramework};

/// Parser for Python sources (FastAPI and Flask route decorators)
pub struct PythonParser;

impl PythonParser {
    pub fn new() -> Result<Self> {
        // Validate that the language is available
        let _ = create_ts_parser(tree_sitter_python::LANGUAGE, "Python")?;
        Ok(Self)
    }
}

impl Parser for PythonParser {
    fn parse(&self, path: &str, content: &str) -> Result<ParsedFile> {
        let mut parser = create_ts_parser(tree_sitter_python::LANGUAGE, "Python").map_err(|e| {
            EvidocError::Parse {
                message: e.to_string(),
                path: path.to_string(),
            }
        })?;
        let tree = parse_tree(&mut parser, path, content)?;
        let root = tree.root_node();

        let mut result = ParsedFile::new(path, Language::Python);
        extract_imports(root, content, &mut result);
        extract_symbols(root, content, &mut result);
        extract_routes(root, content, &mut result);

        Ok(result)
    }

    fn language(&self) -> Language {
        Language::Python
    }
}

fn extract_imports(root: tree_sitter::Node, content: &str, result: &mut ParsedFile) {
    let query_str = r#"
        (import_statement name: (dotted_name) @name)
        (import_from_statement) @from
    "#;

    if let Ok(query) = Query::new(&tree_sitter_python::LANGUAGE.into(), query_str) {
        let bytes = content.as_bytes();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, bytes);

        while let Some(m) = matches.next() {
            for cap in m.captures.iter() {
                let node = cap.node;
                match query.capture_names()[cap.index as usize] {
                    "name" => result.imports.push(ImportRef {
                        specifier: get_node_text(node, bytes).to_string(),
                        line: node_line(node),
                    }),
                    "from" => push_from_import(node, bytes, result),
                    _ => {}
                }
            }
        }
    }
}

/// `from .models import User` -> `.models`; `from . import users` -> `.users`
fn push_from_import(node: tree_sitter::Node, bytes: &[u8], result: &mut ParsedFile) {
    let Some(module) = node.child_by_field_name("module_name") else {
        return;
    };
    let module_text = get_node_text(module, bytes).to_string();
    let line = node_line(node);

    if !module_text.is_empty() && module_text.chars().all(|c| c == '.') {
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let name_node = name.child_by_field_name("name").unwrap_or(name);
            let imported = get_node_text(name_node, bytes);
            if !imported.is_empty() {
                result.imports.push(ImportRef {
                    specifier: format!("{}{}", module_text, imported),
                    line,
                });
            }
        }
    } else if !module_text.is_empty() {
        result.imports.push(ImportRef {
            specifier: module_text,
            line,
        });
    }
}

fn extract_symbols(root: tree_sitter::Node, content: &str, result: &mut ParsedFile) {
    let query_str = r#"
        (function_definition name: (identifier) @name) @function
        (class_definition name: (identifier) @name) @class
    "#;

    if let Ok(query) = Query::new(&tree_sitter_python::LANGUAGE.into(), query_str) {
        let bytes = content.as_bytes();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, bytes);

        while let Some(m) = matches.next() {
            let mut name = None;
            let mut decl = None;
            for cap in m.captures.iter() {
                match query.capture_names()[cap.index as usize] {
                    "name" => name = Some(get_node_text(cap.node, bytes).to_string()),
                    "function" => decl = Some((cap.node, SymbolKind::Function)),
                    "class" => decl = Some((cap.node, SymbolKind::Class)),
                    _ => {}
                }
            }
            let (Some(name), Some((node, kind))) = (name, decl) else {
                continue;
            };
            if !is_module_level(node) {
                continue;
            }
            result.symbols.push(Symbol {
                exported: !name.starts_with('_'),
                name,
                kind,
                line: node_line(node),
            });
        }
    }
}

fn is_module_level(node: tree_sitter::Node) -> bool {
    match node.parent() {
        Some(p) if p.kind() == "module" => true,
        Some(p) if p.kind() == "decorated_definition" => {
            p.parent().is_some_and(|gp| gp.kind() == "module")
        }
        _ => false,
    }
}

fn extract_routes(root: tree_sitter::Node, content: &str, result: &mut ParsedFile) {
    let query_str = r#"
        (decorator
            (call
                function: (attribute
                    object: (_) @object
                    attribute: (identifier) @method)
                arguments: (argument_list) @args)) @decorator
    "#;

    if let Ok(query) = Query::new(&tree_sitter_python::LANGUAGE.into(), query_str) {
        let bytes = content.as_bytes();
        let lines: Vec<&str> = content.lines().collect();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, bytes);

        while let Some(m) = matches.next() {
            let mut object = None;
            let mut method = None;
            let mut args = None;
            let mut decorator = None;
            for cap in m.captures.iter() {
                match query.capture_names()[cap.index as usize] {
                    "object" => object = Some(get_node_text(cap.node, bytes)),
                    "method" => method = Some(get_node_text(cap.node, bytes)),
                    "args" => args = Some(cap.node),
                    "decorator" => decorator = Some(cap.node),
                    _ => {}
                }
            }
            let (Some(object), Some(method), Some(args), Some(decorator)) =
                (object, method, args, decorator)
            else {
                continue;
            };

            let Some(route_path) = args
                .named_child(0)
                .filter(|n| n.kind() == "string")
                .map(|n| unquote(get_node_text(n, bytes)))
                .filter(|p| p.starts_with('/'))
            else {
                continue;
            };

            let (framework, methods) = match method {
                "route" => (RouteFramework::Flask, flask_methods(args, bytes)),
                other => match HttpMethod::parse(other) {
                    Some(m) => (RouteFramework::FastApi, vec![m]),
                    None => continue,
                },
            };

            let ctx = declaration_context(
                &lines,
                decorator.start_position().row,
                decorator.end_position().row,
                CommentStyle::Hash,
            );
            for http_method in methods {
                result.routes.push(RouteDeclaration {
                    method: http_method,
                    path: route_path.clone(),
                    framework,
                    line: node_line(decorator),
                    receiver: Some(object.to_string()),
                    call_text: get_node_text(args, bytes).to_string(),
                    doc: ctx.doc.clone(),
                    annotations: ctx.annotations.clone(),
                    signature: ctx.signature.clone(),
                });
            }
        }
    }
}

/// `methods=["GET", "POST"]` keyword of a Flask route; GET when absent
fn flask_methods(args: tree_sitter::Node, bytes: &[u8]) -> Vec<HttpMethod> {
    let mut cursor = args.walk();
    for child in args.named_children(&mut cursor) {
        if child.kind() != "keyword_argument" {
            continue;
        }
        let is_methods = child
            .child_by_field_name("name")
            .is_some_and(|n| get_node_text(n, bytes) == "methods");
        if !is_methods {
            continue;
        }
        let Some(value) = child.child_by_field_name("value") else {
            continue;
        };
        let mut inner = value.walk();
        let methods: Vec<HttpMethod> = value
            .named_children(&mut inner)
            .filter(|n| n.kind() == "string")
            .filter_map(|n| HttpMethod::parse(&unquote(get_node_text(n, bytes))))
            .collect();
        if !methods.is_empty() {
            return methods;
        }
    }
    vec![HttpMethod::Get]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, src: &str) -> ParsedFile {
        PythonParser::new().unwrap().parse(path, src).unwrap()
    }

    #[test]
    fn test_imports() {
        let src = "import os\nfrom .models import User\nfrom . import deps\nfrom app.db import session\n";
        let parsed = parse("app/api/users.py", src);
        let specs: Vec<&str> = parsed.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(specs, vec!["os", ".models", ".deps", "app.db"]);
    }

    #[test]
    fn test_module_level_symbols() {
        let src = "class Repo:\n    def get(self):\n        pass\n\ndef _private():\n    pass\n\n@decorator\ndef public():\n    pass\n";
        let parsed = parse("app/repo.py", src);
        let names: Vec<(&str, bool)> = parsed
            .symbols
            .iter()
            .map(|s| (s.name.as_str(), s.exported))
            .collect();
        assert_eq!(names, vec![("Repo", true), ("_private", false), ("public", true)]);
    }

    #[test]
    fn test_fastapi_routes() {
        let src = r#"
router = APIRouter()

@router.get("/items")
def list_items():
    return []

@router.post("/items", dependencies=[Depends(require_role("admin"))])
def create_item():
    """Create an item. Returns 409 on duplicates."""
    return {}
"#;
        let parsed = parse("app/api/items.py", src);
        assert_eq!(parsed.routes.len(), 2);
        assert_eq!(parsed.routes[0].method, HttpMethod::Get);
        assert!(parsed.routes[0].doc.is_none());
        assert_eq!(parsed.routes[1].method, HttpMethod::Post);
        assert!(parsed.routes[1].doc.as_deref().unwrap().contains("409"));
        assert!(parsed.routes[1].call_text.contains("require_role"));
    }

    #[test]
    fn test_flask_route_methods() {
        let src = "@app.route('/login', methods=['GET', 'POST'])\ndef login():\n    pass\n";
        let parsed = parse("app.py", src);
        let methods: Vec<HttpMethod> = parsed.routes.iter().map(|r| r.method).collect();
        assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Post]);
        assert!(parsed.routes.iter().all(|r| r.framework == RouteFramework::Flask));
    }

    #[test]
    fn test_non_route_decorators_ignored() {
        let src = "@pytest.mark.parametrize('x', [1])\ndef test_x(x):\n    pass\n";
        let parsed = parse("tests/test_x.py", src);
        assert!(parsed.routes.is_empty());
    }
}
