use tree_sitter::{Query, QueryCursor, StreamingIterator};

use super::traits::{
    CommentStyle, ImportRef, ParsedFile, Parser, RouteDeclaration, Symbol, SymbolKind,
    create_ts_parser, declaration_context, get_node_text, node_line, parse_tree, unquote,
};
use super::{Grammar, Language};
use crate::types::{EvidocError, HttpMethod, Result, RouteFramework};

/// Parser for TypeScript and JavaScript (including JSX/TSX) sources
pub struct TypeScriptParser {
    language: Language,
}

impl TypeScriptParser {
    pub fn new(language: Language) -> Result<Self> {
        let parser = Self { language };
        // Validate that the grammar loads
        let _ = create_ts_parser(parser.ts_language(), "TypeScript")?;
        Ok(parser)
    }

    fn ts_language(&self) -> tree_sitter::Language {
        match self.language.grammar() {
            Some(Grammar::TypeScript) => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            _ => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

impl Parser for TypeScriptParser {
    fn parse(&self, path: &str, content: &str) -> Result<ParsedFile> {
        let ts_language = self.ts_language();
        let mut parser = create_ts_parser(ts_language.clone(), "TypeScript").map_err(|e| {
            EvidocError::Parse {
                message: e.to_string(),
                path: path.to_string(),
            }
        })?;
        let tree = parse_tree(&mut parser, path, content)?;
        let root = tree.root_node();

        let mut result = ParsedFile::new(path, self.language);
        extract_imports(&ts_language, root, content, &mut result);
        extract_symbols(&ts_language, root, content, &mut result);
        extract_express_routes(&ts_language, root, content, &mut result);
        extract_nest_routes(&ts_language, root, content, &mut result);
        result.routes.sort_by_key(|r| r.line);

        Ok(result)
    }

    fn language(&self) -> Language {
        self.language
    }
}

fn extract_imports(
    language: &tree_sitter::Language,
    root: tree_sitter::Node,
    content: &str,
    result: &mut ParsedFile,
) {
    let query_str = r#"
        (import_statement source: (string) @source)
        (export_statement source: (string) @source)
        (call_expression
            function: (identifier) @fn
            arguments: (arguments (string) @source))
    "#;

    if let Ok(query) = Query::new(language, query_str) {
        let bytes = content.as_bytes();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, bytes);

        while let Some(m) = matches.next() {
            let mut source = None;
            let mut callee = None;
            for cap in m.captures.iter() {
                match query.capture_names()[cap.index as usize] {
                    "source" => source = Some(cap.node),
                    "fn" => callee = Some(get_node_text(cap.node, bytes)),
                    _ => {}
                }
            }
            if callee.is_some_and(|name| name != "require") {
                continue;
            }
            let Some(node) = source else { continue };
            let specifier = unquote(get_node_text(node, bytes));
            if specifier.is_empty() {
                continue;
            }
            result.imports.push(ImportRef {
                specifier,
                line: node_line(node),
            });
        }
    }
}

fn extract_symbols(
    language: &tree_sitter::Language,
    root: tree_sitter::Node,
    content: &str,
    result: &mut ParsedFile,
) {
    let query_str = r#"
        (function_declaration name: (identifier) @name) @function
        (class_declaration name: (type_identifier) @name) @class
        (abstract_class_declaration name: (type_identifier) @name) @class
        (lexical_declaration
            (variable_declarator
                name: (identifier) @name
                value: (arrow_function))) @function
    "#;

    if let Ok(query) = Query::new(language, query_str) {
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
            let parent_kind = node.parent().map(|p| p.kind());
            // Module-level declarations only
            if !matches!(parent_kind, Some("program") | Some("export_statement")) {
                continue;
            }
            result.symbols.push(Symbol {
                name,
                kind,
                line: node_line(node),
                exported: parent_kind == Some("export_statement"),
            });
        }
    }
}

/// Receivers that conventionally hold route tables
fn is_route_receiver(receiver: &str) -> bool {
    let last = receiver.rsplit('.').next().unwrap_or(receiver).to_lowercase();
    matches!(last.as_str(), "app" | "server" | "fastify" | "route" | "routes")
        || last.ends_with("router")
        || last.ends_with("routes")
        || last.ends_with("app")
}

fn extract_express_routes(
    language: &tree_sitter::Language,
    root: tree_sitter::Node,
    content: &str,
    result: &mut ParsedFile,
) {
    let query_str = r#"
        (call_expression
            function: (member_expression
                object: (_) @object
                property: (property_identifier) @method)
            arguments: (arguments) @args) @call
    "#;

    if let Ok(query) = Query::new(language, query_str) {
        let bytes = content.as_bytes();
        let lines: Vec<&str> = content.lines().collect();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, bytes);

        while let Some(m) = matches.next() {
            let mut object = None;
            let mut method = None;
            let mut args = None;
            let mut call = None;
            for cap in m.captures.iter() {
                match query.capture_names()[cap.index as usize] {
                    "object" => object = Some(get_node_text(cap.node, bytes)),
                    "method" => method = Some(get_node_text(cap.node, bytes)),
                    "args" => args = Some(cap.node),
                    "call" => call = Some(cap.node),
                    _ => {}
                }
            }
            let (Some(object), Some(method), Some(args), Some(call)) = (object, method, args, call)
            else {
                continue;
            };
            let Some(http_method) = HttpMethod::parse(method) else {
                continue;
            };
            if !is_route_receiver(object) {
                continue;
            }
            let Some(first) = args.named_child(0) else {
                continue;
            };
            if !matches!(first.kind(), "string" | "template_string") {
                continue;
            }
            let route_path = unquote(get_node_text(first, bytes));
            if !route_path.starts_with('/') {
                continue;
            }

            let ctx = declaration_context(
                &lines,
                call.start_position().row,
                call.end_position().row,
                CommentStyle::Slash,
            );
            result.routes.push(RouteDeclaration {
                method: http_method,
                path: route_path,
                framework: RouteFramework::Express,
                line: node_line(call),
                receiver: Some(object.to_string()),
                call_text: get_node_text(args, bytes).to_string(),
                doc: ctx.doc,
                annotations: ctx.annotations,
                signature: ctx.signature,
            });
        }
    }
}

fn extract_nest_routes(
    language: &tree_sitter::Language,
    root: tree_sitter::Node,
    content: &str,
    result: &mut ParsedFile,
) {
    let query_str = r#"
        (decorator
            (call_expression
                function: (identifier) @name
                arguments: (arguments) @args)) @decorator
    "#;

    if let Ok(query) = Query::new(language, query_str) {
        let bytes = content.as_bytes();
        let lines: Vec<&str> = content.lines().collect();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, root, bytes);

        let mut prefix: Option<String> = None;
        let mut pending = Vec::new();

        while let Some(m) = matches.next() {
            let mut name = None;
            let mut args = None;
            let mut decorator = None;
            for cap in m.captures.iter() {
                match query.capture_names()[cap.index as usize] {
                    "name" => name = Some(get_node_text(cap.node, bytes)),
                    "args" => args = Some(cap.node),
                    "decorator" => decorator = Some(cap.node),
                    _ => {}
                }
            }
            let (Some(name), Some(args), Some(decorator)) = (name, args, decorator) else {
                continue;
            };
            let first_string = args
                .named_child(0)
                .filter(|n| n.kind() == "string")
                .map(|n| unquote(get_node_text(n, bytes)));

            if name == "Controller" {
                if prefix.is_none() {
                    prefix = Some(first_string.unwrap_or_default());
                }
                continue;
            }
            // Nest decorators are capitalized; lowercase names are ordinary calls
            if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
                continue;
            }
            let Some(http_method) = HttpMethod::parse(name) else {
                continue;
            };

            let ctx = declaration_context(
                &lines,
                decorator.start_position().row,
                decorator.end_position().row,
                CommentStyle::Slash,
            );
            pending.push(RouteDeclaration {
                method: http_method,
                path: first_string.unwrap_or_default(),
                framework: RouteFramework::Nest,
                line: node_line(decorator),
                receiver: None,
                call_text: get_node_text(args, bytes).to_string(),
                doc: ctx.doc,
                annotations: ctx.annotations,
                signature: ctx.signature,
            });
        }

        let prefix = prefix.unwrap_or_default();
        for mut route in pending {
            route.path = join_route_path(&prefix, &route.path);
            result.routes.push(route);
        }
    }
}

/// Join a controller prefix and a handler path into `/a/b`
pub fn join_route_path(prefix: &str, path: &str) -> String {
    let segments: Vec<&str> = prefix
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}
