//! Python symbol extraction on top of tree-sitter-python.
//!
//! Classes, functions, and methods are recorded in source order. A function
//! is a `Method` whenever at least one enclosing class is on the context
//! stack, including functions nested inside methods. Files with syntax
//! errors produce no symbols.

use tree_sitter::Node;

use crate::indexer::parser::{
    collapse_whitespace, field_text, line_of, node_text, parse_clean, LanguageParser,
};
use crate::models::{Symbol, SymbolKind};

pub struct PythonParser;

impl LanguageParser for PythonParser {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".py"]
    }

    fn parse(&self, source: &[u8], path: &str) -> Vec<Symbol> {
        let Some(tree) = parse_clean(source, tree_sitter_python::LANGUAGE.into()) else {
            return Vec::new();
        };
        let mut symbols = Vec::new();
        let mut class_stack: Vec<String> = Vec::new();
        visit(tree.root_node(), source, path, &mut class_stack, &mut symbols);
        symbols
    }
}

fn visit(
    node: Node<'_>,
    source: &[u8],
    path: &str,
    class_stack: &mut Vec<String>,
    out: &mut Vec<Symbol>,
) {
    match node.kind() {
        "class_definition" => {
            let name = field_text(node, "name", source).unwrap_or_default().to_string();
            out.push(
                Symbol::new(name.clone(), SymbolKind::Class, path, line_of(node))
                    .with_docstring(docstring(node, source)),
            );
            class_stack.push(name);
            visit_children(node, source, path, class_stack, out);
            class_stack.pop();
        }
        "function_definition" => {
            let kind = if class_stack.is_empty() {
                SymbolKind::Function
            } else {
                SymbolKind::Method
            };
            let name = field_text(node, "name", source).unwrap_or_default();
            out.push(
                Symbol::new(name, kind, path, line_of(node))
                    .with_signature(signature(node, source))
                    .with_docstring(docstring(node, source)),
            );
            visit_children(node, source, path, class_stack, out);
        }
        _ => visit_children(node, source, path, class_stack, out),
    }
}

fn visit_children(
    node: Node<'_>,
    source: &[u8],
    path: &str,
    class_stack: &mut Vec<String>,
    out: &mut Vec<Symbol>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        visit(child, source, path, class_stack, out);
    }
}

/// `(<params>)` plus ` -> <annotation>` when present.
fn signature(node: Node<'_>, source: &[u8]) -> String {
    let params = field_text(node, "parameters", source)
        .map(collapse_whitespace)
        .unwrap_or_else(|| "()".to_string());
    match field_text(node, "return_type", source) {
        Some(ret) => format!("{params} -> {}", collapse_whitespace(ret)),
        None => params,
    }
}

/// The string literal opening a class or function body, cleaned.
fn docstring(node: Node<'_>, source: &[u8]) -> String {
    let Some(body) = node.child_by_field_name("body") else {
        return String::new();
    };
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    let Some(stmt) = first.filter(|s| s.kind() == "expression_statement") else {
        return String::new();
    };
    if stmt.named_child_count() != 1 {
        return String::new();
    }
    match stmt.named_child(0) {
        Some(expr) if expr.kind() == "string" => {
            string_literal_value(node_text(expr, source))
                .map(|raw| clean_doc(&raw))
                .unwrap_or_default()
        }
        _ => String::new(),
    }
}

/// Strip prefix and quotes from a plain string literal and decode its
/// escapes unless it is raw. Byte and f-strings are not docstrings.
fn string_literal_value(literal: &str) -> Option<String> {
    let quote_at = literal.find(['"', '\''])?;
    let prefix = literal[..quote_at].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }
    let body = &literal[quote_at..];
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            let inner = &body[quote.len()..body.len() - quote.len()];
            return Some(if prefix.contains('r') {
                inner.to_string()
            } else {
                decode_escapes(inner)
            });
        }
    }
    None
}

/// Decode the common backslash escapes. Unknown escapes are kept verbatim
/// and a backslash-newline joins the lines.
fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Replace tabs with spaces up to the next multiple of eight columns.
fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = 8 - column % 8;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

/// Indentation cleanup in the manner of `inspect.cleandoc`, then trim.
fn clean_doc(raw: &str) -> String {
    let expanded: Vec<String> = raw.lines().map(expand_tabs).collect();
    let mut lines = expanded.iter().map(String::as_str);
    let first = lines.next().unwrap_or("").trim_start().to_string();
    let rest: Vec<&str> = lines.collect();

    let margin = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned = vec![first];
    for line in rest {
        let dedented = line.get(margin..).unwrap_or_else(|| line.trim_start());
        cleaned.push(dedented.trim_end().to_string());
    }
    cleaned.join("\n").trim().to_string()
}
