//! Go symbol extraction on top of tree-sitter-go.
//!
//! Top-level `func` declarations are functions, declarations with a receiver
//! are methods, and struct or interface type specs are classes. The doc
//! comment is the run of `//` lines directly above a declaration.

use tree_sitter::Node;

use crate::indexer::parser::{
    collapse_whitespace, field_text, line_of, node_text, parse_clean, LanguageParser,
};
use crate::models::{Symbol, SymbolKind};

pub struct GoParser;

impl LanguageParser for GoParser {
    fn name(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".go"]
    }

    fn parse(&self, source: &[u8], path: &str) -> Vec<Symbol> {
        let Some(tree) = parse_clean(source, tree_sitter_go::LANGUAGE.into()) else {
            return Vec::new();
        };
        let root = tree.root_node();
        let mut symbols = Vec::new();
        let mut cursor = root.walk();
        for decl in root.named_children(&mut cursor) {
            match decl.kind() {
                "function_declaration" => {
                    symbols.push(func_symbol(decl, SymbolKind::Function, source, path))
                }
                "method_declaration" => {
                    symbols.push(func_symbol(decl, SymbolKind::Method, source, path))
                }
                "type_declaration" => type_symbols(decl, source, path, &mut symbols),
                _ => {}
            }
        }
        symbols
    }
}

fn func_symbol(node: Node<'_>, kind: SymbolKind, source: &[u8], path: &str) -> Symbol {
    let name = field_text(node, "name", source).unwrap_or_default();
    Symbol::new(name, kind, path, line_of(node))
        .with_signature(signature(node, source))
        .with_docstring(doc_comment(node, source))
}

fn type_symbols(decl: Node<'_>, source: &[u8], path: &str, out: &mut Vec<Symbol>) {
    let mut cursor = decl.walk();
    for spec in decl.named_children(&mut cursor) {
        if spec.kind() != "type_spec" {
            continue;
        }
        let is_class = spec
            .child_by_field_name("type")
            .is_some_and(|ty| matches!(ty.kind(), "struct_type" | "interface_type"));
        if !is_class {
            continue;
        }
        // Grouped specs carry their own comments; a lone spec uses the
        // comment above the `type` keyword.
        let mut doc = doc_comment(spec, source);
        if doc.is_empty() {
            doc = doc_comment(decl, source);
        }
        let name = field_text(spec, "name", source).unwrap_or_default();
        out.push(Symbol::new(name, SymbolKind::Class, path, line_of(spec)).with_docstring(doc));
    }
}

/// `[<type params>](<params>)` plus ` <result>` when present.
fn signature(node: Node<'_>, source: &[u8]) -> String {
    let type_params = field_text(node, "type_parameters", source).unwrap_or_default();
    let params = field_text(node, "parameters", source).unwrap_or("()");
    let mut sig = collapse_whitespace(&format!("{type_params}{params}"));
    if let Some(result) = field_text(node, "result", source) {
        sig.push(' ');
        sig.push_str(&collapse_whitespace(result));
    }
    sig
}

/// Contiguous `//` comment lines ending on the line right above `node`.
fn doc_comment(node: Node<'_>, source: &[u8]) -> String {
    let mut lines = Vec::new();
    let mut next_row = node.start_position().row;
    let mut prev = node.prev_sibling();
    while let Some(comment) = prev {
        if comment.kind() != "comment" || comment.end_position().row + 1 != next_row {
            break;
        }
        let Some(text) = node_text(comment, source).strip_prefix("//") else {
            break;
        };
        lines.push(text.trim().to_string());
        next_row = comment.start_position().row;
        prev = comment.prev_sibling();
    }
    lines.reverse();
    lines.join("\n").trim().to_string()
}
