//! Language parser plugins and the registry that dispatches to them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tree_sitter::{Node, Parser, Tree};

use crate::indexer::filesystem::extension_of;
use crate::indexer::golang::GoParser;
use crate::indexer::python::PythonParser;
use crate::models::Symbol;

/// A pure source → symbols extractor for one language.
///
/// Implementations never fail: malformed source yields an empty result.
pub trait LanguageParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower-case extensions including the leading dot, e.g. `".py"`.
    fn extensions(&self) -> &'static [&'static str];

    /// Extract symbols in source order. `path` is recorded on each symbol.
    fn parse(&self, source: &[u8], path: &str) -> Vec<Symbol>;
}

/// Extension → plugin lookup, built once at startup.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    by_extension: HashMap<String, Arc<dyn LanguageParser>>,
}

impl ParserRegistry {
    /// Registry over the built-in plugins.
    pub fn with_defaults() -> Self {
        Self::from_parsers(vec![
            Arc::new(PythonParser) as Arc<dyn LanguageParser>,
            Arc::new(GoParser),
        ])
    }

    /// Later plugins win when two claim the same extension.
    pub fn from_parsers(parsers: Vec<Arc<dyn LanguageParser>>) -> Self {
        let mut by_extension = HashMap::new();
        for parser in parsers {
            for ext in parser.extensions() {
                by_extension.insert(ext.to_lowercase(), Arc::clone(&parser));
            }
        }
        Self { by_extension }
    }

    pub fn resolve(&self, path: &Path) -> Option<&dyn LanguageParser> {
        let ext = extension_of(path)?;
        self.by_extension.get(&ext).map(|p| p.as_ref())
    }

    /// Parse with the owning plugin; unrecognized files yield no symbols.
    pub fn dispatch(&self, path: &str, source: &[u8]) -> Vec<Symbol> {
        match self.resolve(Path::new(path)) {
            Some(parser) => parser.parse(source, path),
            None => Vec::new(),
        }
    }

    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }
}

// ---------------------------------------------------------------------------
// Shared tree-sitter helpers
// ---------------------------------------------------------------------------

/// Parse `source` with `language`, or `None` if the tree has syntax errors.
pub(crate) fn parse_clean(source: &[u8], language: tree_sitter::Language) -> Option<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&language).ok()?;
    let tree = parser.parse(source, None)?;
    if tree.root_node().has_error() {
        return None;
    }
    Some(tree)
}

pub(crate) fn node_text<'a>(node: Node<'_>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

pub(crate) fn field_text<'a>(node: Node<'_>, field: &str, source: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|child| node_text(child, source))
}

/// 1-based line of a node's first byte.
pub(crate) fn line_of(node: Node<'_>) -> u32 {
    u32::try_from(node.start_position().row + 1).unwrap_or(u32::MAX)
}

/// Collapse every whitespace run (newlines included) to one space, with no
/// padding just inside brackets.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("( ", "(")
        .replace(" )", ")")
        .replace("[ ", "[")
        .replace(" ]", "]")
}
