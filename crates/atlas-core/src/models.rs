//! Shared typed models used across indexing, storage, and query layers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;

// ---------------------------------------------------------------------------
// SymbolKind
// ---------------------------------------------------------------------------

/// The kinds of declarations the index records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 3] = [SymbolKind::Function, SymbolKind::Class, SymbolKind::Method];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SymbolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function" => Ok(SymbolKind::Function),
            "class" => Ok(SymbolKind::Class),
            "method" => Ok(SymbolKind::Method),
            _ => Err(format!("Unknown symbol kind: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// One declared function, class, or method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Project-relative path with `/` separators.
    pub file_path: String,
    /// 1-based line of the declaration keyword.
    pub line_number: u32,
    /// Rendered parameters and return annotation; empty for classes.
    pub signature: String,
    /// Leading documentation, trimmed; empty when absent.
    pub docstring: String,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        file_path: impl Into<String>,
        line_number: u32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            file_path: file_path.into(),
            line_number,
            signature: String::new(),
            docstring: String::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = docstring.into();
        self
    }

    pub fn is_documented(&self) -> bool {
        !self.docstring.is_empty()
    }
}

// ---------------------------------------------------------------------------
// FileDiff
// ---------------------------------------------------------------------------

/// Path → content fingerprint.
pub type Fingerprints = BTreeMap<String, String>;

/// Result of one change-detection pass. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    pub added: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    /// Every fingerprint observed on disk during the scan.
    pub current: Fingerprints,
}

impl FileDiff {
    /// True when nothing needs to be reparsed or removed.
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Paths that must be re-read and re-parsed, in sorted order.
    pub fn to_reparse(&self) -> impl Iterator<Item = &String> {
        // Disjoint by construction, so a merge keeps the order without dups.
        let mut merged: Vec<&String> = self.added.iter().chain(self.modified.iter()).collect();
        merged.sort();
        merged.into_iter()
    }

    /// Number of tracked files that did not change.
    pub fn unchanged_count(&self) -> usize {
        self.current.len() - self.added.len() - self.modified.len()
    }
}

// ---------------------------------------------------------------------------
// CodebaseStats
// ---------------------------------------------------------------------------

/// Aggregate view over the index, produced by `query::stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodebaseStats {
    pub total_files: u64,
    pub total_symbols: u64,
    pub documented_symbols: u64,
    /// Percentage of symbols carrying a docstring, rounded to one decimal.
    pub docstring_coverage: f64,
    pub kind_distribution: IndexMap<SymbolKind, u64>,
    pub top_files: Vec<(String, u64)>,
}
