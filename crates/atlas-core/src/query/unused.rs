//! Best-effort detection of symbols nothing else mentions.
//!
//! Counts identifier tokens across every tracked file. A symbol whose name
//! appears no more often than it is declared is reported. This is a lexical
//! heuristic: strings, comments, and shadowing all count as mentions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::errors::AtlasResult;
use crate::models::Symbol;
use crate::project::Project;
use crate::store::database::SymbolStore;

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").unwrap());

pub struct Unused {
    root: PathBuf,
    store: SymbolStore,
}

impl Unused {
    pub fn open(project: &Project) -> AtlasResult<Self> {
        Ok(Self {
            root: project.root().to_path_buf(),
            store: project.open_store()?,
        })
    }

    /// Candidate dead symbols ordered by file then line.
    pub fn find(&self) -> AtlasResult<Vec<Symbol>> {
        let mut mentions: HashMap<String, usize> = HashMap::new();
        for rel_path in self.store.file_fingerprints()?.keys() {
            let path = self.root.join(rel_path);
            match std::fs::read(&path) {
                Ok(bytes) => count_identifiers(&String::from_utf8_lossy(&bytes), &mut mentions),
                Err(err) => warn!("Skipping {} during unused scan: {err}", path.display()),
            }
        }

        let symbols = self.store.all_symbols()?;
        let mut unused = select_unused(symbols, &mentions);
        unused.sort_by(|a, b| {
            (a.file_path.as_str(), a.line_number).cmp(&(b.file_path.as_str(), b.line_number))
        });
        debug!("Found {} unused symbol candidates", unused.len());
        Ok(unused)
    }
}

fn count_identifiers(text: &str, counts: &mut HashMap<String, usize>) {
    for token in IDENT_RE.find_iter(text) {
        *counts.entry(token.as_str().to_string()).or_default() += 1;
    }
}

/// Symbols mentioned no more often than they are declared. Dunder names are
/// invoked implicitly and never reported.
fn select_unused(symbols: Vec<Symbol>, mentions: &HashMap<String, usize>) -> Vec<Symbol> {
    let mut declarations: HashMap<&str, usize> = HashMap::new();
    for sym in &symbols {
        *declarations.entry(sym.name.as_str()).or_default() += 1;
    }
    let unused_names: Vec<String> = declarations
        .iter()
        .filter(|(name, declared)| {
            !name.starts_with("__") && mentions.get(**name).copied().unwrap_or(0) <= **declared
        })
        .map(|(name, _)| name.to_string())
        .collect();

    symbols
        .into_iter()
        .filter(|sym| unused_names.contains(&sym.name))
        .collect()
}
