//! Codebase-wide aggregates for the `stats` command.

use crate::errors::AtlasResult;
use crate::models::CodebaseStats;
use crate::project::Project;
use crate::query::guards::{clamp_limit, MAX_TOP_FILES};
use crate::store::database::SymbolStore;

pub struct Stats {
    store: SymbolStore,
}

impl Stats {
    pub fn open(project: &Project) -> AtlasResult<Self> {
        Ok(Self::new(project.open_store()?))
    }

    pub fn new(store: SymbolStore) -> Self {
        Self { store }
    }

    /// Totals, documentation coverage, kind distribution, and the `limit`
    /// files with the most symbols (`limit` clamped to `1..=MAX_TOP_FILES`).
    pub fn generate(&self, limit: usize) -> AtlasResult<CodebaseStats> {
        let total_symbols = self.store.symbol_count()?;
        let documented_symbols = self.store.documented_symbol_count()?;
        Ok(CodebaseStats {
            total_files: self.store.file_count()?,
            total_symbols,
            documented_symbols,
            docstring_coverage: coverage_percent(documented_symbols, total_symbols),
            kind_distribution: self.store.symbol_counts_by_kind()?,
            top_files: self.store.top_files(clamp_limit(limit, MAX_TOP_FILES))?,
        })
    }
}

/// Percentage rounded to one decimal; zero when there is nothing to cover.
fn coverage_percent(documented: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = documented as f64 * 100.0 / total as f64;
    (pct * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Symbol, SymbolKind};

    fn populated() -> Stats {
        let mut store = SymbolStore::open_in_memory().unwrap();
        store
            .replace_file(
                "big.py",
                "1",
                &[
                    Symbol::new("A", SymbolKind::Class, "big.py", 1).with_docstring("A class."),
                    Symbol::new("run", SymbolKind::Method, "big.py", 2),
                    Symbol::new("stop", SymbolKind::Method, "big.py", 5),
                ],
            )
            .unwrap();
        store
            .replace_file(
                "small.py",
                "2",
                &[Symbol::new("main", SymbolKind::Function, "small.py", 1)],
            )
            .unwrap();
        store.replace_file("empty.py", "3", &[]).unwrap();
        Stats::new(store)
    }

    #[test]
    fn aggregates_over_the_index() {
        let stats = populated().generate(5).unwrap();
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_symbols, 4);
        assert_eq!(stats.documented_symbols, 1);
        assert_eq!(stats.docstring_coverage, 25.0);
        let kinds: Vec<(SymbolKind, u64)> =
            stats.kind_distribution.iter().map(|(k, n)| (*k, *n)).collect();
        assert_eq!(
            kinds,
            vec![
                (SymbolKind::Function, 1),
                (SymbolKind::Class, 1),
                (SymbolKind::Method, 2),
            ]
        );
        assert_eq!(
            stats.top_files,
            vec![("big.py".to_string(), 3), ("small.py".to_string(), 1)]
        );
    }

    #[test]
    fn limit_is_clamped() {
        let stats = populated();
        assert_eq!(stats.generate(0).unwrap().top_files.len(), 1);
        assert_eq!(stats.generate(1000).unwrap().top_files.len(), 2);
    }

    #[test]
    fn empty_index_has_zero_coverage() {
        let stats = Stats::new(SymbolStore::open_in_memory().unwrap())
            .generate(5)
            .unwrap();
        assert_eq!(stats.total_symbols, 0);
        assert_eq!(stats.docstring_coverage, 0.0);
        assert!(stats.top_files.is_empty());
    }

    #[test]
    fn coverage_rounds_to_one_decimal() {
        assert_eq!(coverage_percent(1, 3), 33.3);
        assert_eq!(coverage_percent(2, 3), 66.7);
        assert_eq!(coverage_percent(3, 3), 100.0);
    }
}
