//! Indexing orchestrator: scan, diff, reparse what changed, drop what vanished.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::errors::{AtlasError, AtlasResult};
use crate::indexer::changes::{diff, scan};
use crate::indexer::filesystem::{fingerprint_bytes, IgnoreRules};
use crate::indexer::parser::ParserRegistry;
use crate::models::{FileDiff, Fingerprints, Symbol};
use crate::project::Project;
use crate::store::database::SymbolStore;

/// Counters for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub files_seen: usize,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    /// Changed files left with their prior entry after a read or parse failure.
    pub skipped: usize,
    pub symbols_indexed: usize,
    pub elapsed_ms: u128,
}

/// Result of [`Indexer::run_with_stats`].
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub symbols: Vec<Symbol>,
    pub stats: IndexStats,
}

/// Owns the store for the duration of one invocation; the connection is
/// released when the indexer is dropped.
pub struct Indexer {
    project: Project,
    store: SymbolStore,
    registry: ParserRegistry,
    ignore: IgnoreRules,
}

impl Indexer {
    pub fn open(project: &Project, settings: &Settings) -> AtlasResult<Self> {
        Self::with_registry(project, settings, ParserRegistry::with_defaults())
    }

    pub fn with_registry(
        project: &Project,
        settings: &Settings,
        registry: ParserRegistry,
    ) -> AtlasResult<Self> {
        Ok(Self {
            project: project.clone(),
            store: project.open_store()?,
            registry,
            ignore: IgnoreRules::load(project.root(), settings)?,
        })
    }

    pub fn store(&self) -> &SymbolStore {
        &self.store
    }

    pub fn last_indexed(&self) -> AtlasResult<Option<DateTime<Utc>>> {
        self.store.last_indexed()
    }

    /// Run one index pass and return the full post-run symbol set.
    pub fn run(&mut self, fresh: bool) -> AtlasResult<Vec<Symbol>> {
        self.run_with_stats(fresh).map(|report| report.symbols)
    }

    pub fn run_with_stats(&mut self, fresh: bool) -> AtlasResult<IndexReport> {
        let started = Instant::now();

        let snapshot = scan(
            self.project.root(),
            |path, is_dir| self.ignore.is_ignored(path, is_dir),
            &self.registry,
        );

        if fresh {
            self.store.clear()?;
        }
        let stored = self.store.file_fingerprints()?;
        let changes = diff(snapshot.carry_over_unreadable(&stored), &stored);

        let mut stats = IndexStats {
            files_seen: changes.current.len(),
            added: changes.added.len(),
            modified: changes.modified.len(),
            deleted: changes.deleted.len(),
            ..IndexStats::default()
        };

        for rel_path in changes.to_reparse() {
            match self.reparse_file(rel_path) {
                Ok(count) => stats.symbols_indexed += count,
                Err(err) if err.is_per_file() => {
                    warn!("{err}; keeping previous index entry");
                    stats.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        for rel_path in &changes.deleted {
            if self.store.remove_file(rel_path)? {
                debug!("Removed {rel_path} from index");
            }
        }

        // Only advanced once every file-level mutation has committed.
        let now = Utc::now();
        self.store.touch_last_indexed(now)?;
        if let Err(err) = self.project.record_indexed(now) {
            warn!("Failed to update project metadata: {err}");
        }

        let symbols = self.store.all_symbols()?;
        stats.elapsed_ms = started.elapsed().as_millis();
        info!(
            "Indexed {} files: {} added, {} modified, {} deleted, {} skipped; {} symbols total in {}ms",
            stats.files_seen,
            stats.added,
            stats.modified,
            stats.deleted,
            stats.skipped,
            symbols.len(),
            stats.elapsed_ms,
        );
        Ok(IndexReport { symbols, stats })
    }

    /// Scan and diff without touching the store.
    pub fn diff_only(&self) -> AtlasResult<FileDiff> {
        let snapshot = scan(
            self.project.root(),
            |path, is_dir| self.ignore.is_ignored(path, is_dir),
            &self.registry,
        );
        let stored: Fingerprints = self.store.file_fingerprints()?;
        Ok(diff(snapshot.carry_over_unreadable(&stored), &stored))
    }

    /// Read, fingerprint, and parse one file, then replace its store entry.
    ///
    /// The fingerprint is taken from the same bytes that get parsed, so an
    /// edit racing the run is picked up by the next diff.
    fn reparse_file(&mut self, rel_path: &str) -> AtlasResult<usize> {
        let abs_path = self.project.root().join(rel_path);
        let source = std::fs::read(&abs_path).map_err(|e| AtlasError::file_io(&abs_path, e))?;
        let fingerprint = fingerprint_bytes(&source);

        let registry = &self.registry;
        let symbols = panic::catch_unwind(AssertUnwindSafe(|| registry.dispatch(rel_path, &source)))
            .map_err(|payload| AtlasError::Parse {
                path: rel_path.to_string(),
                message: panic_message(payload.as_ref()),
            })?;

        self.store.replace_file(rel_path, &fingerprint, &symbols)?;
        debug!("Parsed {} symbols from {rel_path}", symbols.len());
        Ok(symbols.len())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "parser panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use super::*;
    use crate::indexer::parser::LanguageParser;
    use crate::indexer::python::PythonParser;
    use crate::models::SymbolKind;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn indexer(dir: &TempDir) -> Indexer {
        let project = Project::init(dir.path()).unwrap();
        Indexer::open(&project, &Settings::default()).unwrap()
    }

    struct Exploding;

    impl LanguageParser for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }
        fn extensions(&self) -> &'static [&'static str] {
            &[".py"]
        }
        fn parse(&self, _source: &[u8], _path: &str) -> Vec<Symbol> {
            panic!("boom")
        }
    }

    /// Python parser that deletes another file as a side effect, so that
    /// file fails to read when its turn comes.
    struct RemovesOnParse {
        victim: PathBuf,
    }

    impl LanguageParser for RemovesOnParse {
        fn name(&self) -> &'static str {
            "removes-on-parse"
        }
        fn extensions(&self) -> &'static [&'static str] {
            &[".py"]
        }
        fn parse(&self, source: &[u8], path: &str) -> Vec<Symbol> {
            let _ = std::fs::remove_file(&self.victim);
            PythonParser.parse(source, path)
        }
    }

    #[test]
    fn first_run_indexes_recognized_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/a.py", "def foo():\n    pass\n");
        write(dir.path(), "main.go", "package main\n\nfunc main() {}\n");
        write(dir.path(), "README.md", "# readme\n");

        let mut indexer = indexer(&dir);
        let report = indexer.run_with_stats(false).unwrap();
        assert_eq!(report.stats.added, 2);
        assert_eq!(report.stats.skipped, 0);

        let names: Vec<&str> = report.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"foo") && names.contains(&"main"));
        assert!(indexer.store().file_fingerprints().unwrap().contains_key("pkg/a.py"));
        assert!(indexer.last_indexed().unwrap().is_some());
    }

    #[test]
    fn modified_file_is_replaced_not_merged() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "def old():\n    pass\n");
        let mut indexer = indexer(&dir);
        indexer.run(false).unwrap();

        write(dir.path(), "a.py", "def new():\n    pass\n");
        let report = indexer.run_with_stats(false).unwrap();
        assert_eq!(report.stats.modified, 1);
        let names: Vec<&str> = report.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["new"]);
    }

    #[test]
    fn timestamp_mirrored_into_metadata() {
        let dir = TempDir::new().unwrap();
        let mut indexer = indexer(&dir);
        indexer.run(false).unwrap();
        let stored = indexer.last_indexed().unwrap();
        let metadata = Project::load(dir.path()).unwrap().metadata().unwrap();
        assert_eq!(metadata.last_indexed, stored);
    }

    #[test]
    fn syntax_error_tracks_file_with_no_symbols() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.py", "def broken(:\n");
        let mut indexer = indexer(&dir);
        assert!(indexer.run(false).unwrap().is_empty());
        assert!(indexer.diff_only().unwrap().is_clean());
    }

    #[test]
    fn plugin_panic_keeps_prior_entry() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "class Kept:\n    pass\n");
        let project = Project::init(dir.path()).unwrap();
        Indexer::open(&project, &Settings::default())
            .unwrap()
            .run(false)
            .unwrap();

        write(dir.path(), "a.py", "class Changed:\n    pass\n");
        let registry = ParserRegistry::from_parsers(vec![Arc::new(Exploding)]);
        let mut indexer = Indexer::with_registry(&project, &Settings::default(), registry).unwrap();
        let report = indexer.run_with_stats(false).unwrap();

        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.symbols.len(), 1);
        assert_eq!(report.symbols[0].name, "Kept");
        assert_eq!(report.symbols[0].kind, SymbolKind::Class);
        // Stale fingerprint, so the next run retries the file.
        let pending = indexer.diff_only().unwrap();
        assert!(pending.modified.contains("a.py"));
    }

    #[test]
    fn read_failure_during_reparse_keeps_prior_entry() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "def first_a():\n    pass\n");
        write(dir.path(), "b.py", "def first_b():\n    pass\n");
        let project = Project::init(dir.path()).unwrap();
        Indexer::open(&project, &Settings::default())
            .unwrap()
            .run(false)
            .unwrap();

        write(dir.path(), "a.py", "def second_a():\n    pass\n");
        write(dir.path(), "b.py", "def second_b():\n    pass\n");
        let registry = ParserRegistry::from_parsers(vec![Arc::new(RemovesOnParse {
            victim: dir.path().join("b.py"),
        })]);
        let mut indexer = Indexer::with_registry(&project, &Settings::default(), registry).unwrap();
        let report = indexer.run_with_stats(false).unwrap();

        assert_eq!(report.stats.modified, 2);
        assert_eq!(report.stats.skipped, 1);
        let mut names: Vec<&str> = report.symbols.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["first_b", "second_a"]);
        assert!(indexer.last_indexed().unwrap().is_some());
        // The vanished file is picked up as deleted by the next diff.
        assert!(indexer.diff_only().unwrap().deleted.contains("b.py"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_source_files_are_indexed() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        write(outside.path(), "shared.py", "def shared():\n    pass\n");
        write(dir.path(), "app.py", "def app():\n    pass\n");
        std::os::unix::fs::symlink(outside.path().join("shared.py"), dir.path().join("lib.py"))
            .unwrap();

        let mut indexer = indexer(&dir);
        let mut names: Vec<String> = indexer
            .run(false)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec!["app", "shared"]);
        assert_eq!(indexer.store().file_symbols("lib.py").unwrap()[0].name, "shared");
        assert!(indexer.diff_only().unwrap().is_clean());
    }

    #[test]
    fn ignored_paths_never_tracked() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".venv/lib/site.py", "def hidden():\n    pass\n");
        write(dir.path(), "app.py", "def shown():\n    pass\n");
        let mut indexer = indexer(&dir);
        let names: Vec<String> = indexer
            .run(false)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["shown"]);
    }

    #[test]
    fn panic_message_extraction() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "parser panicked");
    }
}
