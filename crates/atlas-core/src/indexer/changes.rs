//! Change detection: fingerprint the tree and diff it against the baseline.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, warn};

use crate::indexer::filesystem::{compute_content_hash, iter_repo_files, relative_key};
use crate::indexer::parser::ParserRegistry;
use crate::models::{FileDiff, Fingerprints};

/// Fingerprints observed on disk by one scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub fingerprints: Fingerprints,
    /// Recognized files that could not be read during the scan.
    pub unreadable: BTreeSet<String>,
}

impl Snapshot {
    /// Treat unreadable files that are already tracked as unchanged, so a
    /// transient read failure never drops their symbols.
    pub fn carry_over_unreadable(mut self, stored: &Fingerprints) -> Fingerprints {
        for path in &self.unreadable {
            if let Some(hash) = stored.get(path) {
                self.fingerprints.insert(path.clone(), hash.clone());
            }
        }
        self.fingerprints
    }
}

/// Fingerprint every non-ignored file whose extension has a parser.
pub fn scan<F>(repo_root: &Path, is_ignored: F, registry: &ParserRegistry) -> Snapshot
where
    F: Fn(&Path, bool) -> bool,
{
    let mut snapshot = Snapshot::default();
    for file_path in iter_repo_files(repo_root, is_ignored) {
        if registry.resolve(&file_path).is_none() {
            continue;
        }
        let rel_path = relative_key(repo_root, &file_path);
        match compute_content_hash(&file_path) {
            Ok(hash) => {
                snapshot.fingerprints.insert(rel_path, hash);
            }
            Err(err) => {
                warn!("{err}; keeping previous index entry");
                snapshot.unreadable.insert(rel_path);
            }
        }
    }
    debug!(
        "Scanned {} files ({} unreadable) under {}",
        snapshot.fingerprints.len(),
        snapshot.unreadable.len(),
        repo_root.display()
    );
    snapshot
}

/// Classify paths as added, modified, or deleted. Pure in its inputs.
pub fn diff(current: Fingerprints, stored: &Fingerprints) -> FileDiff {
    let mut result = FileDiff::default();
    for (path, hash) in &current {
        match stored.get(path) {
            None => {
                result.added.insert(path.clone());
            }
            Some(previous) if previous != hash => {
                result.modified.insert(path.clone());
            }
            Some(_) => {}
        }
    }
    result.deleted = stored
        .keys()
        .filter(|path| !current.contains_key(*path))
        .cloned()
        .collect();
    result.current = current;
    result
}
