//! Filesystem scanning helpers for indexing passes.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use sha2::{Digest, Sha256};
use tracing::warn;
use walkdir::WalkDir;

use crate::config::{Settings, BUILTIN_EXCLUDES};
use crate::errors::{AtlasError, AtlasResult};

const GITIGNORE_FILE: &str = ".gitignore";
const ATLASIGNORE_FILE: &str = ".atlasignore";

/// Compiled ignore predicate for one project root.
///
/// Built-in exclusions always apply; `.gitignore` applies unless disabled in
/// `Settings`; `.atlasignore` and `ATLAS_EXCLUDE` patterns always apply.
pub struct IgnoreRules {
    matcher: Gitignore,
}

impl IgnoreRules {
    pub fn load(repo_root: &Path, settings: &Settings) -> AtlasResult<Self> {
        let mut builder = GitignoreBuilder::new(repo_root);
        for pattern in BUILTIN_EXCLUDES {
            builder.add_line(None, pattern)?;
        }

        let mut files = Vec::new();
        if settings.respect_gitignore {
            files.push(repo_root.join(GITIGNORE_FILE));
        }
        files.push(repo_root.join(ATLASIGNORE_FILE));
        for file in files.iter().filter(|f| f.is_file()) {
            // Bad lines are reported but the remaining rules still load.
            if let Some(err) = builder.add(file) {
                warn!("Ignoring invalid patterns in {}: {err}", file.display());
            }
        }

        for pattern in &settings.extra_excludes {
            if let Err(err) = builder.add_line(None, pattern) {
                warn!("Ignoring invalid exclude pattern {pattern:?}: {err}");
            }
        }

        Ok(Self {
            matcher: builder.build()?,
        })
    }

    /// True when `rel_path` (relative to the project root) must be skipped.
    pub fn is_ignored(&self, rel_path: &Path, is_dir: bool) -> bool {
        if rel_path.as_os_str().is_empty() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(rel_path, is_dir)
            .is_ignore()
    }
}

/// Project-relative path with `/` separators.
pub fn relative_key(repo_root: &Path, path: &Path) -> String {
    path.strip_prefix(repo_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Lower-cased extension with its leading dot, e.g. `".py"`.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
}

/// Walk `repo_root` and return every regular file the predicate keeps.
///
/// Ignored directories are pruned, not descended into. Unreadable entries
/// are logged and skipped.
pub fn iter_repo_files<F>(repo_root: &Path, is_ignored: F) -> Vec<PathBuf>
where
    F: Fn(&Path, bool) -> bool,
{
    let walker = WalkDir::new(repo_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let rel = entry.path().strip_prefix(repo_root).unwrap_or(entry.path());
            !is_ignored(rel, entry.file_type().is_dir())
        });

    let mut result = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if is_regular_file(&entry) => result.push(entry.into_path()),
            Ok(_) => {}
            Err(err) => warn!("Skipping unreadable entry during scan: {err}"),
        }
    }
    result
}

/// Regular files, plus symlinks that resolve to one. Links are never
/// descended into, so directory cycles cannot occur.
fn is_regular_file(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

/// SHA-256 hex digest of a byte slice.
pub fn fingerprint_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 hex digest of a file's contents.
pub fn compute_content_hash(path: &Path) -> AtlasResult<String> {
    let data = std::fs::read(path).map_err(|e| AtlasError::file_io(path, e))?;
    Ok(fingerprint_bytes(&data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x = 1\n").unwrap();
    }

    fn scanned(root: &Path, rules: &IgnoreRules) -> Vec<String> {
        iter_repo_files(root, |p, d| rules.is_ignored(p, d))
            .iter()
            .map(|p| relative_key(root, p))
            .collect()
    }

    #[test]
    fn builtin_excludes_apply() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "keep.py");
        touch(root, ".atlas/index.db");
        touch(root, ".git/HEAD");
        touch(root, "pkg/__pycache__/mod.cpython-311.pyc");
        touch(root, "node_modules/lib/index.py");
        touch(root, "pkg/mod.py");

        let rules = IgnoreRules::load(root, &Settings::default()).unwrap();
        assert_eq!(scanned(root, &rules), vec!["keep.py", "pkg/mod.py"]);
    }

    #[test]
    fn gitignore_honoured_unless_disabled() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join(".gitignore"), "build/\n*_gen.py\n").unwrap();
        touch(root, "app.py");
        touch(root, "schema_gen.py");
        touch(root, "build/out.py");

        let rules = IgnoreRules::load(root, &Settings::default()).unwrap();
        assert_eq!(scanned(root, &rules), vec![".gitignore", "app.py"]);

        let settings = Settings {
            respect_gitignore: false,
            ..Settings::default()
        };
        let rules = IgnoreRules::load(root, &settings).unwrap();
        assert_eq!(
            scanned(root, &rules),
            vec![".gitignore", "app.py", "build/out.py", "schema_gen.py"]
        );
    }

    #[test]
    fn atlasignore_and_extra_excludes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::write(root.join(".atlasignore"), "vendor/\n").unwrap();
        touch(root, "vendor/dep.py");
        touch(root, "scratch/tmp.py");
        touch(root, "main.py");

        let settings = Settings {
            extra_excludes: vec!["scratch/".to_string()],
            ..Settings::default()
        };
        let rules = IgnoreRules::load(root, &settings).unwrap();
        assert_eq!(scanned(root, &rules), vec![".atlasignore", "main.py"]);
    }

    #[test]
    fn nested_path_checked_against_parents() {
        let dir = TempDir::new().unwrap();
        let rules = IgnoreRules::load(dir.path(), &Settings::default()).unwrap();
        assert!(rules.is_ignored(Path::new(".venv/lib/site.py"), false));
        assert!(!rules.is_ignored(Path::new("src/venv_tools.py"), false));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_walked_but_linked_dirs_are_not() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let root = dir.path();
        touch(outside.path(), "shared.py");
        touch(outside.path(), "pkg/inner.py");
        touch(root, "app.py");
        std::os::unix::fs::symlink(outside.path().join("shared.py"), root.join("lib.py")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("pkg"), root.join("linked_pkg")).unwrap();
        std::os::unix::fs::symlink(root.join("missing.py"), root.join("dangling.py")).unwrap();

        let rules = IgnoreRules::load(root, &Settings::default()).unwrap();
        assert_eq!(scanned(root, &rules), vec!["app.py", "lib.py"]);
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of(Path::new("A/B.PY")).as_deref(), Some(".py"));
        assert_eq!(extension_of(Path::new("Makefile")), None);
    }

    #[test]
    fn fingerprint_tracks_content() {
        assert_eq!(fingerprint_bytes(b"a"), fingerprint_bytes(b"a"));
        assert_ne!(fingerprint_bytes(b"a"), fingerprint_bytes(b"b"));
        assert_eq!(fingerprint_bytes(b"").len(), 64);
    }
}
