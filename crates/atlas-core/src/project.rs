//! Project root marker and its metadata record.
//!
//! An initialized project has a `.atlas/` directory at its root holding the
//! symbol database and a small `metadata.json` record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{AtlasError, AtlasResult};
use crate::store::database::SymbolStore;

pub const METADATA_DIR: &str = ".atlas";
const METADATA_FILE: &str = "metadata.json";
const DATABASE_FILE: &str = "index.db";
const GITIGNORE_FILE: &str = ".gitignore";
const GITIGNORE_ENTRY: &str = ".atlas/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_root: String,
    pub last_indexed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    metadata_dir: PathBuf,
}

impl Project {
    fn at(root: &Path) -> AtlasResult<Self> {
        let root = root
            .canonicalize()
            .map_err(|e| AtlasError::file_io(root, e))?;
        let metadata_dir = root.join(METADATA_DIR);
        Ok(Self { root, metadata_dir })
    }

    /// Create the marker directory, metadata record, and empty store.
    ///
    /// Safe to re-run: an existing record and store are kept as they are.
    pub fn init(root: &Path) -> AtlasResult<Self> {
        let project = Self::at(root)?;
        std::fs::create_dir_all(&project.metadata_dir)?;

        if !project.metadata_path().exists() {
            project.save_metadata(&ProjectMetadata {
                project_root: project.root.to_string_lossy().into_owned(),
                last_indexed: None,
            })?;
        }
        // Creates the schema; dropped right away.
        SymbolStore::open(&project.database_path())?;
        project.update_gitignore()?;

        debug!("Initialized project at {}", project.root.display());
        Ok(project)
    }

    /// Load an initialized project, or fail with `NotInitialized`.
    pub fn load(root: &Path) -> AtlasResult<Self> {
        let project = Self::at(root)?;
        if !project.metadata_dir.is_dir() {
            return Err(AtlasError::NotInitialized(project.root));
        }
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    pub fn database_path(&self) -> PathBuf {
        self.metadata_dir.join(DATABASE_FILE)
    }

    fn metadata_path(&self) -> PathBuf {
        self.metadata_dir.join(METADATA_FILE)
    }

    /// Open this project's symbol store. The store is closed when dropped.
    pub fn open_store(&self) -> AtlasResult<SymbolStore> {
        SymbolStore::open(&self.database_path())
    }

    pub fn metadata(&self) -> AtlasResult<ProjectMetadata> {
        let path = self.metadata_path();
        let raw = std::fs::read_to_string(&path).map_err(|e| AtlasError::file_io(&path, e))?;
        serde_json::from_str(&raw).map_err(|e| {
            AtlasError::StorageCorruption(format!("{}: {e}", path.display()))
        })
    }

    /// Mirror the store's last-indexed timestamp into `metadata.json`.
    pub fn record_indexed(&self, timestamp: DateTime<Utc>) -> AtlasResult<()> {
        let mut metadata = self.metadata()?;
        metadata.last_indexed = Some(timestamp);
        self.save_metadata(&metadata)
    }

    fn save_metadata(&self, metadata: &ProjectMetadata) -> AtlasResult<()> {
        let body = serde_json::to_string_pretty(metadata)?;
        std::fs::write(self.metadata_path(), body + "\n")?;
        Ok(())
    }

    /// Add `.atlas/` to the project's `.gitignore`, creating it if needed.
    fn update_gitignore(&self) -> AtlasResult<()> {
        let path = self.root.join(GITIGNORE_FILE);
        if !path.exists() {
            std::fs::write(&path, format!("{GITIGNORE_ENTRY}\n"))?;
            return Ok(());
        }

        let content = std::fs::read_to_string(&path)?;
        if content.lines().any(|line| line.trim() == GITIGNORE_ENTRY) {
            return Ok(());
        }
        let prefix = if !content.is_empty() && !content.ends_with('\n') {
            "\n"
        } else {
            ""
        };
        std::fs::write(&path, format!("{content}{prefix}{GITIGNORE_ENTRY}\n"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_before_init_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Project::load(dir.path()),
            Err(AtlasError::NotInitialized(_))
        ));
    }

    #[test]
    fn init_creates_marker_and_store() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.metadata_dir().is_dir());
        assert!(project.database_path().exists());

        let metadata = Project::load(dir.path()).unwrap().metadata().unwrap();
        assert_eq!(metadata.last_indexed, None);
        assert_eq!(
            PathBuf::from(&metadata.project_root),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn gitignore_created_then_left_alone() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();
        Project::init(dir.path()).unwrap();
        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, ".atlas/\n");
    }

    #[test]
    fn gitignore_appended_with_missing_newline() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target").unwrap();
        Project::init(dir.path()).unwrap();
        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target\n.atlas/\n");
    }

    #[test]
    fn record_indexed_updates_metadata() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let ts = Utc::now();
        project.record_indexed(ts).unwrap();
        assert_eq!(project.metadata().unwrap().last_indexed, Some(ts));
    }

    #[test]
    fn malformed_metadata_is_corruption() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();
        std::fs::write(project.metadata_dir().join("metadata.json"), "{not json").unwrap();
        assert!(matches!(
            project.metadata(),
            Err(AtlasError::StorageCorruption(_))
        ));
    }
}
