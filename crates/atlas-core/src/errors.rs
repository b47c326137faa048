//! Error types for the atlas core library.

use std::path::PathBuf;

use rusqlite::ErrorCode;

/// Top-level error enum for the atlas core library.
///
/// Project-level failures (`NotInitialized`, `StorageCorruption`, and the
/// storage/IO variants) propagate to the caller. Per-file failures
/// (`FileIo`, `Parse`) are recovered by the indexing pipeline and only
/// surface in logs.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("atlas is not initialized in {}; run `atlas init` first", .0.display())]
    NotInitialized(PathBuf),

    #[error("Index storage is corrupt or unreadable: {0}")]
    StorageCorruption(String),

    #[error("Failed to read {}: {source}", path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ignore pattern error: {0}")]
    Ignore(#[from] ignore::Error),
}

impl From<rusqlite::Error> for AtlasError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::NotADatabase) | Some(ErrorCode::DatabaseCorrupt) => {
                AtlasError::StorageCorruption(err.to_string())
            }
            _ => AtlasError::Sqlite(err),
        }
    }
}

impl AtlasError {
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AtlasError::FileIo {
            path: path.into(),
            source,
        }
    }

    /// True for failures that only affect a single file and must not abort
    /// an index run.
    pub fn is_per_file(&self) -> bool {
        matches!(self, AtlasError::FileIo { .. } | AtlasError::Parse { .. })
    }
}

pub type AtlasResult<T> = Result<T, AtlasError>;
