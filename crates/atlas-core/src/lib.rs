//! Atlas core library: an incremental, project-scoped symbol index.
//!
//! The indexer fingerprints source files, reparses only what changed through
//! per-language tree-sitter plugins, and keeps the resulting symbols in a
//! SQLite store under `<project>/.atlas/`. Search, stats, and unused-symbol
//! reports are read-only consumers of that store.

pub mod config;
pub mod errors;
pub mod indexer;
pub mod models;
pub mod project;
pub mod query;
pub mod store;

pub use config::Settings;
pub use errors::{AtlasError, AtlasResult};
pub use indexer::pipeline::{IndexReport, IndexStats, Indexer};
pub use models::{CodebaseStats, FileDiff, Symbol, SymbolKind};
pub use project::Project;
