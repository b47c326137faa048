//! SQLite storage layer for the symbol index.
//!
//! A `SymbolStore` owns one connection for its whole lifetime; the
//! connection is closed when the store is dropped. Every mutating call runs
//! in its own transaction and is committed before it returns.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::errors::{AtlasError, AtlasResult};
use crate::models::{Fingerprints, Symbol, SymbolKind};
use crate::store::schema;

const LAST_INDEXED_KEY: &str = "last_indexed";

const SYMBOL_COLUMNS: &str = "name, kind, file_path, line_number, signature, docstring";

/// Raw symbol row; `kind` is validated when converting to a `Symbol`.
struct SymbolRow {
    name: String,
    kind: String,
    file_path: String,
    line_number: i64,
    signature: String,
    docstring: String,
}

impl SymbolRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            kind: row.get(1)?,
            file_path: row.get(2)?,
            line_number: row.get(3)?,
            signature: row.get(4)?,
            docstring: row.get(5)?,
        })
    }

    fn into_symbol(self) -> AtlasResult<Symbol> {
        let kind = self
            .kind
            .parse::<SymbolKind>()
            .map_err(AtlasError::StorageCorruption)?;
        let line_number = u32::try_from(self.line_number).map_err(|_| {
            AtlasError::StorageCorruption(format!(
                "invalid line number {} for {} in {}",
                self.line_number, self.name, self.file_path
            ))
        })?;
        Ok(Symbol {
            name: self.name,
            kind,
            file_path: self.file_path,
            line_number,
            signature: self.signature,
            docstring: self.docstring,
        })
    }
}

/// Persistent mapping from file path to its symbols and content hash.
pub struct SymbolStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl SymbolStore {
    /// Open (creating if needed) the store at `db_path`.
    ///
    /// A file that is not a SQLite database, or fails the integrity check,
    /// yields `StorageCorruption`.
    pub fn open(db_path: &Path) -> AtlasResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let store = Self::prepare(conn, Some(db_path.to_path_buf()))?;
        debug!("Opened symbol store at {}", db_path.display());
        Ok(store)
    }

    /// Private in-memory store, used by tests and benchmarks.
    pub fn open_in_memory() -> AtlasResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(conn, None)
    }

    fn prepare(conn: Connection, db_path: Option<PathBuf>) -> AtlasResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA synchronous = FULL;")?;

        let check: String = conn.query_row("PRAGMA quick_check;", [], |row| row.get(0))?;
        if check != "ok" {
            return Err(AtlasError::StorageCorruption(check));
        }

        schema::init_schema(&conn)?;
        Ok(Self { conn, db_path })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    // -----------------------------------------------------------------------
    // Baseline
    // -----------------------------------------------------------------------

    /// Every tracked path with its last fingerprint; empty for a fresh store.
    pub fn file_fingerprints(&self) -> AtlasResult<Fingerprints> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, content_hash FROM files;")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut fingerprints = Fingerprints::new();
        for row in rows {
            let (path, hash) = row?;
            fingerprints.insert(path, hash);
        }
        Ok(fingerprints)
    }

    // -----------------------------------------------------------------------
    // File / symbol mutation
    // -----------------------------------------------------------------------

    /// Replace every symbol of `path` with `symbols` and upsert its
    /// fingerprint, all in one transaction.
    ///
    /// Symbols are stored under `path` regardless of their own `file_path`.
    pub fn replace_file(
        &mut self,
        path: &str,
        fingerprint: &str,
        symbols: &[Symbol],
    ) -> AtlasResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM symbols WHERE file_path = ?1;", params![path])?;
        tx.execute(
            "INSERT INTO files (path, content_hash) VALUES (?1, ?2) \
             ON CONFLICT(path) DO UPDATE SET \
                 content_hash = excluded.content_hash, \
                 indexed_at = CURRENT_TIMESTAMP;",
            params![path, fingerprint],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO symbols (name, kind, file_path, line_number, signature, docstring) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            )?;
            for sym in symbols {
                insert.execute(params![
                    sym.name,
                    sym.kind.as_str(),
                    path,
                    sym.line_number,
                    sym.signature,
                    sym.docstring,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Stored {} symbols for {}", symbols.len(), path);
        Ok(())
    }

    /// Delete all symbols and the fingerprint of `path`.
    ///
    /// Returns whether the path was tracked; an untracked path is a no-op.
    pub fn remove_file(&mut self, path: &str) -> AtlasResult<bool> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM symbols WHERE file_path = ?1;", params![path])?;
        let removed = tx.execute("DELETE FROM files WHERE path = ?1;", params![path])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Drop all symbols, fingerprints, and index metadata.
    pub fn clear(&mut self) -> AtlasResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM symbols;
             DELETE FROM files;
             DELETE FROM index_meta WHERE key <> 'schema_version';",
        )?;
        tx.commit()?;
        debug!("Cleared symbol store");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Index metadata
    // -----------------------------------------------------------------------

    pub fn touch_last_indexed(&mut self, timestamp: DateTime<Utc>) -> AtlasResult<()> {
        self.conn.execute(
            "INSERT INTO index_meta(key, value) VALUES(?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![LAST_INDEXED_KEY, timestamp.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn last_indexed(&self) -> AtlasResult<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1 LIMIT 1;",
                params![LAST_INDEXED_KEY],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|value| {
            DateTime::parse_from_rfc3339(&value)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| {
                    AtlasError::StorageCorruption(format!("bad last_indexed value {value:?}: {e}"))
                })
        })
        .transpose()
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    fn query_symbols(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> AtlasResult<Vec<Symbol>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, SymbolRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(SymbolRow::into_symbol).collect()
    }

    /// Every indexed symbol in insertion order.
    pub fn all_symbols(&self) -> AtlasResult<Vec<Symbol>> {
        self.query_symbols(
            &format!("SELECT {SYMBOL_COLUMNS} FROM symbols ORDER BY id;"),
            &[],
        )
    }

    /// Symbols of a single file, by line.
    pub fn file_symbols(&self, path: &str) -> AtlasResult<Vec<Symbol>> {
        self.query_symbols(
            &format!(
                "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE file_path = ?1 \
                 ORDER BY line_number, id;"
            ),
            &[&path],
        )
    }

    /// Symbols whose name equals `name` exactly (case-sensitive).
    pub fn find_exact(&self, name: &str) -> AtlasResult<Vec<Symbol>> {
        self.query_symbols(
            &format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE name = ?1 ORDER BY id;"),
            &[&name],
        )
    }

    /// Symbols whose name contains `fragment`, ignoring ASCII case.
    pub fn find_partial(&self, fragment: &str) -> AtlasResult<Vec<Symbol>> {
        self.query_symbols(
            &format!(
                "SELECT {SYMBOL_COLUMNS} FROM symbols \
                 WHERE instr(lower(name), lower(?1)) > 0 ORDER BY id;"
            ),
            &[&fragment],
        )
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    fn count(&self, sql: &str) -> AtlasResult<u64> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    pub fn file_count(&self) -> AtlasResult<u64> {
        self.count("SELECT COUNT(*) FROM files;")
    }

    pub fn symbol_count(&self) -> AtlasResult<u64> {
        self.count("SELECT COUNT(*) FROM symbols;")
    }

    pub fn documented_symbol_count(&self) -> AtlasResult<u64> {
        self.count("SELECT COUNT(*) FROM symbols WHERE docstring <> '';")
    }

    /// Symbol count per kind, listing every kind (zero when absent).
    pub fn symbol_counts_by_kind(&self) -> AtlasResult<IndexMap<SymbolKind, u64>> {
        let mut counts: IndexMap<SymbolKind, u64> =
            SymbolKind::ALL.iter().map(|kind| (*kind, 0)).collect();
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM symbols GROUP BY kind;")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (kind, n) = row?;
            let kind = kind
                .parse::<SymbolKind>()
                .map_err(AtlasError::StorageCorruption)?;
            counts.insert(kind, n.max(0) as u64);
        }
        Ok(counts)
    }

    /// Files ranked by symbol count descending, ties by path ascending.
    pub fn top_files(&self, limit: usize) -> AtlasResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT file_path, COUNT(*) AS n FROM symbols \
             GROUP BY file_path ORDER BY n DESC, file_path ASC LIMIT ?1;",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .map(|(path, n)| (path, n.max(0) as u64))
            .collect())
    }
}
