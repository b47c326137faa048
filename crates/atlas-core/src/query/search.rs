//! Symbol name lookup over the store.

use tracing::debug;

use crate::errors::AtlasResult;
use crate::models::Symbol;
use crate::project::Project;
use crate::query::guards::truncate_query;
use crate::store::database::SymbolStore;

pub struct Search {
    store: SymbolStore,
}

impl Search {
    pub fn open(project: &Project) -> AtlasResult<Self> {
        Ok(Self::new(project.open_store()?))
    }

    pub fn new(store: SymbolStore) -> Self {
        Self { store }
    }

    /// Exact, case-sensitive name match, or case-insensitive substring match
    /// when `partial` is set. A blank query matches nothing.
    pub fn find(&self, query: &str, partial: bool) -> AtlasResult<Vec<Symbol>> {
        let query = truncate_query(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let results = if partial {
            self.store.find_partial(&query)?
        } else {
            self.store.find_exact(&query)?
        };
        debug!("Search {query:?} (partial={partial}) matched {}", results.len());
        Ok(results)
    }
}
