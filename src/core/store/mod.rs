//! Destination stores for lexicon records
//!
//! Restores never reach into ambient state; the store is handed in
//! explicitly. Two implementations ship with the crate:
//!
//! - [`sqlite::SqliteStore`] - the real lexicon database, with foreign keys
//!   enforced and native transactions
//! - [`memory::MemoryStore`] - an in-memory fake that checks the same
//!   constraints and stages a snapshot for rollback

pub mod memory;
pub mod sqlite;

use crate::error::{ArchiveError, Result};
use crate::records::{CollectionKind, Collections, Row, Value};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Row-oriented store holding the lexicon collections
///
/// Rows are positional, in [`CollectionKind::columns`] order.
pub trait LexiconStore {
    /// Drop all data and recreate an empty schema
    fn wipe(&mut self) -> Result<()>;

    /// Insert one row
    fn insert(&mut self, kind: CollectionKind, row: &[Value]) -> Result<()>;

    /// All rows of a collection in insertion order
    fn query_all(&self, kind: CollectionKind) -> Result<Vec<Row>>;

    /// Make sure the next generated id for `kind` is greater than `at_least`
    fn advance_sequence(&mut self, kind: CollectionKind, at_least: i64) -> Result<()>;

    /// Flush to durable backing (no-op for stores that are already durable)
    fn persist(&mut self) -> Result<()>;

    /// Start an all-or-nothing unit of work
    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    /// Undo everything since [`LexiconStore::begin`]
    fn rollback(&mut self) -> Result<()>;
}

/// Read every collection out of a store
pub fn collect(store: &dyn LexiconStore) -> Result<Collections> {
    let mut collections = Collections::default();
    for kind in CollectionKind::IMPORT_ORDER {
        let rows = store.query_all(kind)?;
        collections.set_rows(kind, rows).map_err(|e| {
            ArchiveError::Constraint(format!("stored row does not match schema: {}", e))
        })?;
    }
    Ok(collections)
}
