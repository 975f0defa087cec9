//! In-memory lexicon store
//!
//! Checks the same constraints as the SQLite schema (primary keys, foreign
//! keys, column count) so tests catch ordering mistakes. `begin` stages a
//! copy of the current state and `rollback` swaps it back in.

use super::LexiconStore;
use crate::error::{ArchiveError, Result};
use crate::records::{CollectionKind, Row, Value};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq)]
struct State {
    tables: BTreeMap<CollectionKind, Vec<Row>>,
    sequences: BTreeMap<CollectionKind, i64>,
    /// Primary keys of auto-id collections, kept in step with `tables`
    ids: BTreeMap<CollectionKind, HashSet<i64>>,
    /// Whole rows of link collections (no id column)
    links: BTreeMap<CollectionKind, HashSet<Row>>,
}

impl State {
    fn has_id(&self, kind: CollectionKind, id: i64) -> bool {
        self.ids.get(&kind).is_some_and(|ids| ids.contains(&id))
    }

    fn has_link(&self, kind: CollectionKind, row: &[Value]) -> bool {
        self.links.get(&kind).is_some_and(|rows| rows.contains(row))
    }

    fn max_id(&self, kind: CollectionKind) -> i64 {
        self.ids
            .get(&kind)
            .and_then(|ids| ids.iter().max().copied())
            .unwrap_or(0)
    }

    fn push(&mut self, kind: CollectionKind, row: Row) {
        if kind.has_auto_id() {
            if let Some(id) = row.first().and_then(Value::as_integer) {
                self.ids.entry(kind).or_default().insert(id);
            }
        } else {
            self.links.entry(kind).or_default().insert(row.clone());
        }
        self.tables.entry(kind).or_default().push(row);
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: State,
    staged: Option<State>,
    persist_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id a fresh insert would receive
    pub fn next_id(&self, kind: CollectionKind) -> i64 {
        let seq = self.state.sequences.get(&kind).copied().unwrap_or(0);
        seq.max(self.state.max_id(kind)) + 1
    }

    /// How many times [`LexiconStore::persist`] has run
    pub fn persist_count(&self) -> usize {
        self.persist_count
    }

    /// Whether a unit of work is open
    pub fn in_transaction(&self) -> bool {
        self.staged.is_some()
    }

    fn check_row(&self, kind: CollectionKind, row: &[Value]) -> Result<()> {
        if row.len() != kind.columns().len() {
            return Err(ArchiveError::Constraint(format!(
                "{} expects {} columns, got {}",
                kind.name(),
                kind.columns().len(),
                row.len()
            )));
        }

        if kind.has_auto_id() {
            let Some(id) = row[0].as_integer() else {
                return Err(ArchiveError::Constraint(format!(
                    "{}.id must be an integer",
                    kind.name()
                )));
            };
            if self.state.has_id(kind, id) {
                return Err(ArchiveError::Constraint(format!(
                    "duplicate id {} in {}",
                    id,
                    kind.name()
                )));
            }
        } else if self.state.has_link(kind, row) {
            return Err(ArchiveError::Constraint(format!(
                "duplicate row in {}",
                kind.name()
            )));
        }

        for fk in kind.foreign_keys() {
            let Some(index) = kind.column_index(fk.column) else {
                continue;
            };
            match &row[index] {
                Value::Null => {}
                Value::Integer(parent) => {
                    if !self.state.has_id(fk.references, *parent) {
                        return Err(ArchiveError::Constraint(format!(
                            "{}.{} = {} has no matching row in {}",
                            kind.name(),
                            fk.column,
                            parent,
                            fk.references.name()
                        )));
                    }
                }
                Value::Text(_) => {
                    return Err(ArchiveError::Constraint(format!(
                        "{}.{} must be an integer",
                        kind.name(),
                        fk.column
                    )));
                }
            }
        }

        Ok(())
    }
}

impl LexiconStore for MemoryStore {
    fn wipe(&mut self) -> Result<()> {
        self.state = State::default();
        Ok(())
    }

    fn insert(&mut self, kind: CollectionKind, row: &[Value]) -> Result<()> {
        self.check_row(kind, row)?;
        self.state.push(kind, row.to_vec());
        Ok(())
    }

    fn query_all(&self, kind: CollectionKind) -> Result<Vec<Row>> {
        Ok(self.state.tables.get(&kind).cloned().unwrap_or_default())
    }

    fn advance_sequence(&mut self, kind: CollectionKind, at_least: i64) -> Result<()> {
        let seq = self.state.sequences.entry(kind).or_insert(0);
        *seq = (*seq).max(at_least);
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        self.persist_count += 1;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.staged.is_some() {
            return Err(ArchiveError::Constraint(
                "transaction already in progress".to_string(),
            ));
        }
        self.staged = Some(self.state.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.staged = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if let Some(previous) = self.staged.take() {
            self.state = previous;
        }
        Ok(())
    }
}
