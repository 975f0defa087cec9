//! SQLite-backed lexicon store

use super::LexiconStore;
use crate::error::{ArchiveError, Result};
use crate::records::{CollectionKind, Row, Value};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection, DatabaseName, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lexicon schema, in import order
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS languages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    native_name TEXT,
    description TEXT,
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS parts_of_speech (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    abbreviation TEXT
);
CREATE TABLE IF NOT EXISTS tags (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL,
    color TEXT
);
CREATE TABLE IF NOT EXISTS words (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    language_id       INTEGER NOT NULL REFERENCES languages(id) ON DELETE CASCADE,
    part_of_speech_id INTEGER REFERENCES parts_of_speech(id) ON DELETE SET NULL,
    lemma             TEXT NOT NULL,
    pronunciation     TEXT,
    definition        TEXT NOT NULL,
    notes             TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS word_forms (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    word_id INTEGER NOT NULL REFERENCES words(id) ON DELETE CASCADE,
    form    TEXT NOT NULL,
    gloss   TEXT
);
CREATE TABLE IF NOT EXISTS word_tags (
    word_id INTEGER NOT NULL REFERENCES words(id) ON DELETE CASCADE,
    tag_id  INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (word_id, tag_id)
);
CREATE TABLE IF NOT EXISTS etymologies (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    word_id        INTEGER NOT NULL REFERENCES words(id) ON DELETE CASCADE,
    source_word_id INTEGER REFERENCES words(id) ON DELETE SET NULL,
    source_text    TEXT,
    note           TEXT
);
";

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(i) => Ok(Value::Integer(i)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Value::Text(s.to_owned()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Real(_) | ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// Lexicon database on SQLite
///
/// Opened on a file, the database is its own durable backing. Opened in
/// memory, [`SqliteStore::with_backing`] names a file that
/// [`LexiconStore::persist`] copies the database to with the online backup
/// API.
pub struct SqliteStore {
    conn: Connection,
    backing: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a lexicon database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening lexicon database at {:?}", path.as_ref());
        Self::init(Connection::open(path)?)
    }

    /// Fresh in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn,
            backing: None,
        })
    }

    /// Copy the database to `path` on every [`LexiconStore::persist`]
    pub fn with_backing<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.backing = Some(path.as_ref().to_path_buf());
        self
    }

    /// Underlying connection, for application queries
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn insert_sql(kind: CollectionKind) -> String {
        let columns = kind.columns();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            kind.name(),
            columns.join(", "),
            placeholders.join(", ")
        )
    }
}

impl LexiconStore for SqliteStore {
    fn wipe(&mut self) -> Result<()> {
        debug!("Wiping lexicon schema");
        // Children first so the implicit deletes never orphan a row
        for kind in CollectionKind::IMPORT_ORDER.iter().rev() {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {};", kind.name()))?;
        }
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn insert(&mut self, kind: CollectionKind, row: &[Value]) -> Result<()> {
        if row.len() != kind.columns().len() {
            return Err(ArchiveError::Constraint(format!(
                "{} expects {} columns, got {}",
                kind.name(),
                kind.columns().len(),
                row.len()
            )));
        }

        let mut stmt = self.conn.prepare_cached(&Self::insert_sql(kind))?;
        stmt.execute(params_from_iter(row.iter()))?;
        Ok(())
    }

    fn query_all(&self, kind: CollectionKind) -> Result<Vec<Row>> {
        let columns = kind.columns();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            columns.join(", "),
            kind.name()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |r| {
            (0..columns.len())
                .map(|i| r.get::<_, Value>(i))
                .collect::<rusqlite::Result<Row>>()
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn advance_sequence(&mut self, kind: CollectionKind, at_least: i64) -> Result<()> {
        let current: Option<i64> = self
            .conn
            .query_row(
                "SELECT seq FROM sqlite_sequence WHERE name = ?1",
                params![kind.name()],
                |r| r.get(0),
            )
            .optional()?;

        match current {
            Some(seq) if seq >= at_least => {}
            Some(_) => {
                self.conn.execute(
                    "UPDATE sqlite_sequence SET seq = ?1 WHERE name = ?2",
                    params![at_least, kind.name()],
                )?;
            }
            None => {
                self.conn.execute(
                    "INSERT INTO sqlite_sequence (name, seq) VALUES (?1, ?2)",
                    params![kind.name(), at_least],
                )?;
            }
        }

        debug!("Sequence for {} at >= {}", kind.name(), at_least);
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(path) = &self.backing {
            info!("Backing up lexicon database to {:?}", path);
            self.conn.backup(DatabaseName::Main, path, None)?;
        }
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}
