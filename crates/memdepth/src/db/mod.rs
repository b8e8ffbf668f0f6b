//! `SQLite` storage layer for memdepth.
//!
//! [`Database`] owns the file and the schema. Every analyze worker opens its
//! own [`Session`]: connections and transactions are never shared between
//! threads, and each write runs in its own `IMMEDIATE` transaction.
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL) and sentinel rows
//! - `helpers` - Row conversion and parsing utilities
//! - `files` - File find-or-create
//! - `types` - Type rows written by the interner
//! - `functions` - Function and signature rows
//! - `variables` - Variable rows
//! - `statements` - Statement rows and their operand lists
//! - `expressions` - Expression rows, kind-specific children, memory accesses
//! - `alloc` - Allocation-site rows
//!
//! ## Find-or-create
//!
//! Positional rows are written through [`Session::find_or_create`]: look the
//! natural key up, insert only when absent, and write the row's children in
//! the same transaction only when the row is new. A unique violation on insert
//! means another writer won the race; the row is re-queried, not reported.

mod alloc;
mod expressions;
mod files;
mod functions;
mod helpers;
mod schema;
mod statements;
pub(crate) mod types;
mod variables;

pub use alloc::{MakeSite, SizedAllocSite};
pub use expressions::{ExprDetail, ExprRow, MemAccessRow};
pub use functions::{FunctionRow, SignatureEntry};
pub use statements::{StmtDetail, StmtRow, TypeSwitchCase};
pub use variables::VariableRow;

pub(crate) use helpers::is_unique_violation;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{FunctionId, MemoryAccessRecord, SchemaStats, TypeId, TypeKind, UNKNOWN_ID};
use helpers::{normalize_path, parse_type_kind, row_to_memory_access, MEMORY_ACCESS_COLUMNS};
use schema::{SCHEMA, SENTINELS, TABLES_CHILD_FIRST};

/// Default time a writer waits for another writer's lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Enclosing function context of a statement or expression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeContext {
    /// Outermost enclosing function
    pub function: Option<FunctionId>,
    /// Innermost enclosing function
    pub parent: Option<FunctionId>,
}

/// An interned type as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredType {
    /// Row id
    pub id: TypeId,
    /// Structural category
    pub kind: TypeKind,
    /// Byte width or array length
    pub length: Option<i64>,
}

/// Handle to the memdepth database file.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Open or create the database and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open or create the database with a specific busy timeout.
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Self {
            path: path.to_path_buf(),
            busy_timeout,
        };
        let conn = db.connect()?;
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(SENTINELS)?;
        debug!(path = %path.display(), "Opened database");
        Ok(db)
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// Open a new session with its own connection.
    ///
    /// Each worker thread must use its own session.
    pub fn session(&self) -> Result<Session> {
        Ok(Session {
            conn: self.connect()?,
        })
    }

    /// Delete every row of every table, then restore the sentinels.
    ///
    /// All-or-nothing: either the whole schema is emptied or nothing changes.
    pub fn truncate(&self) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for table in TABLES_CHILD_FIRST {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.execute_batch(SENTINELS)?;
        tx.commit()?;
        info!(path = %self.path.display(), "Truncated all tables");
        Ok(())
    }

    /// Row counts per table. Sentinel rows are not counted.
    pub fn stats(&self) -> Result<SchemaStats> {
        let conn = self.connect()?;
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            usize::try_from(n).map_err(|e| Error::Internal(format!("negative row count: {e}")))
        };

        Ok(SchemaStats {
            files: count(&format!("SELECT COUNT(*) FROM files WHERE id != {UNKNOWN_ID}"))?,
            types: count("SELECT COUNT(*) FROM types")?,
            functions: count("SELECT COUNT(*) FROM functions")?,
            variables: count(&format!("SELECT COUNT(*) FROM variables WHERE id != {UNKNOWN_ID}"))?,
            statements: count("SELECT COUNT(*) FROM statements")?,
            expressions: count("SELECT COUNT(*) FROM expressions")?,
            memory_accesses: count("SELECT COUNT(*) FROM memory_accesses")?,
            make_sites: count("SELECT COUNT(*) FROM make_sites")?,
            sized_alloc_sites: count("SELECT COUNT(*) FROM sized_alloc_sites")?,
        })
    }

    /// Memory accesses with their positions, optionally limited to one file.
    ///
    /// Ordered by file and position.
    pub fn memory_accesses(&self, file: Option<&Path>) -> Result<Vec<MemoryAccessRecord>> {
        let conn = self.connect()?;
        let base = format!(
            "SELECT {MEMORY_ACCESS_COLUMNS} FROM memory_accesses m \
             JOIN expressions e ON e.id = m.expr_id \
             JOIN files f ON f.id = e.file_id"
        );
        let order = "ORDER BY f.path, e.line, e.column, e.end_line, e.end_column";

        let (sql, filter) = match file {
            Some(file) => (
                format!("{base} WHERE f.path = ?1 {order}"),
                Some(normalize_path(file)),
            ),
            None => (format!("{base} {order}"), None),
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = match &filter {
            Some(path) => stmt.query_map([path], row_to_memory_access)?,
            None => stmt.query_map([], row_to_memory_access)?,
        };
        let records = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Look up an interned type by canonical name.
    pub fn type_by_name(&self, name: &str) -> Result<Option<StoredType>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT id, kind, length FROM types WHERE name = ?1",
            [name],
            |row| {
                Ok(StoredType {
                    id: TypeId::from(row.get::<_, i64>(0)?),
                    kind: parse_type_kind(&row.get::<_, String>(1)?)?,
                    length: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }
}

/// One worker's connection to the database.
pub struct Session {
    conn: Connection,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// The underlying connection, for read-only queries.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` in an `IMMEDIATE` transaction, committing on success.
    ///
    /// Any error rolls the transaction back.
    pub(crate) fn write<T>(&mut self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Find a row by its natural key, or insert it and its children.
    ///
    /// `children` runs in the same transaction as the insert and only when
    /// the row is new. Returns the row id and whether it was inserted.
    pub(crate) fn find_or_create(
        &mut self,
        find: impl Fn(&Connection) -> rusqlite::Result<Option<i64>>,
        insert: impl FnOnce(&Connection) -> rusqlite::Result<i64>,
        children: impl FnOnce(&Connection, i64) -> Result<()>,
    ) -> Result<(i64, bool)> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(id) = find(&*tx)? {
            tx.commit()?;
            return Ok((id, false));
        }

        match insert(&*tx) {
            Ok(id) => {
                children(&*tx, id)?;
                tx.commit()?;
                Ok((id, true))
            }
            Err(e) if is_unique_violation(&e) => {
                drop(tx);
                debug!(error = %e, "Lost insert race, re-querying");
                let id = find(&self.conn)?.ok_or_else(|| {
                    Error::Internal(format!("row vanished after unique violation: {e}"))
                })?;
                Ok((id, false))
            }
            Err(e) => Err(e.into()),
        }
    }
}
