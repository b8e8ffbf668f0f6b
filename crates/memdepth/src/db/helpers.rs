//! Helper functions for database row conversion and parsing.
//!
//! These utilities convert between database representations and domain types.

use std::path::{Path, PathBuf};

use rusqlite::ErrorCode;

use crate::types::{ExprId, MemAccessKind, MemoryAccessRecord, Span, TypeKind, VariableId};

/// SQL select list for the joined memory-access view.
///
/// Use with `row_to_memory_access` for consistent column ordering.
pub(crate) const MEMORY_ACCESS_COLUMNS: &str =
    "m.expr_id, f.path, e.line, e.column, e.end_line, e.end_column, \
     m.kind, m.depth, m.uncertainty, m.base_name, m.base_variable_id, m.inner_expr_id";

/// Normalize a file path to use forward slashes for consistent DB storage.
pub(crate) fn normalize_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

/// Whether a `rusqlite` error is a UNIQUE or PRIMARY KEY violation.
///
/// These come from two writers racing to create the same row and are resolved
/// by re-querying.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Convert an ordinal (position in a list) to a column value.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn ordinal(index: usize) -> i64 {
    index as i64
}

/// Parse a memory-access kind string from the database.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
pub(crate) fn parse_mem_access_kind(s: &str) -> rusqlite::Result<MemAccessKind> {
    MemAccessKind::parse(s).ok_or_else(|| unknown_text("memory access kind", s))
}

/// Parse a type kind string from the database.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
pub(crate) fn parse_type_kind(s: &str) -> rusqlite::Result<TypeKind> {
    TypeKind::parse(s).ok_or_else(|| unknown_text("type kind", s))
}

fn unknown_text(what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("Unknown {what} '{value}' in database. Database may be corrupted or from a newer version.").into(),
    )
}

/// Convert a database row to a [`MemoryAccessRecord`].
///
/// Expected columns: see [`MEMORY_ACCESS_COLUMNS`].
pub(crate) fn row_to_memory_access(row: &rusqlite::Row) -> rusqlite::Result<MemoryAccessRecord> {
    let line: u32 = row.get(2)?;
    let column: u32 = row.get(3)?;
    let end_line: u32 = row.get(4)?;
    let end_column: u32 = row.get(5)?;
    let span = Span::new(line, column, end_line, end_column).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Integer,
            format!("expression span ends before it starts ({line}:{column}-{end_line}:{end_column})").into(),
        )
    })?;

    Ok(MemoryAccessRecord {
        expr_id: ExprId::from(row.get::<_, i64>(0)?),
        file: PathBuf::from(row.get::<_, String>(1)?),
        span,
        kind: parse_mem_access_kind(&row.get::<_, String>(6)?)?,
        depth: row.get(7)?,
        uncertainty: row.get(8)?,
        base_name: row.get(9)?,
        base_variable: row.get::<_, Option<i64>>(10)?.map(VariableId::from),
        inner: row.get::<_, Option<i64>>(11)?.map(ExprId::from),
    })
}
