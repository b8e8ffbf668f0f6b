//! Function rows and their signature entries.

use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::ordinal;
use super::Session;
use crate::error::Result;
use crate::types::{FileId, FunctionId, Position, SignatureRole, TypeId};

/// Data required to insert a function.
#[derive(Debug, Clone)]
pub struct FunctionRow<'a> {
    /// Name; `None` for function literals
    pub name: Option<&'a str>,
    /// Declaring file
    pub file: FileId,
    /// Position of the name, or of the `func` keyword for literals
    pub position: Position,
    /// Signature type
    pub signature: Option<TypeId>,
    /// Last parameter is `...T`
    pub is_variadic: bool,
    /// Declares type parameters
    pub is_generic: bool,
    /// Function literal
    pub is_literal: bool,
    /// Innermost enclosing function, for literals
    pub parent: Option<FunctionId>,
}

/// One receiver, parameter, result or type parameter of a function.
#[derive(Debug, Clone)]
pub struct SignatureEntry<'a> {
    /// Role
    pub role: SignatureRole,
    /// Ordinal within its role
    pub position: usize,
    /// Declared type
    pub ty: Option<TypeId>,
    /// Declared name
    pub name: Option<&'a str>,
}

fn find(conn: &Connection, file: FileId, position: Position) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM functions WHERE file_id = ?1 AND line = ?2 AND column = ?3",
        params![file.as_i64(), position.line, position.column],
        |row| row.get(0),
    )
    .optional()
}

impl Session {
    /// Find or create a function. Signature entries are written only when
    /// the function is new.
    pub fn insert_function(
        &mut self,
        row: &FunctionRow<'_>,
        signature: &[SignatureEntry<'_>],
    ) -> Result<(FunctionId, bool)> {
        let (id, inserted) = self.find_or_create(
            |conn| find(conn, row.file, row.position),
            |conn| {
                conn.execute(
                    "INSERT INTO functions
                     (name, file_id, line, column, is_variadic, is_generic, is_literal, parent_id, type_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        row.name,
                        row.file.as_i64(),
                        row.position.line,
                        row.position.column,
                        row.is_variadic,
                        row.is_generic,
                        row.is_literal,
                        row.parent.map(FunctionId::as_i64),
                        row.signature.map(TypeId::as_i64),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            },
            |conn, id| {
                let mut stmt = conn.prepare(
                    "INSERT INTO function_sigs (function_id, role, position, type_id, name)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for entry in signature {
                    stmt.execute(params![
                        id,
                        entry.role.as_str(),
                        ordinal(entry.position),
                        entry.ty.map(TypeId::as_i64),
                        entry.name,
                    ])?;
                }
                Ok(())
            },
        )?;
        Ok((FunctionId::from(id), inserted))
    }

    /// Look up a function by the position of its name (or `func` keyword).
    pub fn find_function(&self, file: FileId, position: Position) -> Result<Option<FunctionId>> {
        Ok(find(&self.conn, file, position)?.map(FunctionId::from))
    }
}
