//! Variable rows.

use rusqlite::{params, Connection, OptionalExtension};

use super::Session;
use crate::error::Result;
use crate::types::{FileId, FunctionId, Position, TypeId, VariableId, VariableRole};

/// Data required to insert a variable.
#[derive(Debug, Clone)]
pub struct VariableRow<'a> {
    /// Name
    pub name: &'a str,
    /// Declaring file
    pub file: FileId,
    /// Position of the declaring identifier
    pub position: Position,
    /// Resolved type
    pub ty: Option<TypeId>,
    /// Declared with `const`
    pub is_const: bool,
    /// Enclosing function; `None` for package-level variables
    pub function: Option<FunctionId>,
    /// How a local variable is bound
    pub role: VariableRole,
}

impl VariableRow<'_> {
    /// Package-level variables have no enclosing function.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.function.is_none()
    }
}

fn find(conn: &Connection, file: FileId, position: Position) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM variables WHERE file_id = ?1 AND line = ?2 AND column = ?3",
        params![file.as_i64(), position.line, position.column],
        |row| row.get(0),
    )
    .optional()
}

impl Session {
    /// Find or create a variable. Local variables also get their role row.
    pub fn insert_variable(&mut self, row: &VariableRow<'_>) -> Result<(VariableId, bool)> {
        let (id, inserted) = self.find_or_create(
            |conn| find(conn, row.file, row.position),
            |conn| {
                conn.execute(
                    "INSERT INTO variables
                     (name, file_id, line, column, type_id, is_global, is_const, function_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        row.name,
                        row.file.as_i64(),
                        row.position.line,
                        row.position.column,
                        row.ty.map(TypeId::as_i64),
                        row.is_global(),
                        row.is_const,
                        row.function.map(FunctionId::as_i64),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            },
            |conn, id| {
                if !row.is_global() {
                    conn.execute(
                        "INSERT INTO local_variables (variable_id, is_param, is_result, is_receiver)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            id,
                            row.role == VariableRole::Param,
                            row.role == VariableRole::Result,
                            row.role == VariableRole::Receiver,
                        ],
                    )?;
                }
                Ok(())
            },
        )?;
        Ok((VariableId::from(id), inserted))
    }

    /// Look up a variable by the position of its declaring identifier.
    pub fn find_variable(&self, file: FileId, position: Position) -> Result<Option<VariableId>> {
        Ok(find(&self.conn, file, position)?.map(VariableId::from))
    }
}
