//! Expression rows, their kind-specific children, and memory accesses.
//!
//! The memory-access row of an expression is written in the same transaction
//! as the expression row, so an expression never exists without the access
//! that classifies it.

use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::ordinal;
use super::{NodeContext, Session};
use crate::error::Result;
use crate::types::{
    ExprId, ExprKind, FileId, FunctionId, MemAccessKind, Position, Span, TypeId, VariableId,
};

/// Data required to insert an expression.
#[derive(Debug, Clone, Copy)]
pub struct ExprRow {
    /// Syntactic kind
    pub kind: ExprKind,
    /// Resolved static type
    pub ty: Option<TypeId>,
    /// Containing file
    pub file: FileId,
    /// Extent
    pub span: Span,
    /// Enclosing functions
    pub context: NodeContext,
}

/// Kind-specific children of an expression.
#[derive(Debug, Clone, Copy)]
pub enum ExprDetail<'a> {
    /// No child rows
    None,
    /// Identifier name and, when inside the corpus, its definition site
    Ident {
        /// Identifier text
        name: &'a str,
        /// Defining file and position
        def: Option<(FileId, Position)>,
    },
    /// `base.field`
    Selector {
        /// Operand expression
        base: ExprId,
        /// Selected name
        field: &'a str,
    },
    /// `base.(T)`
    TypeAssert {
        /// Operand expression
        base: ExprId,
        /// Asserted type; `None` for `.(type)` or when unresolved
        ty: Option<TypeId>,
    },
    /// `function(args...)`
    Call {
        /// Callee expression
        function: ExprId,
        /// Argument expressions
        args: &'a [ExprId],
    },
}

/// Memory-access classification of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemAccessRow<'a> {
    /// Access kind
    pub kind: MemAccessKind,
    /// The operand's own memory access, for chained accesses
    pub inner: Option<ExprId>,
    /// Root identifier name
    pub base_name: Option<&'a str>,
    /// Root variable, when resolved
    pub base_variable: Option<VariableId>,
    /// Signed indirection depth
    pub depth: i64,
    /// Indirection levels that could not be classified
    pub uncertainty: i64,
}

impl MemAccessRow<'_> {
    /// Value stored in `base_variable_id`.
    ///
    /// Null exactly when the access carries uncertainty. A certain access
    /// whose root is unknown (a call result, an identifier defined outside
    /// the corpus) points at the sentinel variable.
    #[must_use]
    pub fn base_variable_column(&self) -> Option<i64> {
        if self.uncertainty > 0 {
            None
        } else {
            Some(self.base_variable.unwrap_or(VariableId::UNKNOWN).as_i64())
        }
    }
}

fn find(conn: &Connection, file: FileId, span: Span) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM expressions
         WHERE file_id = ?1 AND line = ?2 AND column = ?3 AND end_line = ?4 AND end_column = ?5",
        params![
            file.as_i64(),
            span.start_line,
            span.start_column,
            span.end_line,
            span.end_column
        ],
        |row| row.get(0),
    )
    .optional()
}

fn insert_detail(conn: &Connection, id: i64, detail: &ExprDetail<'_>) -> Result<()> {
    match detail {
        ExprDetail::None => {}
        ExprDetail::Ident { name, def } => {
            conn.execute(
                "INSERT INTO expr_idents (expr_id, name, def_file_id, def_line, def_column)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    name,
                    def.map(|(file, _)| file.as_i64()),
                    def.map(|(_, pos)| pos.line),
                    def.map(|(_, pos)| pos.column),
                ],
            )?;
        }
        ExprDetail::Selector { base, field } => {
            conn.execute(
                "INSERT INTO expr_selectors (expr_id, base_expr_id, field) VALUES (?1, ?2, ?3)",
                params![id, base.as_i64(), field],
            )?;
        }
        ExprDetail::TypeAssert { base, ty } => {
            conn.execute(
                "INSERT INTO expr_type_asserts (expr_id, base_expr_id, type_id) VALUES (?1, ?2, ?3)",
                params![id, base.as_i64(), ty.map(TypeId::as_i64)],
            )?;
        }
        ExprDetail::Call { function, args } => {
            let mut stmt = conn.prepare(
                "INSERT INTO expr_calls (expr_id, position, function_expr_id, arg_expr_id)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            if args.is_empty() {
                stmt.execute(params![id, 0_i64, function.as_i64(), None::<i64>])?;
            }
            for (i, arg) in args.iter().enumerate() {
                stmt.execute(params![id, ordinal(i), function.as_i64(), arg.as_i64()])?;
            }
        }
    }
    Ok(())
}

fn insert_access(conn: &Connection, id: i64, access: &MemAccessRow<'_>) -> Result<()> {
    conn.execute(
        "INSERT INTO memory_accesses
         (expr_id, kind, inner_expr_id, base_name, base_variable_id, depth, uncertainty)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            access.kind.as_str(),
            access.inner.map(ExprId::as_i64),
            access.base_name,
            access.base_variable_column(),
            access.depth,
            access.uncertainty,
        ],
    )?;
    Ok(())
}

impl Session {
    /// Find or create an expression.
    ///
    /// Kind-specific children and the memory access (if any) are written in
    /// the same transaction, and only when the expression is new.
    pub fn insert_expr(
        &mut self,
        row: &ExprRow,
        detail: &ExprDetail<'_>,
        access: Option<&MemAccessRow<'_>>,
    ) -> Result<(ExprId, bool)> {
        let (id, inserted) = self.find_or_create(
            |conn| find(conn, row.file, row.span),
            |conn| {
                conn.execute(
                    "INSERT INTO expressions
                     (kind, type_id, file_id, line, column, end_line, end_column, function_id, parent_function_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        row.kind.as_str(),
                        row.ty.map(TypeId::as_i64),
                        row.file.as_i64(),
                        row.span.start_line,
                        row.span.start_column,
                        row.span.end_line,
                        row.span.end_column,
                        row.context.function.map(FunctionId::as_i64),
                        row.context.parent.map(FunctionId::as_i64),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            },
            |conn, id| {
                insert_detail(conn, id, detail)?;
                if let Some(access) = access {
                    insert_access(conn, id, access)?;
                }
                Ok(())
            },
        )?;
        Ok((ExprId::from(id), inserted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(base: Option<VariableId>, uncertainty: i64) -> MemAccessRow<'static> {
        MemAccessRow {
            kind: MemAccessKind::Ident,
            inner: None,
            base_name: None,
            base_variable: base,
            depth: 0,
            uncertainty,
        }
    }

    #[test]
    fn certain_access_keeps_its_base() {
        assert_eq!(access(Some(VariableId(42)), 0).base_variable_column(), Some(42));
    }

    #[test]
    fn certain_access_without_base_uses_sentinel() {
        assert_eq!(
            access(None, 0).base_variable_column(),
            Some(VariableId::UNKNOWN.as_i64())
        );
    }

    #[test]
    fn uncertain_access_never_has_a_base() {
        assert_eq!(access(Some(VariableId(42)), 1).base_variable_column(), None);
        assert_eq!(access(None, 2).base_variable_column(), None);
    }
}
