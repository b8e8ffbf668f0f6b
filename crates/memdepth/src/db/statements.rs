//! Statement rows and their kind-specific children.

use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::ordinal;
use super::{NodeContext, Session};
use crate::error::Result;
use crate::types::{ExprId, FileId, FunctionId, Position, Span, StmtId, StmtKind, TypeId};

/// Data required to insert a statement.
#[derive(Debug, Clone, Copy)]
pub struct StmtRow {
    /// Syntactic kind
    pub kind: StmtKind,
    /// Containing file
    pub file: FileId,
    /// Extent
    pub span: Span,
    /// Enclosing functions
    pub context: NodeContext,
}

/// One type listed in a type-switch case clause.
#[derive(Debug, Clone, Copy)]
pub struct TypeSwitchCase {
    /// Ordinal of the clause in the switch body
    pub clause: usize,
    /// Ordinal of the type within the clause
    pub position: usize,
    /// Position of the type expression
    pub at: Position,
    /// Resolved type; `None` when unresolved
    pub ty: Option<TypeId>,
}

/// Kind-specific children of a statement.
#[derive(Debug, Clone, Copy)]
pub enum StmtDetail<'a> {
    /// No child rows
    None,
    /// Assignment operands, in order
    Assign {
        /// Left-hand operands
        lhs: &'a [ExprId],
        /// Right-hand operands
        rhs: &'a [ExprId],
    },
    /// Returned expressions, in order
    Return {
        /// Results
        results: &'a [ExprId],
    },
    /// Deferred call
    Defer {
        /// Call expression
        call: ExprId,
    },
    /// Type switch binding and cases
    TypeSwitch {
        /// Name bound by `x := y.(type)`
        bound: Option<&'a str>,
        /// The `y.(type)` expression
        assert: ExprId,
        /// Case types
        cases: &'a [TypeSwitchCase],
    },
}

fn find(conn: &Connection, file: FileId, span: Span) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM statements
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

fn insert_detail(conn: &Connection, id: i64, detail: &StmtDetail<'_>) -> Result<()> {
    match detail {
        StmtDetail::None => {}
        StmtDetail::Assign { lhs, rhs } => {
            let mut stmt = conn.prepare(
                "INSERT INTO stmt_assign_operands (stmt_id, side, position, expr_id)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (i, expr) in lhs.iter().enumerate() {
                stmt.execute(params![id, "lhs", ordinal(i), expr.as_i64()])?;
            }
            for (i, expr) in rhs.iter().enumerate() {
                stmt.execute(params![id, "rhs", ordinal(i), expr.as_i64()])?;
            }
        }
        StmtDetail::Return { results } => {
            let mut stmt = conn.prepare(
                "INSERT INTO stmt_return_results (stmt_id, position, expr_id) VALUES (?1, ?2, ?3)",
            )?;
            for (i, expr) in results.iter().enumerate() {
                stmt.execute(params![id, ordinal(i), expr.as_i64()])?;
            }
        }
        StmtDetail::Defer { call } => {
            conn.execute(
                "INSERT INTO stmt_defers (stmt_id, call_expr_id) VALUES (?1, ?2)",
                params![id, call.as_i64()],
            )?;
        }
        StmtDetail::TypeSwitch {
            bound,
            assert,
            cases,
        } => {
            conn.execute(
                "INSERT INTO stmt_type_switches (stmt_id, bound_name, assert_expr_id)
                 VALUES (?1, ?2, ?3)",
                params![id, bound, assert.as_i64()],
            )?;
            let mut stmt = conn.prepare(
                "INSERT INTO stmt_type_switch_cases (stmt_id, clause, position, line, column, type_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for case in *cases {
                stmt.execute(params![
                    id,
                    ordinal(case.clause),
                    ordinal(case.position),
                    case.at.line,
                    case.at.column,
                    case.ty.map(TypeId::as_i64),
                ])?;
            }
        }
    }
    Ok(())
}

impl Session {
    /// Find or create a statement. Children are written only when it is new.
    pub fn insert_stmt(
        &mut self,
        row: &StmtRow,
        detail: &StmtDetail<'_>,
    ) -> Result<(StmtId, bool)> {
        let (id, inserted) = self.find_or_create(
            |conn| find(conn, row.file, row.span),
            |conn| {
                conn.execute(
                    "INSERT INTO statements
                     (kind, file_id, line, column, end_line, end_column, function_id, parent_function_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        row.kind.as_str(),
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
            |conn, id| insert_detail(conn, id, detail),
        )?;
        Ok((StmtId::from(id), inserted))
    }
}
