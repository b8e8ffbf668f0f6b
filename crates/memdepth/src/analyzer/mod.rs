//! Per-unit analysis passes.
//!
//! Each pass walks one file at a time with a file walker, which carries
//! the file's row id, the enclosing-function stack and access to the shared
//! [`AnalysisContext`]:
//!
//! - `defs`: functions, signature entries and variables
//! - `depth`: statements, expressions and memory-access depth
//! - `alloc`: `make` sites and sized `make`/`new` sites
//!
//! The depth pass finds functions and variables by position, so in
//! [`AnalysisMode::All`] every file's definitions are written before any
//! file's depth.

pub mod access;
mod alloc;
mod defs;
mod depth;

pub use access::{AccessChain, Step};
pub use alloc::{parse_int_literal, render_type_expr};

use tracing::debug;

use crate::context::AnalysisContext;
use crate::db::{NodeContext, Session};
use crate::error::{Result, UnitError};
use crate::syntax::{Ident, Object, ObjectRef, ParsedUnit, SourceFile, TypeRef};
use crate::types::{AnalysisMode, FileId, FunctionId, Position, TypeId};

/// State shared by every pass over one file.
pub(crate) struct FileWalker<'a> {
    ctx: &'a AnalysisContext,
    session: &'a mut Session,
    unit: &'a ParsedUnit,
    file: &'a SourceFile,
    file_id: FileId,
    functions: Vec<FunctionId>,
}

impl<'a> FileWalker<'a> {
    fn new(
        ctx: &'a AnalysisContext,
        session: &'a mut Session,
        unit: &'a ParsedUnit,
        file: &'a SourceFile,
    ) -> Result<Self> {
        let file_id = ctx.positions().file_id(session, &file.path)?;
        Ok(Self {
            ctx,
            session,
            unit,
            file,
            file_id,
            functions: Vec::new(),
        })
    }

    /// Outermost and innermost enclosing functions.
    fn context(&self) -> NodeContext {
        NodeContext {
            function: self.functions.first().copied(),
            parent: self.functions.last().copied(),
        }
    }

    fn push(&mut self, function: FunctionId) {
        self.functions.push(function);
    }

    fn pop(&mut self) {
        self.functions.pop();
    }

    fn innermost(&self) -> Option<FunctionId> {
        self.functions.last().copied()
    }

    /// Interned id of a resolved type; `None` when unresolved.
    fn type_id(&mut self, ty: Option<TypeRef>) -> Result<Option<TypeId>> {
        self.ctx
            .interner()
            .optional_type_id(&mut *self.session, &self.unit.types, ty)
    }

    fn object(&self, r: Option<ObjectRef>) -> Option<&'a Object> {
        self.unit.objects.get(r)
    }

    /// Type of an identifier, falling back to the type of its object.
    fn ident_type(&self, ident: &Ident) -> Option<TypeRef> {
        ident
            .ty
            .or_else(|| self.object(ident.obj).and_then(|o| o.ty))
    }

    /// Function recorded at `position` in this file.
    fn function_at(&self, position: Position) -> Result<Option<FunctionId>> {
        self.session.find_function(self.file_id, position)
    }
}

/// Run the passes `mode` selects over one parsed unit.
///
/// Files the front end flagged are skipped; the returned errors describe
/// them. Storage failures abort the unit and are returned as `Err`.
///
/// With [`AnalysisMode::All`] both passes run over this unit alone. Package
/// members defined in units not yet analyzed resolve to the unknown variable;
/// [`Pipeline`](crate::Pipeline) avoids that by running the passes as
/// separate corpus-wide phases.
pub fn analyze_unit(
    ctx: &AnalysisContext,
    session: &mut Session,
    unit: &ParsedUnit,
    mode: AnalysisMode,
) -> Result<Vec<UnitError>> {
    let (files, errors) = unit.usable_files();

    if mode.records_definitions() {
        for file in &files {
            defs::Definitions::new(FileWalker::new(ctx, session, unit, file)?).run()?;
        }
    }
    if mode.records_depth() {
        for file in &files {
            depth::Depth::new(FileWalker::new(ctx, session, unit, file)?).run()?;
        }
    }
    match mode {
        AnalysisMode::Make => {
            for file in &files {
                alloc::MakeSites::new(FileWalker::new(ctx, session, unit, file)?).run()?;
            }
        }
        AnalysisMode::AllocSizes => {
            for file in &files {
                alloc::SizedAllocs::new(FileWalker::new(ctx, session, unit, file)?).run()?;
            }
        }
        AnalysisMode::Defs | AnalysisMode::Depth | AnalysisMode::All => {}
    }

    debug!(
        dir = %unit.dir.display(),
        package = %unit.package,
        files = files.len(),
        skipped = errors.len(),
        mode = %mode,
        "Analyzed unit"
    );
    Ok(errors)
}
