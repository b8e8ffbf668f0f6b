//! Definitions pass: functions, signature entries and variables.

use tracing::{debug, trace};

use super::FileWalker;
use crate::db::{FunctionRow, SignatureEntry, VariableRow};
use crate::error::Result;
use crate::syntax::visit::{walk_expr, walk_file, walk_func_decl, walk_gen_decl, walk_stmt};
use crate::syntax::{
    AssignOp, DeclToken, Expr, ExprNode, FieldList, FuncDecl, FuncType, GenDecl, Ident,
    Signature, Spec, Stmt, TypeData, TypeRef, Visitor,
};
use crate::types::{FunctionId, Position, SignatureRole, VariableRole};

pub(crate) struct Definitions<'a> {
    w: FileWalker<'a>,
}

/// A function about to be recorded.
struct FunctionSite<'n> {
    name: Option<&'n str>,
    position: Position,
    ty: Option<TypeRef>,
    is_literal: bool,
    parent: Option<FunctionId>,
}

impl<'a> Definitions<'a> {
    pub(crate) fn new(w: FileWalker<'a>) -> Self {
        Self { w }
    }

    pub(crate) fn run(mut self) -> Result<()> {
        let file = self.w.file;
        walk_file(&mut self, file)
    }

    fn function(&mut self, site: &FunctionSite<'_>, ast: &FuncType) -> Result<FunctionId> {
        let unit = self.w.unit;
        let sig = site.ty.and_then(|r| match unit.types.underlying(r) {
            Some(TypeData::Signature(sig)) => Some(sig),
            _ => None,
        });

        let signature = self.w.type_id(site.ty)?;
        let mut entries = Vec::new();
        if let Some(sig) = sig {
            let groups = [
                (SignatureRole::Receiver, sig.recv.as_slice()),
                (SignatureRole::Param, sig.params.as_slice()),
                (SignatureRole::Result, sig.results.as_slice()),
                (SignatureRole::TypeParam, sig.type_params.as_slice()),
            ];
            for (role, params) in groups {
                for (position, param) in params.iter().enumerate() {
                    entries.push(SignatureEntry {
                        role,
                        position,
                        ty: self.w.type_id(Some(param.ty))?,
                        name: param.name.as_deref(),
                    });
                }
            }
        }

        let row = FunctionRow {
            name: site.name,
            file: self.w.file_id,
            position: site.position,
            signature,
            is_variadic: sig.map_or_else(|| ends_with_ellipsis(&ast.params), |s| s.variadic),
            is_generic: sig.map_or_else(
                || ast.type_params.as_ref().is_some_and(|l| !l.fields.is_empty()),
                Signature::is_generic,
            ),
            is_literal: site.is_literal,
            parent: site.parent,
        };
        let (id, inserted) = self.w.session.insert_function(&row, &entries)?;
        if inserted {
            debug!(
                name = site.name.unwrap_or("<literal>"),
                line = site.position.line,
                column = site.position.column,
                id = id.as_i64(),
                "Recorded function"
            );
        }
        Ok(id)
    }

    /// Variables for the named fields of a receiver, parameter or result list.
    fn fields(
        &mut self,
        list: Option<&FieldList>,
        role: VariableRole,
        function: FunctionId,
    ) -> Result<()> {
        let Some(list) = list else {
            return Ok(());
        };
        for field in &list.fields {
            for name in &field.names {
                let ty = self.w.ident_type(name).or(field.ty.ty);
                self.variable(name, ty, false, Some(function), role)?;
            }
        }
        Ok(())
    }

    fn signature_variables(&mut self, ty: &FuncType, function: FunctionId) -> Result<()> {
        self.fields(Some(&ty.params), VariableRole::Param, function)?;
        self.fields(ty.results.as_ref(), VariableRole::Result, function)
    }

    fn variable(
        &mut self,
        name: &Ident,
        ty: Option<TypeRef>,
        is_const: bool,
        function: Option<FunctionId>,
        role: VariableRole,
    ) -> Result<()> {
        self.variable_at(&name.name, name.span.start(), ty, is_const, function, role)
    }

    fn variable_at(
        &mut self,
        name: &str,
        position: Position,
        ty: Option<TypeRef>,
        is_const: bool,
        function: Option<FunctionId>,
        role: VariableRole,
    ) -> Result<()> {
        if name == "_" {
            return Ok(());
        }
        let ty = self.w.type_id(ty)?;
        let row = VariableRow {
            name,
            file: self.w.file_id,
            position,
            ty,
            is_const,
            function,
            role,
        };
        let (id, inserted) = self.w.session.insert_variable(&row)?;
        if inserted {
            trace!(name, id = id.as_i64(), global = row.is_global(), "Recorded variable");
        }
        Ok(())
    }

    /// Record `expr` as a variable if it is an identifier defined right there.
    fn defined_here(&mut self, expr: &Expr) -> Result<()> {
        let ExprNode::Ident { name, obj } = &expr.node else {
            return Ok(());
        };
        let Some(object) = self.w.object(*obj) else {
            return Ok(());
        };
        if !object.is_declared_at(&self.w.file.path, expr.span.start()) {
            return Ok(());
        }
        let ty = expr.ty.or(object.ty);
        let function = self.w.innermost();
        self.variable_at(name, expr.span.start(), ty, false, function, VariableRole::Local)
    }
}

fn ends_with_ellipsis(params: &FieldList) -> bool {
    params
        .fields
        .last()
        .is_some_and(|f| matches!(f.ty.node, ExprNode::Ellipsis { .. }))
}

impl Visitor for Definitions<'_> {
    fn visit_func_decl(&mut self, decl: &FuncDecl) -> Result<()> {
        let site = FunctionSite {
            name: Some(&decl.name.name),
            position: decl.name.span.start(),
            ty: self.w.ident_type(&decl.name),
            is_literal: false,
            parent: None,
        };
        let id = self.function(&site, &decl.ty)?;

        self.w.push(id);
        let walked = self
            .fields(decl.recv.as_ref(), VariableRole::Receiver, id)
            .and_then(|()| self.signature_variables(&decl.ty, id))
            .and_then(|()| walk_func_decl(self, decl));
        self.w.pop();
        walked
    }

    fn visit_gen_decl(&mut self, decl: &GenDecl) -> Result<()> {
        if matches!(decl.tok, DeclToken::Const | DeclToken::Var) {
            let is_const = decl.tok == DeclToken::Const;
            let function = self.w.innermost();
            for spec in &decl.specs {
                if let Spec::Value { names, ty, .. } = spec {
                    for name in names {
                        let declared = self
                            .w
                            .ident_type(name)
                            .or_else(|| ty.as_ref().and_then(|t| t.ty));
                        self.variable(name, declared, is_const, function, VariableRole::Local)?;
                    }
                }
            }
        }
        walk_gen_decl(self, decl)
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign {
                lhs,
                op: AssignOp::Define,
                ..
            } => {
                for expr in lhs {
                    self.defined_here(expr)?;
                }
            }
            Stmt::Range {
                key,
                value,
                define: true,
                ..
            } => {
                for expr in key.iter().chain(value.iter()) {
                    self.defined_here(expr)?;
                }
            }
            _ => {}
        }
        walk_stmt(self, stmt)
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<()> {
        let ExprNode::FuncLit { ty, .. } = &expr.node else {
            return walk_expr(self, expr);
        };
        let site = FunctionSite {
            name: None,
            position: expr.span.start(),
            ty: expr.ty,
            is_literal: true,
            parent: self.w.innermost(),
        };
        let id = self.function(&site, ty)?;

        self.w.push(id);
        let walked = self
            .signature_variables(ty, id)
            .and_then(|()| walk_expr(self, expr));
        self.w.pop();
        walked
    }
}
