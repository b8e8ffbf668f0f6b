//! Depth pass: statements, expressions and memory accesses.
//!
//! Nodes are written post-order. An expression's children are written
//! first, then the expression row, its kind-specific rows and its memory
//! access in one transaction. The [`AccessChain`] of each child is carried up
//! and extended with the rules in [`super::access`].
//!
//! Both matches here are exhaustive: a new syntax variant does not compile
//! until this pass decides what to record for it.

use tracing::warn;

use super::FileWalker;
use super::access::{AccessChain, Step};
use crate::db::{ExprDetail, ExprRow, StmtDetail, StmtRow, TypeSwitchCase};
use crate::error::Result;
use crate::syntax::{
    BasicLit, Block, Decl, Expr, ExprNode, FieldList, FuncDecl, FuncType, GenDecl, Ident,
    ObjectKind, ObjectRef, Spec, Stmt, TypeRef, UnaryOp,
};
use crate::types::{ExprId, ExprKind, FileId, MemAccessKind, Position, Span, StmtId, StmtKind};

/// An expression's row and, if it is a memory access, its chain.
#[derive(Debug, Clone)]
struct ExprResult {
    id: ExprId,
    access: Option<AccessChain>,
}

/// A memory access about to be written.
struct Classified {
    kind: MemAccessKind,
    inner: Option<ExprId>,
    chain: AccessChain,
}

pub(crate) struct Depth<'a> {
    w: FileWalker<'a>,
}

impl<'a> Depth<'a> {
    pub(crate) fn new(w: FileWalker<'a>) -> Self {
        Self { w }
    }

    pub(crate) fn run(mut self) -> Result<()> {
        let file = self.w.file;
        self.ident(&file.package)?;
        for decl in &file.decls {
            match decl {
                Decl::Bad(_) => {}
                Decl::Func(func) => self.func_decl(func)?,
                Decl::Gen(gen_decl) => self.gen_decl(gen_decl)?,
            }
        }
        Ok(())
    }

    fn missing_function(&self, name: Option<&str>, at: Position) {
        warn!(
            file = %self.w.file.path.display(),
            line = at.line,
            column = at.column,
            function = name.unwrap_or("<literal>"),
            "No function row; recording its body without a function context"
        );
    }

    fn func_decl(&mut self, decl: &FuncDecl) -> Result<()> {
        let at = decl.name.span.start();
        let function = self.w.function_at(at)?;
        match function {
            Some(id) => self.w.push(id),
            None => self.missing_function(Some(&decl.name.name), at),
        }

        let result = self.func_decl_children(decl);
        if function.is_some() {
            self.w.pop();
        }
        result
    }

    fn func_decl_children(&mut self, decl: &FuncDecl) -> Result<()> {
        if let Some(recv) = &decl.recv {
            self.field_list(recv)?;
        }
        self.ident(&decl.name)?;
        self.func_type_children(&decl.ty)?;
        let signature = self.w.ident_type(&decl.name);
        self.write_expr(
            decl.ty.span,
            signature,
            ExprKind::FuncType,
            &ExprDetail::None,
            None,
        )?;
        if let Some(body) = &decl.body {
            self.block(body)?;
        }
        Ok(())
    }

    fn gen_decl(&mut self, decl: &GenDecl) -> Result<()> {
        for spec in &decl.specs {
            match spec {
                Spec::Import { name, path, .. } => {
                    if let Some(name) = name {
                        self.ident(name)?;
                    }
                    self.basic_lit(path)?;
                }
                Spec::Value {
                    names, ty, values, ..
                } => {
                    for name in names {
                        self.ident(name)?;
                    }
                    if let Some(ty) = ty {
                        self.expr(ty)?;
                    }
                    for value in values {
                        self.expr(value)?;
                    }
                }
                Spec::Type {
                    name,
                    type_params,
                    ty,
                    ..
                } => {
                    self.ident(name)?;
                    if let Some(params) = type_params {
                        self.field_list(params)?;
                    }
                    self.expr(ty)?;
                }
            }
        }
        Ok(())
    }

    fn field_list(&mut self, list: &FieldList) -> Result<()> {
        for field in &list.fields {
            for name in &field.names {
                self.ident(name)?;
            }
            self.expr(&field.ty)?;
            if let Some(tag) = &field.tag {
                self.basic_lit(tag)?;
            }
        }
        Ok(())
    }

    fn func_type_children(&mut self, ty: &FuncType) -> Result<()> {
        if let Some(params) = &ty.type_params {
            self.field_list(params)?;
        }
        self.field_list(&ty.params)?;
        if let Some(results) = &ty.results {
            self.field_list(results)?;
        }
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self, block: &Block) -> Result<StmtId> {
        self.stmts(&block.stmts)?;
        self.write_stmt(StmtKind::Block, block.span, &StmtDetail::None)
    }

    fn stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn opt_stmt(&mut self, stmt: Option<&Stmt>) -> Result<()> {
        if let Some(stmt) = stmt {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn opt_expr(&mut self, expr: Option<&Expr>) -> Result<Option<ExprResult>> {
        expr.map(|e| self.expr(e)).transpose()
    }

    fn expr_ids(&mut self, exprs: &[Expr]) -> Result<Vec<ExprId>> {
        exprs.iter().map(|e| self.expr(e).map(|r| r.id)).collect()
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<StmtId> {
        match stmt {
            Stmt::Bad(span) => self.write_stmt(StmtKind::Bad, *span, &StmtDetail::None),
            Stmt::Empty(span) => self.write_stmt(StmtKind::Empty, *span, &StmtDetail::None),
            Stmt::Other(span) => self.write_stmt(StmtKind::Other, *span, &StmtDetail::None),
            Stmt::Decl { span, decl } => {
                self.gen_decl(decl)?;
                self.write_stmt(StmtKind::Decl, *span, &StmtDetail::None)
            }
            Stmt::Labeled { span, label, stmt } => {
                self.ident(label)?;
                self.stmt(stmt)?;
                self.write_stmt(StmtKind::Labeled, *span, &StmtDetail::None)
            }
            Stmt::Expr { span, x } => self.expr_stmt(*span, x).map(|(id, _)| id),
            Stmt::Send { span, chan, value } => {
                self.expr(chan)?;
                self.expr(value)?;
                self.write_stmt(StmtKind::Send, *span, &StmtDetail::None)
            }
            Stmt::IncDec { span, x, .. } => {
                self.expr(x)?;
                self.write_stmt(StmtKind::IncDec, *span, &StmtDetail::None)
            }
            Stmt::Assign { span, lhs, rhs, .. } => {
                self.assign_stmt(*span, lhs, rhs).map(|(id, _, _)| id)
            }
            Stmt::Go { span, call } => {
                self.expr(call)?;
                self.write_stmt(StmtKind::Go, *span, &StmtDetail::None)
            }
            Stmt::Defer { span, call } => {
                let call = self.expr(call)?.id;
                self.write_stmt(StmtKind::Defer, *span, &StmtDetail::Defer { call })
            }
            Stmt::Return { span, results } => {
                let results = self.expr_ids(results)?;
                self.write_stmt(
                    StmtKind::Return,
                    *span,
                    &StmtDetail::Return { results: &results },
                )
            }
            Stmt::Branch { span, label, .. } => {
                if let Some(label) = label {
                    self.ident(label)?;
                }
                self.write_stmt(StmtKind::Branch, *span, &StmtDetail::None)
            }
            Stmt::Block(block) => self.block(block),
            Stmt::If {
                span,
                init,
                cond,
                body,
                els,
            } => {
                self.opt_stmt(init.as_deref())?;
                self.expr(cond)?;
                self.block(body)?;
                self.opt_stmt(els.as_deref())?;
                self.write_stmt(StmtKind::If, *span, &StmtDetail::None)
            }
            Stmt::CaseClause { span, list, body } => {
                for expr in list {
                    self.expr(expr)?;
                }
                self.stmts(body)?;
                self.write_stmt(StmtKind::CaseClause, *span, &StmtDetail::None)
            }
            Stmt::Switch {
                span,
                init,
                tag,
                body,
            } => {
                self.opt_stmt(init.as_deref())?;
                self.opt_expr(tag.as_ref())?;
                self.block(body)?;
                self.write_stmt(StmtKind::Switch, *span, &StmtDetail::None)
            }
            Stmt::TypeSwitch {
                span,
                init,
                assign,
                body,
            } => self.type_switch(*span, init.as_deref(), assign, body),
            Stmt::CommClause { span, comm, body } => {
                self.opt_stmt(comm.as_deref())?;
                self.stmts(body)?;
                self.write_stmt(StmtKind::CommClause, *span, &StmtDetail::None)
            }
            Stmt::Select { span, body } => {
                self.block(body)?;
                self.write_stmt(StmtKind::Select, *span, &StmtDetail::None)
            }
            Stmt::For {
                span,
                init,
                cond,
                post,
                body,
            } => {
                self.opt_stmt(init.as_deref())?;
                self.opt_expr(cond.as_ref())?;
                self.opt_stmt(post.as_deref())?;
                self.block(body)?;
                self.write_stmt(StmtKind::For, *span, &StmtDetail::None)
            }
            Stmt::Range {
                span,
                key,
                value,
                x,
                body,
                ..
            } => {
                self.opt_expr(key.as_ref())?;
                self.opt_expr(value.as_ref())?;
                self.expr(x)?;
                self.block(body)?;
                self.write_stmt(StmtKind::Range, *span, &StmtDetail::None)
            }
        }
    }

    fn expr_stmt(&mut self, span: Span, x: &Expr) -> Result<(StmtId, ExprId)> {
        let x = self.expr(x)?.id;
        let id = self.write_stmt(StmtKind::Expr, span, &StmtDetail::None)?;
        Ok((id, x))
    }

    fn assign_stmt(
        &mut self,
        span: Span,
        lhs: &[Expr],
        rhs: &[Expr],
    ) -> Result<(StmtId, Vec<ExprId>, Vec<ExprId>)> {
        let lhs_ids = self.expr_ids(lhs)?;
        let rhs_ids = self.expr_ids(rhs)?;
        let id = self.write_stmt(
            StmtKind::Assign,
            span,
            &StmtDetail::Assign {
                lhs: &lhs_ids,
                rhs: &rhs_ids,
            },
        )?;
        Ok((id, lhs_ids, rhs_ids))
    }

    fn type_switch(
        &mut self,
        span: Span,
        init: Option<&Stmt>,
        guard: &Stmt,
        body: &Block,
    ) -> Result<StmtId> {
        self.opt_stmt(init)?;

        let binding = match guard {
            Stmt::Assign {
                span: guard_span,
                lhs,
                rhs,
                ..
            } => {
                let (_, _, rhs_ids) = self.assign_stmt(*guard_span, lhs, rhs)?;
                let bound = lhs.first().and_then(Expr::ident_name);
                rhs_ids.first().map(|&assert| (bound, assert))
            }
            Stmt::Expr { span: guard_span, x } => {
                let (_, x) = self.expr_stmt(*guard_span, x)?;
                Some((None, x))
            }
            other => {
                self.stmt(other)?;
                None
            }
        };

        self.block(body)?;

        let Some((bound, assert)) = binding else {
            return self.write_stmt(StmtKind::TypeSwitch, span, &StmtDetail::None);
        };

        let mut cases = Vec::new();
        for (clause, stmt) in body.stmts.iter().enumerate() {
            let Stmt::CaseClause { list, .. } = stmt else {
                continue;
            };
            for (position, ty) in list.iter().enumerate() {
                cases.push(TypeSwitchCase {
                    clause,
                    position,
                    at: ty.span.start(),
                    ty: self.w.type_id(ty.ty)?,
                });
            }
        }

        self.write_stmt(
            StmtKind::TypeSwitch,
            span,
            &StmtDetail::TypeSwitch {
                bound,
                assert,
                cases: &cases,
            },
        )
    }

    fn write_stmt(
        &mut self,
        kind: StmtKind,
        span: Span,
        detail: &StmtDetail<'_>,
    ) -> Result<StmtId> {
        let row = StmtRow {
            kind,
            file: self.w.file_id,
            span,
            context: self.w.context(),
        };
        let (id, _) = self.w.session.insert_stmt(&row, detail)?;
        Ok(id)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, expr: &Expr) -> Result<ExprResult> {
        match &expr.node {
            ExprNode::Bad => self.plain(expr, ExprKind::Bad),
            ExprNode::Ident { name, obj } => self.ident_expr(expr, name, *obj),
            ExprNode::Ellipsis { elt } => {
                self.opt_expr(elt.as_deref())?;
                self.plain(expr, ExprKind::Ellipsis)
            }
            ExprNode::BasicLit { .. } => self.plain(expr, ExprKind::BasicLit),
            ExprNode::FuncLit { ty, body } => self.func_lit(expr, ty, body),
            ExprNode::CompositeLit { ty, elts } => {
                self.opt_expr(ty.as_deref())?;
                self.expr_ids(elts)?;
                self.plain(expr, ExprKind::CompositeLit)
            }
            ExprNode::Paren { x } => {
                let base = self.expr(x)?;
                self.extend(expr, ExprKind::Paren, &base, Step::Paren, &ExprDetail::None)
            }
            ExprNode::Selector { x, sel } => self.selector(expr, x, sel),
            ExprNode::Index { x, index } => {
                let base = self.expr(x)?;
                self.expr(index)?;
                let step = Step::Index(self.w.unit.types.shape(x.ty));
                self.extend(expr, ExprKind::Index, &base, step, &ExprDetail::None)
            }
            ExprNode::IndexList { x, indices } => {
                self.expr(x)?;
                self.expr_ids(indices)?;
                self.plain(expr, ExprKind::IndexList)
            }
            ExprNode::Slice { x, low, high, max } => {
                let base = self.expr(x)?;
                self.opt_expr(low.as_deref())?;
                self.opt_expr(high.as_deref())?;
                self.opt_expr(max.as_deref())?;
                let step = Step::Slice(self.w.unit.types.shape(x.ty));
                self.extend(expr, ExprKind::Slice, &base, step, &ExprDetail::None)
            }
            ExprNode::TypeAssert { x, ty } => {
                let base = self.expr(x)?.id;
                let target = match ty {
                    Some(ty) => {
                        self.expr(ty)?;
                        self.w.type_id(ty.ty)?
                    }
                    None => None,
                };
                self.write_expr(
                    expr.span,
                    expr.ty,
                    ExprKind::TypeAssert,
                    &ExprDetail::TypeAssert { base, ty: target },
                    None,
                )
            }
            ExprNode::Call { fun, args, .. } => {
                let function = self.expr(fun)?.id;
                let args = self.expr_ids(args)?;
                let call = Classified {
                    kind: MemAccessKind::FunctionCall,
                    inner: None,
                    chain: AccessChain::call(),
                };
                self.write_expr(
                    expr.span,
                    expr.ty,
                    ExprKind::Call,
                    &ExprDetail::Call {
                        function,
                        args: &args,
                    },
                    Some(call),
                )
            }
            ExprNode::Star { x } => {
                let base = self.expr(x)?;
                self.extend(expr, ExprKind::Star, &base, Step::Deref, &ExprDetail::None)
            }
            ExprNode::Unary { op, x } => {
                let base = self.expr(x)?;
                match op {
                    UnaryOp::Addr => {
                        self.extend(expr, ExprKind::Unary, &base, Step::Ref, &ExprDetail::None)
                    }
                    UnaryOp::Deref => {
                        self.extend(expr, ExprKind::Unary, &base, Step::Deref, &ExprDetail::None)
                    }
                    UnaryOp::Neg
                    | UnaryOp::Pos
                    | UnaryOp::Not
                    | UnaryOp::Xor
                    | UnaryOp::Recv
                    | UnaryOp::Tilde => self.plain(expr, ExprKind::Unary),
                }
            }
            ExprNode::Binary { x, y, .. } => {
                self.expr(x)?;
                self.expr(y)?;
                self.plain(expr, ExprKind::Binary)
            }
            ExprNode::KeyValue { key, value } => {
                self.expr(key)?;
                self.expr(value)?;
                self.plain(expr, ExprKind::KeyValue)
            }
            ExprNode::ArrayType { len, elt } => {
                self.opt_expr(len.as_deref())?;
                self.expr(elt)?;
                self.plain(expr, ExprKind::ArrayType)
            }
            ExprNode::StructType { fields } => {
                self.field_list(fields)?;
                self.plain(expr, ExprKind::StructType)
            }
            ExprNode::FuncType(ty) => {
                self.func_type_children(ty)?;
                self.plain(expr, ExprKind::FuncType)
            }
            ExprNode::InterfaceType { methods } => {
                self.field_list(methods)?;
                self.plain(expr, ExprKind::InterfaceType)
            }
            ExprNode::MapType { key, value } => {
                self.expr(key)?;
                self.expr(value)?;
                self.plain(expr, ExprKind::MapType)
            }
            ExprNode::ChanType { value, .. } => {
                self.expr(value)?;
                self.plain(expr, ExprKind::ChanType)
            }
        }
    }

    /// An identifier that names something but is not an expression operand.
    fn ident(&mut self, ident: &Ident) -> Result<ExprId> {
        let def = self.definition(ident.obj)?;
        let ty = self.w.ident_type(ident);
        let detail = ExprDetail::Ident {
            name: &ident.name,
            def,
        };
        Ok(self
            .write_expr(ident.span, ty, ExprKind::Ident, &detail, None)?
            .id)
    }

    fn basic_lit(&mut self, lit: &BasicLit) -> Result<ExprId> {
        Ok(self
            .write_expr(lit.span, None, ExprKind::BasicLit, &ExprDetail::None, None)?
            .id)
    }

    /// In-corpus definition site of an object.
    fn definition(&mut self, obj: Option<ObjectRef>) -> Result<Option<(FileId, Position)>> {
        match self.w.object(obj).and_then(|o| o.decl.as_ref()) {
            Some(site) => self.w.ctx.positions().definition(self.w.session, site),
            None => Ok(None),
        }
    }

    fn ident_expr(
        &mut self,
        expr: &Expr,
        name: &str,
        obj: Option<ObjectRef>,
    ) -> Result<ExprResult> {
        let object = self.w.object(obj);
        let def = self.definition(obj)?;

        let access = match object {
            Some(o) if o.is_plain_var() && !o.is_declared_at(&self.w.file.path, expr.span.start()) => {
                let variable = match &o.decl {
                    Some(site) => self.w.ctx.positions().variable_at(self.w.session, site)?,
                    None => None,
                };
                Some(Classified {
                    kind: MemAccessKind::Ident,
                    inner: None,
                    chain: AccessChain::root(name, variable),
                })
            }
            _ => None,
        };

        let ty = expr.ty.or_else(|| object.and_then(|o| o.ty));
        self.write_expr(
            expr.span,
            ty,
            ExprKind::Ident,
            &ExprDetail::Ident { name, def },
            access,
        )
    }

    fn selector(&mut self, expr: &Expr, x: &Expr, sel: &Ident) -> Result<ExprResult> {
        let base = self.expr(x)?;
        self.ident(sel)?;

        let access = match self.w.object(sel.obj) {
            Some(member) if matches!(member.kind, ObjectKind::Var | ObjectKind::Field) => {
                let over_call = matches!(x.unparen().node, ExprNode::Call { .. });
                if let (Some(chain), false) = (&base.access, over_call) {
                    let step = Step::Select(self.w.unit.types.shape(x.ty));
                    self.classify(expr, &base, chain, step)
                } else if member.kind == ObjectKind::Var && self.is_package_name(x) {
                    let variable = match &member.decl {
                        Some(site) => self.w.ctx.positions().variable_at(self.w.session, site)?,
                        None => None,
                    };
                    Some(Classified {
                        kind: MemAccessKind::Ident,
                        inner: None,
                        chain: AccessChain::package_member(&sel.name, variable),
                    })
                } else {
                    None
                }
            }
            _ => None,
        };

        self.write_expr(
            expr.span,
            expr.ty,
            ExprKind::Selector,
            &ExprDetail::Selector {
                base: base.id,
                field: &sel.name,
            },
            access,
        )
    }

    fn is_package_name(&self, x: &Expr) -> bool {
        match &x.node {
            ExprNode::Ident { obj, .. } => self
                .w
                .object(*obj)
                .is_some_and(|o| o.kind == ObjectKind::PkgName),
            _ => false,
        }
    }

    fn func_lit(&mut self, expr: &Expr, ty: &FuncType, body: &Block) -> Result<ExprResult> {
        let at = expr.span.start();
        let function = self.w.function_at(at)?;
        match function {
            Some(id) => self.w.push(id),
            None => self.missing_function(None, at),
        }

        let children = self.func_lit_children(expr, ty, body);
        if function.is_some() {
            self.w.pop();
        }
        children?;
        self.plain(expr, ExprKind::FuncLit)
    }

    fn func_lit_children(&mut self, expr: &Expr, ty: &FuncType, body: &Block) -> Result<()> {
        self.func_type_children(ty)?;
        self.write_expr(ty.span, expr.ty, ExprKind::FuncType, &ExprDetail::None, None)?;
        self.block(body)?;
        Ok(())
    }

    /// Extend the operand's chain by `step`, if the operand is an access.
    fn extend(
        &mut self,
        expr: &Expr,
        kind: ExprKind,
        base: &ExprResult,
        step: Step,
        detail: &ExprDetail<'_>,
    ) -> Result<ExprResult> {
        let access = base
            .access
            .as_ref()
            .and_then(|chain| self.classify(expr, base, chain, step));
        self.write_expr(expr.span, expr.ty, kind, detail, access)
    }

    fn classify(
        &self,
        expr: &Expr,
        base: &ExprResult,
        chain: &AccessChain,
        step: Step,
    ) -> Option<Classified> {
        let (kind, chain) = chain.extend(step)?;
        if matches!(
            kind,
            MemAccessKind::UnknownFieldAccess
                | MemAccessKind::UnknownIndex
                | MemAccessKind::UnknownSlice
        ) {
            let at = expr.span.start();
            warn!(
                file = %self.w.file.path.display(),
                line = at.line,
                column = at.column,
                kind = %kind,
                "Operand type unresolved; depth is uncertain"
            );
        }
        Some(Classified {
            kind,
            inner: Some(base.id),
            chain,
        })
    }

    fn plain(&mut self, expr: &Expr, kind: ExprKind) -> Result<ExprResult> {
        self.write_expr(expr.span, expr.ty, kind, &ExprDetail::None, None)
    }

    /// Write an expression row with its detail and access.
    ///
    /// The type is interned before the expression's own transaction opens.
    fn write_expr(
        &mut self,
        span: Span,
        ty: Option<TypeRef>,
        kind: ExprKind,
        detail: &ExprDetail<'_>,
        access: Option<Classified>,
    ) -> Result<ExprResult> {
        let ty = self.w.type_id(ty)?;
        let row = ExprRow {
            kind,
            ty,
            file: self.w.file_id,
            span,
            context: self.w.context(),
        };
        let access_row = access.as_ref().map(|a| a.chain.row(a.kind, a.inner));
        let (id, _) = self
            .w
            .session
            .insert_expr(&row, detail, access_row.as_ref())?;
        Ok(ExprResult {
            id,
            access: access.map(|a| a.chain),
        })
    }
}
