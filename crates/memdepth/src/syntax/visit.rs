//! Pre-order traversal of the syntax tree.
//!
//! Implement [`Visitor`] and override the hooks of interest; each default
//! hook calls the matching `walk_*` function, which visits the node's
//! children in source order. An override that does not call `walk_*` stops
//! the descent at that node.

use super::ast::{
    Block, Decl, Expr, ExprNode, FieldList, FuncDecl, FuncType, GenDecl, SourceFile, Spec, Stmt,
};
use crate::error::Result;

/// Hooks called for each node kind during a walk.
pub trait Visitor {
    /// Called for every expression.
    fn visit_expr(&mut self, expr: &Expr) -> Result<()> {
        walk_expr(self, expr)
    }

    /// Called for every statement.
    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        walk_stmt(self, stmt)
    }

    /// Called for every function declaration.
    fn visit_func_decl(&mut self, decl: &FuncDecl) -> Result<()> {
        walk_func_decl(self, decl)
    }

    /// Called for every `import`/`const`/`type`/`var` declaration.
    fn visit_gen_decl(&mut self, decl: &GenDecl) -> Result<()> {
        walk_gen_decl(self, decl)
    }
}

/// Visit every declaration of a file.
pub fn walk_file<V: Visitor + ?Sized>(v: &mut V, file: &SourceFile) -> Result<()> {
    for decl in &file.decls {
        match decl {
            Decl::Bad(_) => {}
            Decl::Func(func) => v.visit_func_decl(func)?,
            Decl::Gen(gen_decl) => v.visit_gen_decl(gen_decl)?,
        }
    }
    Ok(())
}

/// Visit the receiver, signature and body of a function declaration.
pub fn walk_func_decl<V: Visitor + ?Sized>(v: &mut V, decl: &FuncDecl) -> Result<()> {
    if let Some(recv) = &decl.recv {
        walk_field_list(v, recv)?;
    }
    walk_func_type(v, &decl.ty)?;
    if let Some(body) = &decl.body {
        walk_block(v, body)?;
    }
    Ok(())
}

/// Visit the type and value expressions of each spec.
pub fn walk_gen_decl<V: Visitor + ?Sized>(v: &mut V, decl: &GenDecl) -> Result<()> {
    for spec in &decl.specs {
        match spec {
            Spec::Import { .. } => {}
            Spec::Value { ty, values, .. } => {
                if let Some(ty) = ty {
                    v.visit_expr(ty)?;
                }
                for value in values {
                    v.visit_expr(value)?;
                }
            }
            Spec::Type {
                type_params, ty, ..
            } => {
                if let Some(params) = type_params {
                    walk_field_list(v, params)?;
                }
                v.visit_expr(ty)?;
            }
        }
    }
    Ok(())
}

/// Visit type parameters, parameters and results.
pub fn walk_func_type<V: Visitor + ?Sized>(v: &mut V, ty: &FuncType) -> Result<()> {
    if let Some(params) = &ty.type_params {
        walk_field_list(v, params)?;
    }
    walk_field_list(v, &ty.params)?;
    if let Some(results) = &ty.results {
        walk_field_list(v, results)?;
    }
    Ok(())
}

/// Visit the type expression of each field.
pub fn walk_field_list<V: Visitor + ?Sized>(v: &mut V, list: &FieldList) -> Result<()> {
    for field in &list.fields {
        v.visit_expr(&field.ty)?;
    }
    Ok(())
}

/// Visit each statement of a block.
pub fn walk_block<V: Visitor + ?Sized>(v: &mut V, block: &Block) -> Result<()> {
    for stmt in &block.stmts {
        v.visit_stmt(stmt)?;
    }
    Ok(())
}

fn walk_opt_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: Option<&Stmt>) -> Result<()> {
    match stmt {
        Some(stmt) => v.visit_stmt(stmt),
        None => Ok(()),
    }
}

fn walk_opt_expr<V: Visitor + ?Sized>(v: &mut V, expr: Option<&Expr>) -> Result<()> {
    match expr {
        Some(expr) => v.visit_expr(expr),
        None => Ok(()),
    }
}

fn walk_exprs<V: Visitor + ?Sized>(v: &mut V, exprs: &[Expr]) -> Result<()> {
    for expr in exprs {
        v.visit_expr(expr)?;
    }
    Ok(())
}

/// Visit the children of a statement.
pub fn walk_stmt<V: Visitor + ?Sized>(v: &mut V, stmt: &Stmt) -> Result<()> {
    match stmt {
        Stmt::Bad(_) | Stmt::Empty(_) | Stmt::Branch { .. } | Stmt::Other(_) => Ok(()),
        Stmt::Decl { decl, .. } => v.visit_gen_decl(decl),
        Stmt::Labeled { stmt, .. } => v.visit_stmt(stmt),
        Stmt::Expr { x, .. } | Stmt::IncDec { x, .. } => v.visit_expr(x),
        Stmt::Send { chan, value, .. } => {
            v.visit_expr(chan)?;
            v.visit_expr(value)
        }
        Stmt::Assign { lhs, rhs, .. } => {
            walk_exprs(v, lhs)?;
            walk_exprs(v, rhs)
        }
        Stmt::Go { call, .. } | Stmt::Defer { call, .. } => v.visit_expr(call),
        Stmt::Return { results, .. } => walk_exprs(v, results),
        Stmt::Block(block) => walk_block(v, block),
        Stmt::If {
            init,
            cond,
            body,
            els,
            ..
        } => {
            walk_opt_stmt(v, init.as_deref())?;
            v.visit_expr(cond)?;
            walk_block(v, body)?;
            walk_opt_stmt(v, els.as_deref())
        }
        Stmt::CaseClause { list, body, .. } => {
            walk_exprs(v, list)?;
            for stmt in body {
                v.visit_stmt(stmt)?;
            }
            Ok(())
        }
        Stmt::Switch {
            init, tag, body, ..
        } => {
            walk_opt_stmt(v, init.as_deref())?;
            walk_opt_expr(v, tag.as_ref())?;
            walk_block(v, body)
        }
        Stmt::TypeSwitch {
            init, assign, body, ..
        } => {
            walk_opt_stmt(v, init.as_deref())?;
            v.visit_stmt(assign)?;
            walk_block(v, body)
        }
        Stmt::CommClause { comm, body, .. } => {
            walk_opt_stmt(v, comm.as_deref())?;
            for stmt in body {
                v.visit_stmt(stmt)?;
            }
            Ok(())
        }
        Stmt::Select { body, .. } => walk_block(v, body),
        Stmt::For {
            init,
            cond,
            post,
            body,
            ..
        } => {
            walk_opt_stmt(v, init.as_deref())?;
            walk_opt_expr(v, cond.as_ref())?;
            walk_opt_stmt(v, post.as_deref())?;
            walk_block(v, body)
        }
        Stmt::Range {
            key,
            value,
            x,
            body,
            ..
        } => {
            walk_opt_expr(v, key.as_ref())?;
            walk_opt_expr(v, value.as_ref())?;
            v.visit_expr(x)?;
            walk_block(v, body)
        }
    }
}

/// Visit the children of an expression.
pub fn walk_expr<V: Visitor + ?Sized>(v: &mut V, expr: &Expr) -> Result<()> {
    match &expr.node {
        ExprNode::Bad | ExprNode::Ident { .. } | ExprNode::BasicLit { .. } => Ok(()),
        ExprNode::Ellipsis { elt } => walk_opt_expr(v, elt.as_deref()),
        ExprNode::FuncLit { ty, body } => {
            walk_func_type(v, ty)?;
            walk_block(v, body)
        }
        ExprNode::CompositeLit { ty, elts } => {
            walk_opt_expr(v, ty.as_deref())?;
            walk_exprs(v, elts)
        }
        ExprNode::Paren { x }
        | ExprNode::Selector { x, .. }
        | ExprNode::Star { x }
        | ExprNode::Unary { x, .. } => v.visit_expr(x),
        ExprNode::Index { x, index } => {
            v.visit_expr(x)?;
            v.visit_expr(index)
        }
        ExprNode::IndexList { x, indices } => {
            v.visit_expr(x)?;
            walk_exprs(v, indices)
        }
        ExprNode::Slice { x, low, high, max } => {
            v.visit_expr(x)?;
            walk_opt_expr(v, low.as_deref())?;
            walk_opt_expr(v, high.as_deref())?;
            walk_opt_expr(v, max.as_deref())
        }
        ExprNode::TypeAssert { x, ty } => {
            v.visit_expr(x)?;
            walk_opt_expr(v, ty.as_deref())
        }
        ExprNode::Call { fun, args, .. } => {
            v.visit_expr(fun)?;
            walk_exprs(v, args)
        }
        ExprNode::Binary { x, y, .. } => {
            v.visit_expr(x)?;
            v.visit_expr(y)
        }
        ExprNode::KeyValue { key, value } => {
            v.visit_expr(key)?;
            v.visit_expr(value)
        }
        ExprNode::ArrayType { len, elt } => {
            walk_opt_expr(v, len.as_deref())?;
            v.visit_expr(elt)
        }
        ExprNode::StructType { fields } | ExprNode::InterfaceType { methods: fields } => {
            walk_field_list(v, fields)
        }
        ExprNode::FuncType(ty) => walk_func_type(v, ty),
        ExprNode::MapType { key, value } => {
            v.visit_expr(key)?;
            v.visit_expr(value)
        }
        ExprNode::ChanType { value, .. } => v.visit_expr(value),
    }
}
