//! Shared builders for memdepth integration tests.
//!
//! [`UnitBuilder`] assembles a one-file, one-function unit the way a front
//! end would export it: every node gets its own span, declared names get an
//! object whose declaration site is that span, and operand types are set
//! explicitly so each test controls what the analyzer sees.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use memdepth::syntax::{
    AssignOp, BasicKind, Block, Decl, DeclSite, DeclToken, Expr, ExprNode, FieldList, FuncDecl,
    FuncType, GenDecl, Ident, LitKind, Object, ObjectKind, ObjectRef, ParsedUnit, Signature,
    SourceFile, Spec, Stmt, TypeData, TypeField, TypeRef, UnaryOp,
};
use memdepth::{
    AnalysisContext, AnalysisMode, Config, MemoryAccessRecord, Span, UnitError, VariableId,
    analyze_unit,
};
use tempfile::TempDir;

/// A throwaway corpus root and database.
pub struct TestEnv {
    pub dir: TempDir,
    pub config: Config,
    pub ctx: AnalysisContext,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let root = dir.path().join("corpus");
        fs::create_dir_all(&root).expect("should create corpus root");

        let mut config = Config::new(root);
        config.database = Some(dir.path().join("state").join("memdepth.db"));
        config.log_dir = Some(dir.path().join("state"));
        let ctx = AnalysisContext::from_config(&config).expect("should open context");
        Self { dir, config, ctx }
    }

    pub fn root(&self) -> &Path {
        &self.config.corpus_root
    }

    /// Run `mode` over `unit` with a fresh session.
    pub fn analyze(&self, unit: &ParsedUnit, mode: AnalysisMode) -> Vec<UnitError> {
        let mut session = self.ctx.database().session().expect("should open session");
        analyze_unit(&self.ctx, &mut session, unit, mode).expect("analysis should succeed")
    }

    /// Every memory access recorded for `file`, in source order.
    pub fn accesses(&self, file: &Path) -> Vec<MemoryAccessRecord> {
        self.ctx
            .database()
            .memory_accesses(Some(file))
            .expect("should query memory accesses")
    }

    /// Row id of the variable declared at `site`.
    pub fn variable(&self, site: &DeclSite) -> Option<VariableId> {
        let session = self.ctx.database().session().expect("should open session");
        self.ctx
            .positions()
            .variable_at(&session, site)
            .expect("should look up variable")
    }
}

/// The access recorded at exactly `span`, if any.
pub fn access_at(records: &[MemoryAccessRecord], span: Span) -> Option<&MemoryAccessRecord> {
    records.iter().find(|r| r.span == span)
}

/// A declared variable.
#[derive(Debug, Clone)]
pub struct Var {
    pub name: String,
    pub obj: ObjectRef,
    pub ty: Option<TypeRef>,
    pub site: DeclSite,
}

/// Builds `package <pkg>; func f() { <stmts> }` in `<dir>/main.go`.
pub struct UnitBuilder {
    pub path: PathBuf,
    pub unit: ParsedUnit,
    line: u32,
    stmts: Vec<Stmt>,
}

impl UnitBuilder {
    pub fn new(dir: &Path, package: &str) -> Self {
        Self {
            path: dir.join("main.go"),
            unit: ParsedUnit::new(dir, package),
            line: 1,
            stmts: Vec::new(),
        }
    }

    /// A span no other node of this file uses.
    pub fn span(&mut self) -> Span {
        self.line += 1;
        Span::new(self.line, 2, self.line, 40).expect("valid span")
    }

    // === Types ===

    pub fn ty(&mut self, name: &str, data: TypeData) -> TypeRef {
        self.unit.types.push(name, data)
    }

    pub fn int(&mut self) -> TypeRef {
        self.ty(
            "int",
            TypeData::Basic {
                basic: BasicKind::Int,
            },
        )
    }

    pub fn pointer(&mut self, elem: TypeRef) -> TypeRef {
        let name = format!("*{}", self.type_name(elem));
        self.ty(&name, TypeData::Pointer { elem })
    }

    pub fn slice(&mut self, elem: TypeRef) -> TypeRef {
        let name = format!("[]{}", self.type_name(elem));
        self.ty(&name, TypeData::Slice { elem })
    }

    pub fn array(&mut self, len: i64, elem: TypeRef) -> TypeRef {
        let name = format!("[{len}]{}", self.type_name(elem));
        self.ty(&name, TypeData::Array { len, elem })
    }

    pub fn map(&mut self, key: TypeRef, value: TypeRef) -> TypeRef {
        let name = format!("map[{}]{}", self.type_name(key), self.type_name(value));
        self.ty(&name, TypeData::Map { key, value })
    }

    /// `type <name> struct { <fields> }` in this unit's package.
    pub fn named_struct(&mut self, name: &str, fields: &[(&str, TypeRef)]) -> TypeRef {
        let qualified = format!("{}.{name}", self.unit.package);
        let named = self.unit.types.reserve(&qualified);
        let fields: Vec<TypeField> = fields
            .iter()
            .map(|(n, ty)| TypeField {
                name: (*n).to_string(),
                ty: *ty,
                embedded: false,
            })
            .collect();
        let underlying_name = format!(
            "struct{{{}}}",
            fields
                .iter()
                .map(|f| format!("{} {}", f.name, self.type_name(f.ty)))
                .collect::<Vec<_>>()
                .join("; ")
        );
        let underlying = self.ty(&underlying_name, TypeData::Struct { fields });
        self.unit.types.define(
            named,
            TypeData::Named {
                package: Some(self.unit.package.clone()),
                name: name.to_string(),
                underlying,
            },
        );
        named
    }

    fn type_name(&self, r: TypeRef) -> String {
        self.unit.types.name(r).unwrap_or("?").to_string()
    }

    // === Objects ===

    pub fn object(
        &mut self,
        name: &str,
        kind: ObjectKind,
        ty: Option<TypeRef>,
        decl: Option<DeclSite>,
    ) -> ObjectRef {
        self.unit.objects.push(Object {
            name: name.to_string(),
            kind,
            decl,
            ty,
        })
    }

    /// A struct field object, declared somewhere in this file.
    pub fn field(&mut self, name: &str, ty: Option<TypeRef>) -> ObjectRef {
        let site = DeclSite {
            file: self.path.clone(),
            position: self.span().start(),
        };
        self.object(name, ObjectKind::Field, ty, Some(site))
    }

    fn declare(&mut self, name: &str, ty: Option<TypeRef>) -> (Ident, Var) {
        let span = self.span();
        let site = DeclSite {
            file: self.path.clone(),
            position: span.start(),
        };
        let obj = self.object(name, ObjectKind::Var, ty, Some(site.clone()));
        let ident = Ident {
            name: name.to_string(),
            span,
            ty,
            obj: Some(obj),
        };
        let var = Var {
            name: name.to_string(),
            obj,
            ty,
            site,
        };
        (ident, var)
    }

    // === Statements ===

    /// `var <name> <ty>`
    pub fn var(&mut self, name: &str, ty: Option<TypeRef>) -> Var {
        let (ident, var) = self.declare(name, ty);
        let span = self.span();
        self.stmts.push(Stmt::Decl {
            span,
            decl: GenDecl {
                span,
                tok: DeclToken::Var,
                specs: vec![Spec::Value {
                    span,
                    names: vec![ident],
                    ty: None,
                    values: Vec::new(),
                }],
            },
        });
        var
    }

    /// `<name> := <value>`
    pub fn define(&mut self, name: &str, value: Expr) -> Var {
        let (ident, var) = self.declare(name, value.ty);
        let lhs = Expr {
            span: ident.span,
            ty: ident.ty,
            node: ExprNode::Ident {
                name: ident.name,
                obj: ident.obj,
            },
        };
        let span = self.span();
        self.stmts.push(Stmt::Assign {
            span,
            lhs: vec![lhs],
            op: AssignOp::Define,
            rhs: vec![value],
        });
        var
    }

    /// `<x>` as a statement.
    pub fn expr_stmt(&mut self, x: Expr) {
        let span = self.span();
        self.stmts.push(Stmt::Expr { span, x });
    }

    // === Expressions ===

    pub fn expr(&mut self, node: ExprNode, ty: Option<TypeRef>) -> Expr {
        Expr {
            span: self.span(),
            ty,
            node,
        }
    }

    /// A use of `var`.
    pub fn use_var(&mut self, var: &Var) -> Expr {
        self.expr(
            ExprNode::Ident {
                name: var.name.clone(),
                obj: Some(var.obj),
            },
            var.ty,
        )
    }

    pub fn int_lit(&mut self, value: &str) -> Expr {
        self.expr(
            ExprNode::BasicLit {
                kind: LitKind::Int,
                value: value.to_string(),
            },
            None,
        )
    }

    pub fn star(&mut self, x: Expr, ty: Option<TypeRef>) -> Expr {
        self.expr(ExprNode::Star { x: Box::new(x) }, ty)
    }

    pub fn addr(&mut self, x: Expr, ty: Option<TypeRef>) -> Expr {
        self.expr(
            ExprNode::Unary {
                op: UnaryOp::Addr,
                x: Box::new(x),
            },
            ty,
        )
    }

    pub fn paren(&mut self, x: Expr) -> Expr {
        let ty = x.ty;
        self.expr(ExprNode::Paren { x: Box::new(x) }, ty)
    }

    /// `<x>.<name>` selecting the field object `field`.
    pub fn select(&mut self, x: Expr, name: &str, field: ObjectRef, ty: Option<TypeRef>) -> Expr {
        let sel = Ident {
            name: name.to_string(),
            span: self.span(),
            ty,
            obj: Some(field),
        };
        self.expr(
            ExprNode::Selector {
                x: Box::new(x),
                sel,
            },
            ty,
        )
    }

    pub fn index(&mut self, x: Expr, ty: Option<TypeRef>) -> Expr {
        let index = self.int_lit("0");
        self.expr(
            ExprNode::Index {
                x: Box::new(x),
                index: Box::new(index),
            },
            ty,
        )
    }

    pub fn slice_of(&mut self, x: Expr, ty: Option<TypeRef>) -> Expr {
        let low = self.int_lit("1");
        let high = self.int_lit("3");
        self.expr(
            ExprNode::Slice {
                x: Box::new(x),
                low: Some(Box::new(low)),
                high: Some(Box::new(high)),
                max: None,
            },
            ty,
        )
    }

    /// `<name>()`, calling a function object with no declaration site.
    pub fn call(&mut self, name: &str, ty: Option<TypeRef>) -> Expr {
        let obj = self.object(name, ObjectKind::Func, None, None);
        let fun = self.expr(
            ExprNode::Ident {
                name: name.to_string(),
                obj: Some(obj),
            },
            None,
        );
        self.expr(
            ExprNode::Call {
                fun: Box::new(fun),
                args: Vec::new(),
                ellipsis: false,
            },
            ty,
        )
    }

    /// `<pkg>.<member>` naming a package-level variable declared at `decl`.
    pub fn package_var(
        &mut self,
        pkg: &str,
        member: &str,
        ty: Option<TypeRef>,
        decl: DeclSite,
    ) -> Expr {
        let pkg_obj = self.object(pkg, ObjectKind::PkgName, None, None);
        let member_obj = self.object(member, ObjectKind::Var, ty, Some(decl));
        let x = self.expr(
            ExprNode::Ident {
                name: pkg.to_string(),
                obj: Some(pkg_obj),
            },
            None,
        );
        let sel = Ident {
            name: member.to_string(),
            span: self.span(),
            ty,
            obj: Some(member_obj),
        };
        self.expr(
            ExprNode::Selector {
                x: Box::new(x),
                sel,
            },
            ty,
        )
    }

    /// Wrap the statements in `func f()` and return the unit.
    pub fn finish(mut self) -> ParsedUnit {
        let signature = self.ty("func()", TypeData::Signature(Signature::default()));
        let func_obj_site = self.span();
        let func_obj = self.object(
            "f",
            ObjectKind::Func,
            Some(signature),
            Some(DeclSite {
                file: self.path.clone(),
                position: func_obj_site.start(),
            }),
        );
        let body_span = self.span();
        let ty_span = self.span();
        let package_span = self.span();
        let decl = FuncDecl {
            span: body_span,
            recv: None,
            name: Ident {
                name: "f".to_string(),
                span: func_obj_site,
                ty: Some(signature),
                obj: Some(func_obj),
            },
            ty: FuncType {
                span: ty_span,
                type_params: None,
                params: FieldList::default(),
                results: None,
            },
            body: Some(Block {
                span: body_span,
                stmts: std::mem::take(&mut self.stmts),
            }),
        };
        let package = self.unit.package.clone();
        self.unit.files.push(SourceFile {
            path: self.path.clone(),
            package: Ident {
                name: package,
                span: package_span,
                ty: None,
                obj: None,
            },
            decls: vec![Decl::Func(decl)],
        });
        self.unit
    }
}
