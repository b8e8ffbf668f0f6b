//! The front-end data model.
//!
//! Everything here is produced by a [`FrontEnd`](crate::frontend::FrontEnd)
//! and consumed read-only by the analyzer.

pub mod ast;
pub mod objects;
pub mod typetable;
pub mod unit;
pub mod visit;

pub use ast::{
    AssignOp, BasicLit, Block, BranchToken, Decl, DeclToken, Expr, ExprNode, Field, FieldList,
    FuncDecl, FuncType, GenDecl, Ident, LitKind, SourceFile, Spec, Stmt, UnaryOp,
};
pub use objects::{DeclSite, Object, ObjectKind, ObjectRef, ObjectTable};
pub use typetable::{
    BasicKind, BasicLayout, ChanDir, Shape, Signature, SignatureParam, TypeData, TypeEntry,
    TypeField, TypeRef, TypeTable, UnionTerm,
};
pub use unit::{Diagnostic, ParsedUnit};
pub use visit::Visitor;
