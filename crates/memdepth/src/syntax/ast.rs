//! Syntax tree handed over by the front end.
//!
//! The tree mirrors Go's `go/ast` closely enough that an exporter can emit it
//! node for node, but every syntactic category is a closed enum so the two
//! traversals (definitions and depth) match exhaustively.
//!
//! Expressions carry their resolved static type (`ty`) and identifiers carry
//! the object they denote (`obj`). Both are `None` on the syntax-only path or
//! wherever the front end could not resolve them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::objects::ObjectRef;
use super::typetable::{ChanDir, TypeRef};
use crate::types::Span;

/// One source file of a parsed unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// The `package` clause name
    pub package: Ident,
    /// Top-level declarations in source order
    pub decls: Vec<Decl>,
}

/// A name together with its position and resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ident {
    /// The identifier text
    pub name: String,
    /// Extent of the identifier
    pub span: Span,
    /// Static type of the identifier, if resolved
    #[serde(default)]
    pub ty: Option<TypeRef>,
    /// Object the identifier defines or uses, if resolved
    #[serde(default)]
    pub obj: Option<ObjectRef>,
}

impl Ident {
    /// Whether this is the blank identifier `_`.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Top-level declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decl {
    /// Syntax error placeholder
    Bad(Span),
    /// Function or method declaration
    Func(FuncDecl),
    /// `import`, `const`, `type` or `var` declaration
    Gen(GenDecl),
}

/// Function or method declaration.
///
/// The signature type is the static type of `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDecl {
    /// Extent of the whole declaration
    pub span: Span,
    /// Receiver list for methods
    #[serde(default)]
    pub recv: Option<FieldList>,
    /// Function name
    pub name: Ident,
    /// Parameters, results and type parameters
    pub ty: FuncType,
    /// Body; `None` for external (assembly) functions
    #[serde(default)]
    pub body: Option<Block>,
}

/// Keyword of a general declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclToken {
    /// `import`
    Import,
    /// `const`
    Const,
    /// `type`
    Type,
    /// `var`
    Var,
}

/// `import`, `const`, `type` or `var` declaration with its specs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenDecl {
    /// Extent of the declaration
    pub span: Span,
    /// Declaration keyword
    pub tok: DeclToken,
    /// Specs in source order
    pub specs: Vec<Spec>,
}

/// One spec inside a general declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spec {
    /// `import name "path"`
    Import {
        /// Extent
        span: Span,
        /// Local name, if renamed
        #[serde(default)]
        name: Option<Ident>,
        /// Import path literal
        path: BasicLit,
    },
    /// `a, b T = x, y` in a `const` or `var` declaration
    Value {
        /// Extent
        span: Span,
        /// Declared names
        names: Vec<Ident>,
        /// Declared type expression
        #[serde(default)]
        ty: Option<Expr>,
        /// Initializers
        #[serde(default)]
        values: Vec<Expr>,
    },
    /// `type Name[P any] T`
    Type {
        /// Extent
        span: Span,
        /// Declared type name
        name: Ident,
        /// Type parameters
        #[serde(default)]
        type_params: Option<FieldList>,
        /// `true` for an alias (`type A = B`)
        #[serde(default)]
        alias: bool,
        /// Type expression
        ty: Expr,
    },
}

/// Parenthesized or braced list of fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldList {
    /// Extent, including delimiters
    pub span: Option<Span>,
    /// Fields in order
    pub fields: Vec<Field>,
}

/// A parameter, result, struct field or interface method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Extent
    pub span: Span,
    /// Names; empty for anonymous parameters and embedded fields
    #[serde(default)]
    pub names: Vec<Ident>,
    /// Type expression
    pub ty: Expr,
    /// Struct tag
    #[serde(default)]
    pub tag: Option<BasicLit>,
}

/// Function type: type parameters, parameters and results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncType {
    /// Extent
    pub span: Span,
    /// Type parameters
    #[serde(default)]
    pub type_params: Option<FieldList>,
    /// Parameters
    pub params: FieldList,
    /// Results
    #[serde(default)]
    pub results: Option<FieldList>,
}

/// Literal token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicLit {
    /// Extent
    pub span: Span,
    /// Literal category
    pub kind: LitKind,
    /// Source text, quotes included for strings
    pub value: String,
}

/// Literal category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LitKind {
    /// Integer literal
    Int,
    /// Floating-point literal
    Float,
    /// Imaginary literal
    Imag,
    /// Rune literal
    Char,
    /// String literal
    String,
}

// ============================================================================
// Statements
// ============================================================================

/// `{ ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Extent, braces included
    pub span: Span,
    /// Statements in order
    pub stmts: Vec<Stmt>,
}

/// Assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `+=`, `<<=`, ...
    Compound,
}

/// Branch keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchToken {
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `goto`
    Goto,
    /// `fallthrough`
    Fallthrough,
}

/// Statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// Syntax error placeholder
    Bad(Span),
    /// Local `const`/`type`/`var` declaration
    Decl {
        /// Extent
        span: Span,
        /// The declaration
        decl: GenDecl,
    },
    /// Empty statement
    Empty(Span),
    /// `label: stmt`
    Labeled {
        /// Extent
        span: Span,
        /// Label
        label: Ident,
        /// Labeled statement
        stmt: Box<Stmt>,
    },
    /// Expression statement
    Expr {
        /// Extent
        span: Span,
        /// The expression
        x: Expr,
    },
    /// `ch <- value`
    Send {
        /// Extent
        span: Span,
        /// Channel
        chan: Expr,
        /// Sent value
        value: Expr,
    },
    /// `x++` / `x--`
    IncDec {
        /// Extent
        span: Span,
        /// Operand
        x: Expr,
        /// `true` for `++`
        inc: bool,
    },
    /// Assignment or short variable declaration
    Assign {
        /// Extent
        span: Span,
        /// Left-hand operands
        lhs: Vec<Expr>,
        /// Operator
        op: AssignOp,
        /// Right-hand operands
        rhs: Vec<Expr>,
    },
    /// `go call`
    Go {
        /// Extent
        span: Span,
        /// Started call
        call: Expr,
    },
    /// `defer call`
    Defer {
        /// Extent
        span: Span,
        /// Deferred call
        call: Expr,
    },
    /// `return results`
    Return {
        /// Extent
        span: Span,
        /// Result expressions
        #[serde(default)]
        results: Vec<Expr>,
    },
    /// `break`, `continue`, `goto`, `fallthrough`
    Branch {
        /// Extent
        span: Span,
        /// Keyword
        tok: BranchToken,
        /// Target label
        #[serde(default)]
        label: Option<Ident>,
    },
    /// Nested block
    Block(Block),
    /// `if init; cond { body } else els`
    If {
        /// Extent
        span: Span,
        /// Init statement
        #[serde(default)]
        init: Option<Box<Stmt>>,
        /// Condition
        cond: Expr,
        /// Then branch
        body: Block,
        /// Else branch (a block or another `if`)
        #[serde(default)]
        els: Option<Box<Stmt>>,
    },
    /// `case list:` or `default:` inside a switch
    CaseClause {
        /// Extent
        span: Span,
        /// Case expressions (types in a type switch); empty for `default`
        #[serde(default)]
        list: Vec<Expr>,
        /// Clause body
        body: Vec<Stmt>,
    },
    /// `switch init; tag { ... }`
    Switch {
        /// Extent
        span: Span,
        /// Init statement
        #[serde(default)]
        init: Option<Box<Stmt>>,
        /// Tag expression
        #[serde(default)]
        tag: Option<Expr>,
        /// Case clauses
        body: Block,
    },
    /// `switch init; x := y.(type) { ... }`
    TypeSwitch {
        /// Extent
        span: Span,
        /// Init statement
        #[serde(default)]
        init: Option<Box<Stmt>>,
        /// `x := y.(type)` or `y.(type)`
        assign: Box<Stmt>,
        /// Case clauses
        body: Block,
    },
    /// `case comm:` or `default:` inside a select
    CommClause {
        /// Extent
        span: Span,
        /// Send or receive statement; `None` for `default`
        #[serde(default)]
        comm: Option<Box<Stmt>>,
        /// Clause body
        body: Vec<Stmt>,
    },
    /// `select { ... }`
    Select {
        /// Extent
        span: Span,
        /// Comm clauses
        body: Block,
    },
    /// `for init; cond; post { ... }`
    For {
        /// Extent
        span: Span,
        /// Init statement
        #[serde(default)]
        init: Option<Box<Stmt>>,
        /// Condition
        #[serde(default)]
        cond: Option<Expr>,
        /// Post statement
        #[serde(default)]
        post: Option<Box<Stmt>>,
        /// Loop body
        body: Block,
    },
    /// `for key, value := range x { ... }`
    Range {
        /// Extent
        span: Span,
        /// Key operand
        #[serde(default)]
        key: Option<Expr>,
        /// Value operand
        #[serde(default)]
        value: Option<Expr>,
        /// `true` for `:=`
        #[serde(default)]
        define: bool,
        /// Ranged-over expression
        x: Expr,
        /// Loop body
        body: Block,
    },
    /// A statement with no dedicated variant
    Other(Span),
}

impl Stmt {
    /// Extent of the statement.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Bad(span) | Self::Empty(span) | Self::Other(span) => *span,
            Self::Block(block) => block.span,
            Self::Decl { span, .. }
            | Self::Labeled { span, .. }
            | Self::Expr { span, .. }
            | Self::Send { span, .. }
            | Self::IncDec { span, .. }
            | Self::Assign { span, .. }
            | Self::Go { span, .. }
            | Self::Defer { span, .. }
            | Self::Return { span, .. }
            | Self::Branch { span, .. }
            | Self::If { span, .. }
            | Self::CaseClause { span, .. }
            | Self::Switch { span, .. }
            | Self::TypeSwitch { span, .. }
            | Self::CommClause { span, .. }
            | Self::Select { span, .. }
            | Self::For { span, .. }
            | Self::Range { span, .. } => *span,
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// `&x`
    Addr,
    /// `*x` when reported as a unary operator
    Deref,
    /// `-x`
    Neg,
    /// `+x`
    Pos,
    /// `!x`
    Not,
    /// `^x`
    Xor,
    /// `<-x`
    Recv,
    /// `~x` in constraints
    Tilde,
}

/// Expression with its extent and static type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    /// Extent
    pub span: Span,
    /// Static type, if resolved
    #[serde(default)]
    pub ty: Option<TypeRef>,
    /// The node itself
    pub node: ExprNode,
}

/// Expression node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprNode {
    /// Syntax error placeholder
    Bad,
    /// Identifier use or definition
    Ident {
        /// Identifier text
        name: String,
        /// Denoted object
        #[serde(default)]
        obj: Option<ObjectRef>,
    },
    /// `...elt`
    Ellipsis {
        /// Element type
        #[serde(default)]
        elt: Option<Box<Expr>>,
    },
    /// Literal
    BasicLit {
        /// Literal category
        kind: LitKind,
        /// Source text
        value: String,
    },
    /// `func(...) { ... }`
    FuncLit {
        /// Function type
        ty: FuncType,
        /// Body
        body: Block,
    },
    /// `T{elts}`
    CompositeLit {
        /// Literal type
        #[serde(default)]
        ty: Option<Box<Expr>>,
        /// Elements
        #[serde(default)]
        elts: Vec<Expr>,
    },
    /// `(x)`
    Paren {
        /// Inner expression
        x: Box<Expr>,
    },
    /// `x.sel`
    Selector {
        /// Operand
        x: Box<Expr>,
        /// Selected name
        sel: Ident,
    },
    /// `x[index]`
    Index {
        /// Operand
        x: Box<Expr>,
        /// Index
        index: Box<Expr>,
    },
    /// `x[A, B]`
    IndexList {
        /// Operand
        x: Box<Expr>,
        /// Indices
        indices: Vec<Expr>,
    },
    /// `x[low:high:max]`
    Slice {
        /// Operand
        x: Box<Expr>,
        /// Low bound
        #[serde(default)]
        low: Option<Box<Expr>>,
        /// High bound
        #[serde(default)]
        high: Option<Box<Expr>>,
        /// Capacity bound
        #[serde(default)]
        max: Option<Box<Expr>>,
    },
    /// `x.(T)`; `ty` is `None` for `x.(type)`
    TypeAssert {
        /// Operand
        x: Box<Expr>,
        /// Asserted type
        #[serde(default)]
        ty: Option<Box<Expr>>,
    },
    /// `fun(args...)`
    Call {
        /// Callee
        fun: Box<Expr>,
        /// Arguments
        #[serde(default)]
        args: Vec<Expr>,
        /// `true` when the last argument is spread with `...`
        #[serde(default)]
        ellipsis: bool,
    },
    /// `*x`, either a dereference or a pointer type
    Star {
        /// Operand
        x: Box<Expr>,
    },
    /// Unary operator application
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        x: Box<Expr>,
    },
    /// Binary operator application
    Binary {
        /// Operator token text
        op: String,
        /// Left operand
        x: Box<Expr>,
        /// Right operand
        y: Box<Expr>,
    },
    /// `key: value`
    KeyValue {
        /// Key
        key: Box<Expr>,
        /// Value
        value: Box<Expr>,
    },
    /// `[len]elt` or `[]elt`
    ArrayType {
        /// Length; `None` for slices
        #[serde(default)]
        len: Option<Box<Expr>>,
        /// Element type
        elt: Box<Expr>,
    },
    /// `struct { ... }`
    StructType {
        /// Fields
        fields: FieldList,
    },
    /// `func(...) ...`
    FuncType(FuncType),
    /// `interface { ... }`
    InterfaceType {
        /// Methods and embedded types
        methods: FieldList,
    },
    /// `map[key]value`
    MapType {
        /// Key type
        key: Box<Expr>,
        /// Value type
        value: Box<Expr>,
    },
    /// `chan value`
    ChanType {
        /// Direction
        dir: ChanDir,
        /// Element type
        value: Box<Expr>,
    },
}

impl Expr {
    /// The identifier name, if this expression is a bare identifier.
    #[must_use]
    pub fn ident_name(&self) -> Option<&str> {
        match &self.node {
            ExprNode::Ident { name, .. } => Some(name),
            _ => None,
        }
    }

    /// This expression with any enclosing parentheses removed.
    #[must_use]
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let ExprNode::Paren { x } = &expr.node {
            expr = x;
        }
        expr
    }
}
