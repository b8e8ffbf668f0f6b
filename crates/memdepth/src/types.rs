//! Domain types for memdepth.
//!
//! These types represent the relational model the analyzer writes:
//! - **Row ids**: one newtype per table so ids cannot be swapped by accident
//! - **Positions**: `Position` and `Span`, the natural keys of positional rows
//! - **Kinds**: the closed vocabularies stored in `kind` columns
//! - **Results**: `RunStats`, `SchemaStats`, `MemoryAccessRecord` (query results)
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Kinds | Enum stored as text | Readable rows; unknown values surface on read |
//! | Depth | Signed | Address-of removes a level and can go below zero |
//! | Sentinel | Reserved row id 1 | Absent references in non-null columns |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::UnitError;
use crate::frontend::LoadMode;

// ============================================================================
// Strongly-typed ID wrappers
// ============================================================================

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub i64);

        impl $name {
            /// Extract the raw i64 value.
            #[must_use]
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

row_id!(
    /// Row id in the `files` table.
    FileId
);
row_id!(
    /// Row id in the `types` table.
    TypeId
);
row_id!(
    /// Row id in the `functions` table.
    FunctionId
);
row_id!(
    /// Row id in the `variables` table.
    VariableId
);
row_id!(
    /// Row id in the `statements` table.
    StmtId
);
row_id!(
    /// Row id in the `expressions` table.
    ExprId
);

/// Row id reserved in `files` and `variables` for "unknown".
///
/// Stored where a column forbids null but the reference is genuinely absent,
/// e.g. the root variable of a call result.
pub const UNKNOWN_ID: i64 = 1;

impl VariableId {
    /// The reserved "unknown variable" row.
    pub const UNKNOWN: Self = Self(UNKNOWN_ID);
}

// ============================================================================
// Positions
// ============================================================================

/// A line/column position in a source file.
///
/// Positions are 1-indexed (first line is 1, first column is 1) to match
/// editor and compiler conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Line (1-indexed)
    pub line: u32,
    /// Column (1-indexed)
    pub column: u32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A source/end position span in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Starting line (1-indexed)
    pub start_line: u32,
    /// Starting column (1-indexed)
    pub start_column: u32,
    /// Ending line (1-indexed, inclusive)
    pub end_line: u32,
    /// Ending column (1-indexed, exclusive)
    pub end_column: u32,
}

impl Span {
    /// Create a new span with validation.
    ///
    /// Returns `None` if the end position is before the start position.
    #[must_use]
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Option<Self> {
        if end_line < start_line || (end_line == start_line && end_column < start_column) {
            return None;
        }
        Some(Self {
            start_line,
            start_column,
            end_line,
            end_column,
        })
    }

    /// The starting position.
    #[must_use]
    pub fn start(&self) -> Position {
        Position::new(self.start_line, self.start_column)
    }

    /// The ending position.
    #[must_use]
    pub fn end(&self) -> Position {
        Position::new(self.end_line, self.end_column)
    }
}

// ============================================================================
// Kinds
// ============================================================================

macro_rules! text_kind {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Convert to database string representation.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }

            /// Parse the database string representation.
            ///
            /// Returns `None` for strings written by a different schema version.
            #[must_use]
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $( $text => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_kind! {
    /// Structural category of an interned type.
    pub enum TypeKind {
        /// A type the front end could not check
        Invalid => "invalid",
        /// `bool`
        Bool => "bool",
        /// Signed and unsigned integers
        Int => "int",
        /// `float32`, `float64`
        Float => "float",
        /// `complex64`, `complex128`
        Complex => "complex",
        /// Fixed-size array
        Array => "array",
        /// Pointer
        Pointer => "pointer",
        /// `unsafe.Pointer`
        Address => "address",
        /// Slice
        Slice => "slice",
        /// `string`
        String => "string",
        /// Function signature
        Function => "function",
        /// Struct
        Struct => "struct",
        /// Interface
        Interface => "interface",
        /// Map
        Map => "map",
        /// Channel
        Channel => "channel",
        /// Named (defined) type
        Named => "named",
        /// Untyped nil
        Nil => "nil",
        /// Generic type parameter
        TypeParam => "type_param",
        /// Multi-value result tuple
        Tuple => "tuple",
        /// Constraint union
        Union => "union",
    }
}

text_kind! {
    /// Syntactic category of an expression row.
    pub enum ExprKind {
        /// Syntax error placeholder
        Bad => "bad",
        /// Identifier
        Ident => "ident",
        /// `...T` in parameter lists and array literals
        Ellipsis => "ellipsis",
        /// Basic literal
        BasicLit => "basic_lit",
        /// Function literal
        FuncLit => "func_lit",
        /// Composite literal
        CompositeLit => "composite_lit",
        /// Parenthesized expression
        Paren => "paren",
        /// `x.sel`
        Selector => "selector",
        /// `x[i]`
        Index => "index",
        /// `x[A, B]` generic instantiation
        IndexList => "index_list",
        /// `x[lo:hi:max]`
        Slice => "slice",
        /// `x.(T)`
        TypeAssert => "type_assert",
        /// Call
        Call => "call",
        /// `*x`
        Star => "star",
        /// Unary operator
        Unary => "unary",
        /// Binary operator
        Binary => "binary",
        /// `key: value` in composite literals
        KeyValue => "key_value",
        /// `[N]T` / `[]T`
        ArrayType => "array_type",
        /// `struct { ... }`
        StructType => "struct_type",
        /// `func(...) ...`
        FuncType => "func_type",
        /// `interface { ... }`
        InterfaceType => "interface_type",
        /// `map[K]V`
        MapType => "map_type",
        /// `chan T`
        ChanType => "chan_type",
    }
}

text_kind! {
    /// Syntactic category of a statement row.
    pub enum StmtKind {
        /// Anything the front end reports that has no dedicated kind
        Other => "other",
        /// Syntax error placeholder
        Bad => "bad",
        /// Local `var`/`const`/`type` declaration
        Decl => "decl",
        /// Empty statement
        Empty => "empty",
        /// `label: stmt`
        Labeled => "labeled",
        /// Expression statement
        Expr => "expr",
        /// `ch <- v`
        Send => "send",
        /// `x++` / `x--`
        IncDec => "inc_dec",
        /// Assignment or short variable declaration
        Assign => "assign",
        /// `go f()`
        Go => "go",
        /// `defer f()`
        Defer => "defer",
        /// `return ...`
        Return => "return",
        /// `break`/`continue`/`goto`/`fallthrough`
        Branch => "branch",
        /// `{ ... }`
        Block => "block",
        /// `if`
        If => "if",
        /// `case` / `default` in a switch
        CaseClause => "case_clause",
        /// Expression switch
        Switch => "switch",
        /// Type switch
        TypeSwitch => "type_switch",
        /// `case` / `default` in a select
        CommClause => "comm_clause",
        /// `select`
        Select => "select",
        /// `for`
        For => "for",
        /// `for ... range`
        Range => "range",
    }
}

text_kind! {
    /// Classification of an expression that denotes a memory access.
    pub enum MemAccessKind {
        /// A variable used by name
        Ident => "ident",
        /// `*a`
        Deref => "deref",
        /// `&a`
        Ref => "ref",
        /// `s.f` through a struct value
        FieldAccess => "field_access",
        /// `p.f` through a pointer
        IndirectFieldAccess => "indirect_field_access",
        /// `sl[i]`
        SliceIndex => "slice_index",
        /// `arr[i]`
        ArrayIndex => "array_index",
        /// `m[k]`
        MapIndex => "map_index",
        /// `(a)`
        Paren => "paren",
        /// `a.f` where the base type is unknown
        UnknownFieldAccess => "unknown_field_access",
        /// `a[i]` where the base type is unknown
        UnknownIndex => "unknown_index",
        /// `sl[i:j]`
        SliceOfSlice => "slice_of_slice",
        /// `arr[i:j]`
        SliceOfArray => "slice_of_array",
        /// `a[i:j]` where the base type is unknown
        UnknownSlice => "unknown_slice",
        /// A call result
        FunctionCall => "function_call",
        /// Reserved for accesses no other kind describes
        Other => "other",
    }
}

text_kind! {
    /// Role of a signature entry on a function or function type.
    pub enum SignatureRole {
        /// Method receiver
        Receiver => "receiver",
        /// Parameter
        Param => "param",
        /// Result
        Result => "result",
        /// Generic type parameter
        TypeParam => "type_param",
    }
}

text_kind! {
    /// Container built by a `make` call.
    pub enum ContainerKind {
        /// `make([]T, ...)`
        Slice => "slice",
        /// `make(map[K]V, ...)`
        Map => "map",
        /// `make(chan T, ...)`
        Chan => "chan",
    }
}

/// How a local variable is bound by its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VariableRole {
    /// Declared in the body (`var`, `:=`, `range`)
    #[default]
    Local,
    /// Function parameter
    Param,
    /// Named result
    Result,
    /// Method receiver
    Receiver,
}

// ============================================================================
// Modes
// ============================================================================

text_kind! {
    /// Which passes a run executes.
    pub enum AnalysisMode {
        /// Function and variable definitions
        Defs => "defs",
        /// Statements, expressions and memory-access depth
        Depth => "depth",
        /// Definitions over the whole corpus, then depth
        All => "all",
        /// Container allocation sites, syntax only
        Make => "make",
        /// `make` slice and `new` sites with byte sizes
        AllocSizes => "alloc-sizes",
    }
}

impl AnalysisMode {
    /// What the front end must provide for this mode.
    #[must_use]
    pub fn load_mode(self) -> LoadMode {
        match self {
            Self::Make => LoadMode::SyntaxOnly,
            Self::Defs | Self::Depth | Self::All | Self::AllocSizes => LoadMode::Resolved,
        }
    }

    /// File name of this mode's completed-directory log.
    ///
    /// Each mode resumes independently, so each has its own log.
    #[must_use]
    pub fn log_file_name(self) -> String {
        format!("memdepth-{}.log", self.as_str())
    }

    /// Corpus-wide passes a pipeline run executes, in order.
    ///
    /// `All` finishes every definition before the first depth row, so a
    /// package member resolves to its variable whichever directory is
    /// analyzed first. Each phase keeps its own completed log, which
    /// `defs` and `depth` runs share.
    #[must_use]
    pub fn phases(self) -> &'static [AnalysisMode] {
        match self {
            Self::Defs => &[Self::Defs],
            Self::Depth => &[Self::Depth],
            Self::All => &[Self::Defs, Self::Depth],
            Self::Make => &[Self::Make],
            Self::AllocSizes => &[Self::AllocSizes],
        }
    }

    /// Whether this mode writes functions and variables.
    #[must_use]
    pub fn records_definitions(self) -> bool {
        matches!(self, Self::Defs | Self::All)
    }

    /// Whether this mode writes statements, expressions and memory accesses.
    #[must_use]
    pub fn records_depth(self) -> bool {
        matches!(self, Self::Depth | Self::All)
    }
}

// ============================================================================
// Operation Results
// ============================================================================

/// Statistics from a pipeline run.
///
/// Returned by `Pipeline::run()`.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Directories discovered under the corpus root
    pub directories_total: usize,
    /// Directories skipped because the completed log already lists them
    pub directories_skipped_done: usize,
    /// Directories fully written and appended to the completed log
    pub directories_completed: usize,
    /// Parsed units analyzed
    pub units_analyzed: usize,
    /// Directory-level errors (non-fatal)
    pub errors: Vec<UnitError>,
    /// How long the run took
    pub duration: Duration,
}

/// Row counts per table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaStats {
    /// Files, excluding the sentinel
    pub files: usize,
    /// Interned types
    pub types: usize,
    /// Functions and function literals
    pub functions: usize,
    /// Variables, excluding the sentinel
    pub variables: usize,
    /// Statements
    pub statements: usize,
    /// Expressions
    pub expressions: usize,
    /// Memory accesses
    pub memory_accesses: usize,
    /// `make` sites
    pub make_sites: usize,
    /// `make` slice and `new` sites with sizes
    pub sized_alloc_sites: usize,
}

/// A memory-access row joined with its expression position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAccessRecord {
    /// Expression row
    pub expr_id: ExprId,
    /// File containing the expression
    pub file: PathBuf,
    /// Expression extent
    pub span: Span,
    /// Access classification
    pub kind: MemAccessKind,
    /// Signed indirection depth relative to the base variable
    pub depth: i64,
    /// Indirection levels that could not be classified
    pub uncertainty: i64,
    /// Root identifier name, when there is one
    pub base_name: Option<String>,
    /// Root variable row; `None` exactly when `uncertainty > 0`
    pub base_variable: Option<VariableId>,
    /// The child expression's memory-access row
    pub inner: Option<ExprId>,
}
