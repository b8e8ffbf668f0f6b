//! Memory-access depth rules.
//!
//! An [`AccessChain`] is the state carried up the expression tree: how many
//! indirections separate the current expression from its root variable,
//! how many could not be classified, and which variable that root is.
//!
//! | Expression | Kind | Depth | Uncertainty |
//! |---|---|---|---|
//! | `a` (variable use) | ident | 0 | 0 |
//! | `pkg.V` | ident | 1 | 0 |
//! | `f(...)` | function_call | 0 | 0 |
//! | `*a` | deref | +1 | |
//! | `&a` | ref | -1 | |
//! | `(a)` | paren | | |
//! | `s.f`, struct | field_access | | |
//! | `p.f`, pointer | indirect_field_access | +1 | |
//! | `a.f`, unknown | unknown_field_access | | +1 |
//! | `sl[i]` | slice_index | +1 | |
//! | `arr[i]` | array_index | | |
//! | `m[k]` | map_index | +1 | |
//! | `a[i]`, unknown | unknown_index | | +1 |
//! | `sl[i:j]` | slice_of_slice | | |
//! | `arr[i:j]` | slice_of_array | -1 | |
//! | `a[i:j]`, unknown | unknown_slice | | +1 |
//!
//! Selections and indexing on any other underlying type (strings, interface
//! method values, pointers to arrays) are not memory accesses.

use crate::db::MemAccessRow;
use crate::syntax::Shape;
use crate::types::{ExprId, MemAccessKind, VariableId};

/// Depth state of a memory-access expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessChain {
    /// Signed indirection depth relative to the root
    pub depth: i64,
    /// Indirection levels that could not be classified
    pub uncertainty: i64,
    /// Root identifier name; `None` for call results
    pub base_name: Option<String>,
    /// Root variable row, when it was recorded
    pub base_variable: Option<VariableId>,
}

/// One step from an operand's access to the enclosing expression's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `*a`
    Deref,
    /// `&a`
    Ref,
    /// `(a)`
    Paren,
    /// `a.f`, given the shape of `a`
    Select(Option<Shape>),
    /// `a[i]`, given the shape of `a`
    Index(Option<Shape>),
    /// `a[i:j]`, given the shape of `a`
    Slice(Option<Shape>),
}

impl AccessChain {
    /// A variable used by name.
    #[must_use]
    pub fn root(name: impl Into<String>, variable: Option<VariableId>) -> Self {
        Self {
            depth: 0,
            uncertainty: 0,
            base_name: Some(name.into()),
            base_variable: variable,
        }
    }

    /// A package-level variable of another package, `pkg.V`.
    #[must_use]
    pub fn package_member(name: impl Into<String>, variable: Option<VariableId>) -> Self {
        Self {
            depth: 1,
            ..Self::root(name, variable)
        }
    }

    /// The result of a call: a fresh value with no root variable.
    #[must_use]
    pub fn call() -> Self {
        Self {
            depth: 0,
            uncertainty: 0,
            base_name: None,
            base_variable: None,
        }
    }

    /// Apply one step, or `None` when the result is not a memory access.
    #[must_use]
    pub fn extend(&self, step: Step) -> Option<(MemAccessKind, Self)> {
        let (kind, depth, uncertainty) = match step {
            Step::Deref => (MemAccessKind::Deref, 1, 0),
            Step::Ref => (MemAccessKind::Ref, -1, 0),
            Step::Paren => (MemAccessKind::Paren, 0, 0),
            Step::Select(shape) => match shape {
                Some(Shape::Struct) => (MemAccessKind::FieldAccess, 0, 0),
                Some(Shape::Pointer) => (MemAccessKind::IndirectFieldAccess, 1, 0),
                None => (MemAccessKind::UnknownFieldAccess, 0, 1),
                Some(_) => return None,
            },
            Step::Index(shape) => match shape {
                Some(Shape::Slice) => (MemAccessKind::SliceIndex, 1, 0),
                Some(Shape::Array) => (MemAccessKind::ArrayIndex, 0, 0),
                Some(Shape::Map) => (MemAccessKind::MapIndex, 1, 0),
                None => (MemAccessKind::UnknownIndex, 0, 1),
                Some(_) => return None,
            },
            Step::Slice(shape) => match shape {
                Some(Shape::Slice) => (MemAccessKind::SliceOfSlice, 0, 0),
                Some(Shape::Array) => (MemAccessKind::SliceOfArray, -1, 0),
                None => (MemAccessKind::UnknownSlice, 0, 1),
                Some(_) => return None,
            },
        };
        Some((
            kind,
            Self {
                depth: self.depth + depth,
                uncertainty: self.uncertainty + uncertainty,
                base_name: self.base_name.clone(),
                base_variable: self.base_variable,
            },
        ))
    }

    /// Storage row for this state.
    #[must_use]
    pub fn row(&self, kind: MemAccessKind, inner: Option<ExprId>) -> MemAccessRow<'_> {
        MemAccessRow {
            kind,
            inner,
            base_name: self.base_name.as_deref(),
            base_variable: self.base_variable,
            depth: self.depth,
            uncertainty: self.uncertainty,
        }
    }
}
