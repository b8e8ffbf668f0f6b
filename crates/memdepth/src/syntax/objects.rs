//! Objects identifiers resolve to.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::typetable::TypeRef;
use crate::types::Position;

/// Index of an object in its unit's [`ObjectTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(pub u32);

/// What an identifier denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Variable, parameter or result
    Var,
    /// Struct field
    Field,
    /// Constant
    Const,
    /// Type name
    TypeName,
    /// Imported package name
    PkgName,
    /// Function or method
    Func,
    /// Statement label
    Label,
    /// Predeclared function (`make`, `new`, `len`, ...)
    Builtin,
    /// Predeclared `nil`
    Nil,
}

/// Where an object is declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclSite {
    /// Declaring file
    pub file: PathBuf,
    /// Position of the declaring identifier
    pub position: Position,
}

impl DeclSite {
    /// Whether this site is exactly `position` in `file`.
    #[must_use]
    pub fn is_at(&self, file: &Path, position: Position) -> bool {
        self.position == position && self.file == file
    }
}

/// A resolved object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    /// Object name
    pub name: String,
    /// Object category
    pub kind: ObjectKind,
    /// Declaration site; `None` for predeclared objects
    #[serde(default)]
    pub decl: Option<DeclSite>,
    /// Object type
    #[serde(default)]
    pub ty: Option<TypeRef>,
}

impl Object {
    /// A variable that is not a struct field.
    #[must_use]
    pub fn is_plain_var(&self) -> bool {
        self.kind == ObjectKind::Var
    }

    /// Whether this object is declared by the identifier at `position` in `file`.
    #[must_use]
    pub fn is_declared_at(&self, file: &Path, position: Position) -> bool {
        self.decl.as_ref().is_some_and(|d| d.is_at(file, position))
    }
}

/// Arena of objects for one unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectTable {
    objects: Vec<Object>,
}

impl ObjectTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and return its reference.
    pub fn push(&mut self, object: Object) -> ObjectRef {
        let index = u32::try_from(self.objects.len()).unwrap_or(u32::MAX);
        self.objects.push(object);
        ObjectRef(index)
    }

    /// Look up an object. Dangling or absent references resolve to `None`.
    #[must_use]
    pub fn get(&self, r: Option<ObjectRef>) -> Option<&Object> {
        self.objects.get(r?.0 as usize)
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop every object.
    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
