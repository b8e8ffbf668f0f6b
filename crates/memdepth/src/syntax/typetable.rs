//! Resolved types, stored in an arena.
//!
//! The front end hands over every type it resolved as an entry in a
//! [`TypeTable`] and refers to it by [`TypeRef`]. Indices rather than owned
//! trees let a named type's underlying structure point back at the named type
//! itself (`type Node struct { next *Node }`).
//!
//! Each entry carries its canonical name (the form `go/types` prints), which is
//! the interning key.

use serde::{Deserialize, Serialize};

use crate::types::TypeKind;

/// Index of a type in its unit's [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(pub u32);

/// Channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChanDir {
    /// `chan T`
    #[default]
    Both,
    /// `chan<- T`
    Send,
    /// `<-chan T`
    Recv,
}

impl ChanDir {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Send => "send",
            Self::Recv => "recv",
        }
    }
}

/// Predeclared basic types, typed and untyped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

/// How a basic type is encoded: category, byte width, integer signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicLayout {
    /// Stored kind
    pub kind: TypeKind,
    /// Byte width; `None` for untyped constants
    pub width: Option<i64>,
    /// `Some` only for typed integers
    pub signed: Option<bool>,
}

impl BasicKind {
    /// Category, width and signedness of this basic type.
    ///
    /// Untyped constant kinds collapse to their category with no width.
    #[must_use]
    pub fn layout(self) -> BasicLayout {
        let (kind, width, signed) = match self {
            Self::Invalid => (TypeKind::Invalid, None, None),
            Self::Bool => (TypeKind::Bool, Some(1), None),
            Self::Int | Self::Int64 => (TypeKind::Int, Some(8), Some(true)),
            Self::Int8 => (TypeKind::Int, Some(1), Some(true)),
            Self::Int16 => (TypeKind::Int, Some(2), Some(true)),
            Self::Int32 => (TypeKind::Int, Some(4), Some(true)),
            Self::Uint | Self::Uint64 | Self::Uintptr => (TypeKind::Int, Some(8), Some(false)),
            Self::Uint8 => (TypeKind::Int, Some(1), Some(false)),
            Self::Uint16 => (TypeKind::Int, Some(2), Some(false)),
            Self::Uint32 => (TypeKind::Int, Some(4), Some(false)),
            Self::Float32 => (TypeKind::Float, Some(4), None),
            Self::Float64 => (TypeKind::Float, Some(8), None),
            Self::Complex64 => (TypeKind::Complex, Some(8), None),
            Self::Complex128 => (TypeKind::Complex, Some(16), None),
            Self::String => (TypeKind::String, Some(16), None),
            Self::UnsafePointer => (TypeKind::Address, Some(8), None),
            Self::UntypedBool => (TypeKind::Bool, None, None),
            Self::UntypedInt | Self::UntypedRune => (TypeKind::Int, None, None),
            Self::UntypedFloat => (TypeKind::Float, None, None),
            Self::UntypedComplex => (TypeKind::Complex, None, None),
            Self::UntypedString => (TypeKind::String, None, None),
            Self::UntypedNil => (TypeKind::Nil, None, None),
        };
        BasicLayout {
            kind,
            width,
            signed,
        }
    }
}

/// A struct field or interface method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeField {
    /// Field or method name
    pub name: String,
    /// Field type or method signature
    pub ty: TypeRef,
    /// Embedded field
    #[serde(default)]
    pub embedded: bool,
}

/// A receiver, parameter, result or type parameter of a signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureParam {
    /// Declared name, if any
    #[serde(default)]
    pub name: Option<String>,
    /// Declared type (the constraint, for type parameters)
    pub ty: TypeRef,
}

/// A function signature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signature {
    /// Method receiver
    #[serde(default)]
    pub recv: Option<SignatureParam>,
    /// Parameters
    #[serde(default)]
    pub params: Vec<SignatureParam>,
    /// Results
    #[serde(default)]
    pub results: Vec<SignatureParam>,
    /// Type parameters
    #[serde(default)]
    pub type_params: Vec<SignatureParam>,
    /// Last parameter is `...T`
    #[serde(default)]
    pub variadic: bool,
}

impl Signature {
    /// Whether the signature declares type parameters.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

/// A union term, `T` or `~T`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnionTerm {
    /// Term type
    pub ty: TypeRef,
    /// `~T` also matches types whose underlying type is `T`
    #[serde(default)]
    pub tilde: bool,
}

/// Structure of a resolved type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeData {
    /// Predeclared type
    Basic {
        /// Which one
        basic: BasicKind,
    },
    /// `[len]elem`
    Array {
        /// Length
        len: i64,
        /// Element type
        elem: TypeRef,
    },
    /// `[]elem`
    Slice {
        /// Element type
        elem: TypeRef,
    },
    /// `*elem`
    Pointer {
        /// Pointee type
        elem: TypeRef,
    },
    /// `map[key]value`
    Map {
        /// Key type
        key: TypeRef,
        /// Value type
        value: TypeRef,
    },
    /// `chan elem`
    Chan {
        /// Direction
        #[serde(default)]
        dir: ChanDir,
        /// Element type
        elem: TypeRef,
    },
    /// `struct { ... }`
    Struct {
        /// Fields in declaration order
        #[serde(default)]
        fields: Vec<TypeField>,
    },
    /// `interface { ... }`
    Interface {
        /// Explicit methods
        #[serde(default)]
        methods: Vec<TypeField>,
        /// Embedded types
        #[serde(default)]
        embedded: Vec<TypeRef>,
    },
    /// Defined type
    Named {
        /// Declaring package path; `None` for predeclared `error` and `comparable`
        #[serde(default)]
        package: Option<String>,
        /// Local name
        name: String,
        /// Underlying type
        underlying: TypeRef,
    },
    /// Function signature
    Signature(Signature),
    /// Generic type parameter
    TypeParam {
        /// Parameter name
        name: String,
    },
    /// Multiple results
    Tuple {
        /// Element types
        #[serde(default)]
        elems: Vec<TypeRef>,
    },
    /// Constraint union
    Union {
        /// Terms
        terms: Vec<UnionTerm>,
    },
}

impl TypeData {
    /// Stored kind of this type.
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        match self {
            Self::Basic { basic } => basic.layout().kind,
            Self::Array { .. } => TypeKind::Array,
            Self::Slice { .. } => TypeKind::Slice,
            Self::Pointer { .. } => TypeKind::Pointer,
            Self::Map { .. } => TypeKind::Map,
            Self::Chan { .. } => TypeKind::Channel,
            Self::Struct { .. } => TypeKind::Struct,
            Self::Interface { .. } => TypeKind::Interface,
            Self::Named { .. } => TypeKind::Named,
            Self::Signature(_) => TypeKind::Function,
            Self::TypeParam { .. } => TypeKind::TypeParam,
            Self::Tuple { .. } => TypeKind::Tuple,
            Self::Union { .. } => TypeKind::Union,
        }
    }
}

/// One resolved type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeEntry {
    /// Canonical name, the interning key
    pub name: String,
    /// Size in bytes on the target platform, when the front end computed it
    #[serde(default)]
    pub size: Option<i64>,
    /// Structure
    pub data: TypeData,
}

/// What the depth analyzer needs to know about an operand's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Underlying type is a struct
    Struct,
    /// Underlying type is a pointer
    Pointer,
    /// Underlying type is a slice
    Slice,
    /// Underlying type is a fixed-size array
    Array,
    /// Underlying type is a map
    Map,
    /// Anything else
    Other,
}

/// Arena of resolved types for one unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTable {
    entries: Vec<TypeEntry>,
}

impl TypeTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type and return its reference.
    pub fn push(&mut self, name: impl Into<String>, data: TypeData) -> TypeRef {
        self.push_entry(TypeEntry {
            name: name.into(),
            size: None,
            data,
        })
    }

    /// Add a fully described entry and return its reference.
    pub fn push_entry(&mut self, entry: TypeEntry) -> TypeRef {
        let index = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        self.entries.push(entry);
        TypeRef(index)
    }

    /// Reserve a reference for a type whose structure is not known yet.
    ///
    /// Used to build self-referential types: reserve the named type, build
    /// its underlying structure using the reservation, then [`define`](Self::define) it.
    pub fn reserve(&mut self, name: impl Into<String>) -> TypeRef {
        self.push(
            name,
            TypeData::Basic {
                basic: BasicKind::Invalid,
            },
        )
    }

    /// Fill in the structure of a reserved type.
    pub fn define(&mut self, r: TypeRef, data: TypeData) {
        if let Some(entry) = self.entries.get_mut(r.0 as usize) {
            entry.data = data;
        }
    }

    /// Record the byte size of a type.
    pub fn set_size(&mut self, r: TypeRef, size: i64) {
        if let Some(entry) = self.entries.get_mut(r.0 as usize) {
            entry.size = Some(size);
        }
    }

    /// Look up an entry. Dangling references resolve to `None`.
    #[must_use]
    pub fn get(&self, r: TypeRef) -> Option<&TypeEntry> {
        self.entries.get(r.0 as usize)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Canonical name of a type.
    #[must_use]
    pub fn name(&self, r: TypeRef) -> Option<&str> {
        self.get(r).map(|e| e.name.as_str())
    }

    /// Byte size of a type, when known.
    #[must_use]
    pub fn size_of(&self, r: TypeRef) -> Option<i64> {
        self.get(r).and_then(|e| e.size)
    }

    /// Structure of the underlying type, following named types.
    ///
    /// Returns `None` for dangling references and for chains of named types
    /// that never reach a structural type.
    #[must_use]
    pub fn underlying(&self, r: TypeRef) -> Option<&TypeData> {
        let mut current = self.get(r)?;
        for _ in 0..=self.entries.len() {
            match &current.data {
                TypeData::Named { underlying, .. } => current = self.get(*underlying)?,
                data => return Some(data),
            }
        }
        None
    }

    /// Classify the underlying type of an operand.
    ///
    /// Returns `None` when the operand has no resolved type.
    #[must_use]
    pub fn shape(&self, r: Option<TypeRef>) -> Option<Shape> {
        let data = self.underlying(r?)?;
        Some(match data {
            TypeData::Struct { .. } => Shape::Struct,
            TypeData::Pointer { .. } => Shape::Pointer,
            TypeData::Slice { .. } => Shape::Slice,
            TypeData::Array { .. } => Shape::Array,
            TypeData::Map { .. } => Shape::Map,
            _ => Shape::Other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn int(table: &mut TypeTable) -> TypeRef {
        table.push(
            "int",
            TypeData::Basic {
                basic: BasicKind::Int,
            },
        )
    }

    #[rstest]
    #[case(BasicKind::Int8, TypeKind::Int, Some(1), Some(true))]
    #[case(BasicKind::Int, TypeKind::Int, Some(8), Some(true))]
    #[case(BasicKind::Uint16, TypeKind::Int, Some(2), Some(false))]
    #[case(BasicKind::Uintptr, TypeKind::Int, Some(8), Some(false))]
    #[case(BasicKind::Float32, TypeKind::Float, Some(4), None)]
    #[case(BasicKind::Complex128, TypeKind::Complex, Some(16), None)]
    #[case(BasicKind::String, TypeKind::String, Some(16), None)]
    #[case(BasicKind::UnsafePointer, TypeKind::Address, Some(8), None)]
    #[case(BasicKind::UntypedInt, TypeKind::Int, None, None)]
    #[case(BasicKind::UntypedFloat, TypeKind::Float, None, None)]
    #[case(BasicKind::UntypedNil, TypeKind::Nil, None, None)]
    fn basic_layouts(
        #[case] basic: BasicKind,
        #[case] kind: TypeKind,
        #[case] width: Option<i64>,
        #[case] signed: Option<bool>,
    ) {
        let layout = basic.layout();
        assert_eq!(layout.kind, kind);
        assert_eq!(layout.width, width);
        assert_eq!(layout.signed, signed);
    }

    #[test]
    fn shape_follows_named_types() {
        let mut table = TypeTable::new();
        let i = int(&mut table);
        let strukt = table.push(
            "struct{f int}",
            TypeData::Struct {
                fields: vec![TypeField {
                    name: "f".into(),
                    ty: i,
                    embedded: false,
                }],
            },
        );
        let named = table.push(
            "main.S",
            TypeData::Named {
                package: Some("main".into()),
                name: "S".into(),
                underlying: strukt,
            },
        );
        let ptr = table.push("*main.S", TypeData::Pointer { elem: named });

        assert_eq!(table.shape(Some(named)), Some(Shape::Struct));
        assert_eq!(table.shape(Some(ptr)), Some(Shape::Pointer));
        assert_eq!(table.shape(Some(i)), Some(Shape::Other));
        assert_eq!(table.shape(None), None);
    }

    #[test]
    fn dangling_reference_has_no_shape() {
        let table = TypeTable::new();
        assert_eq!(table.shape(Some(TypeRef(7))), None);
    }

    #[test]
    fn named_cycle_without_structure_terminates() {
        let mut table = TypeTable::new();
        let a = table.reserve("main.A");
        let b = table.push(
            "main.B",
            TypeData::Named {
                package: Some("main".into()),
                name: "B".into(),
                underlying: a,
            },
        );
        table.define(
            a,
            TypeData::Named {
                package: Some("main".into()),
                name: "A".into(),
                underlying: b,
            },
        );

        assert!(table.underlying(a).is_none());
    }
}
