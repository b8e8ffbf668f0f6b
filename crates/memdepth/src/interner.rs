//! Type interning.
//!
//! [`TypeInterner::type_id`] turns a resolved type into one row of the
//! `types` table (plus its kind-specific children), keyed by canonical name.
//! The same name always yields the same id, across files, units and workers.
//!
//! ## Concurrency
//!
//! The name cache is shared by every analyze worker. A hit holds the cache
//! lock just long enough to refresh the name's recency, so frequently used
//! names stay cached. A miss takes the interner's miss lock for the whole
//! query-or-insert-then-publish sequence, so two workers in this process never
//! race to create the same row. Writers in other processes can still race;
//! a unique violation is resolved by re-querying the name.
//!
//! ## Cycles
//!
//! Every composite type reserves its own row before interning its children,
//! and the reservation is visible to the rest of the walk immediately. A named
//! type whose structure refers back to itself finds its own reservation
//! instead of recursing forever.
//!
//! Ids created during a walk are published to the shared cache only after the
//! transaction commits, so other workers never see an id that could still be
//! rolled back.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{debug, trace};

use crate::db::{types as rows, Session};
use crate::error::{Error, Result};
use crate::syntax::{TypeData, TypeRef, TypeTable};
use crate::types::{SignatureRole, TypeId, TypeKind};

/// Default number of names kept in the cache.
pub const DEFAULT_TYPE_CACHE_CAPACITY: usize = 65_536;

/// Shared name-to-id cache in front of the `types` table.
pub struct TypeInterner {
    cache: Mutex<LruCache<String, TypeId>>,
    miss: Mutex<()>,
}

impl std::fmt::Debug for TypeInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInterner")
            .field("cached", &self.cache.lock().len())
            .finish_non_exhaustive()
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_TYPE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl TypeInterner {
    /// Create an interner whose cache holds at most `capacity` names.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            miss: Mutex::new(()),
        }
    }

    /// Cached id for a canonical name, marking it most recently used.
    #[must_use]
    pub fn cached(&self, name: &str) -> Option<TypeId> {
        self.cache.lock().get(name).copied()
    }

    /// Number of cached names.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Row id for a resolved type, interning it on first sight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NilType`] when `ty` is `None` or does not resolve in
    /// `table`, and storage errors when the insert fails.
    pub fn type_id(
        &self,
        session: &mut Session,
        table: &TypeTable,
        ty: Option<TypeRef>,
    ) -> Result<TypeId> {
        let r = ty.ok_or(Error::NilType)?;
        let name = table.name(r).ok_or(Error::NilType)?;

        if let Some(id) = self.cached(name) {
            return Ok(id);
        }

        let _guard = self.miss.lock();
        if let Some(id) = self.cached(name) {
            return Ok(id);
        }

        let mut pending = HashMap::new();
        let result = session.write(|tx| {
            Walk {
                conn: tx,
                table,
                interner: self,
                pending: &mut pending,
            }
            .intern(r)
        });

        match result {
            Ok(id) => {
                self.publish(pending);
                Ok(id)
            }
            Err(e) if e.is_unique_violation() => {
                debug!(name, "Type interned concurrently, re-querying");
                let id = rows::find(session.connection(), name)?.ok_or_else(|| {
                    Error::Internal(format!("type {name} vanished after unique violation"))
                })?;
                self.cache.lock().put(name.to_string(), id);
                Ok(id)
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`type_id`](Self::type_id), but a missing type is `None`.
    pub fn optional_type_id(
        &self,
        session: &mut Session,
        table: &TypeTable,
        ty: Option<TypeRef>,
    ) -> Result<Option<TypeId>> {
        match self.type_id(session, table, ty) {
            Ok(id) => Ok(Some(id)),
            Err(e) if e.is_nil_type() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn publish(&self, pending: HashMap<String, TypeId>) {
        let mut cache = self.cache.lock();
        for (name, id) in pending {
            cache.put(name, id);
        }
    }
}

/// One interning walk, inside one transaction.
struct Walk<'a> {
    conn: &'a Connection,
    table: &'a TypeTable,
    interner: &'a TypeInterner,
    /// Ids found or created by this walk, not yet published
    pending: &'a mut HashMap<String, TypeId>,
}

impl Walk<'_> {
    fn intern(&mut self, r: TypeRef) -> Result<TypeId> {
        let table = self.table;
        let entry = table.get(r).ok_or(Error::NilType)?;
        let name = entry.name.as_str();

        if let Some(id) = self.pending.get(name) {
            return Ok(*id);
        }
        if let Some(id) = self.interner.cached(name) {
            return Ok(id);
        }
        if let Some(id) = rows::find(self.conn, name)? {
            self.pending.insert(name.to_string(), id);
            return Ok(id);
        }

        trace!(name, kind = %entry.data.kind(), "Interning type");
        match &entry.data {
            TypeData::Basic { basic } => {
                let layout = basic.layout();
                let id = self.reserve(layout.kind, name, layout.width)?;
                if let Some(signed) = layout.signed {
                    rows::insert_int(self.conn, id, signed)?;
                }
                Ok(id)
            }
            TypeData::Array { len, elem } => {
                let id = self.reserve(TypeKind::Array, name, Some(*len))?;
                let base = self.intern(*elem)?;
                rows::insert_array(self.conn, id, base, *len)?;
                Ok(id)
            }
            TypeData::Slice { elem } | TypeData::Pointer { elem } => {
                let id = self.reserve(entry.data.kind(), name, None)?;
                let base = self.intern(*elem)?;
                rows::insert_elem(self.conn, id, base)?;
                Ok(id)
            }
            TypeData::Map { key, value } => {
                let id = self.reserve(TypeKind::Map, name, None)?;
                let key = self.intern(*key)?;
                let value = self.intern(*value)?;
                rows::insert_map(self.conn, id, key, value)?;
                Ok(id)
            }
            TypeData::Chan { dir, elem } => {
                let id = self.reserve(TypeKind::Channel, name, None)?;
                let base = self.intern(*elem)?;
                rows::insert_chan(self.conn, id, *dir, base)?;
                Ok(id)
            }
            TypeData::Struct { fields } => {
                let id = self.reserve(TypeKind::Struct, name, None)?;
                for (i, field) in fields.iter().enumerate() {
                    let member = self.intern(field.ty)?;
                    rows::insert_member(
                        self.conn,
                        id,
                        i,
                        field.embedded,
                        Some(&field.name),
                        member,
                    )?;
                }
                Ok(id)
            }
            TypeData::Interface { methods, embedded } => {
                let id = self.reserve(TypeKind::Interface, name, None)?;
                for (i, method) in methods.iter().enumerate() {
                    let member = self.intern(method.ty)?;
                    rows::insert_member(self.conn, id, i, false, Some(&method.name), member)?;
                }
                for (i, embed) in embedded.iter().enumerate() {
                    let member = self.intern(*embed)?;
                    rows::insert_member(self.conn, id, methods.len() + i, true, None, member)?;
                }
                Ok(id)
            }
            TypeData::Named {
                package,
                name: local,
                underlying,
            } => {
                let id = self.reserve(TypeKind::Named, name, None)?;
                let under = self.intern(*underlying)?;
                rows::insert_named(self.conn, id, package.as_deref(), local, under)?;
                Ok(id)
            }
            TypeData::Signature(sig) => {
                let id = self.reserve(TypeKind::Function, name, None)?;
                rows::insert_func(self.conn, id, sig.variadic, sig.is_generic())?;
                let groups = [
                    (SignatureRole::Receiver, sig.recv.as_slice()),
                    (SignatureRole::Param, sig.params.as_slice()),
                    (SignatureRole::Result, sig.results.as_slice()),
                    (SignatureRole::TypeParam, sig.type_params.as_slice()),
                ];
                for (role, params) in groups {
                    for (i, param) in params.iter().enumerate() {
                        let member = self.intern(param.ty)?;
                        rows::insert_func_sig(
                            self.conn,
                            id,
                            role,
                            i,
                            member,
                            param.name.as_deref(),
                        )?;
                    }
                }
                Ok(id)
            }
            TypeData::TypeParam { .. } | TypeData::Tuple { .. } => {
                self.reserve(entry.data.kind(), name, None)
            }
            TypeData::Union { terms } => {
                let id = self.reserve(TypeKind::Union, name, None)?;
                for (i, term) in terms.iter().enumerate() {
                    let member = self.intern(term.ty)?;
                    rows::insert_union_term(self.conn, id, i, member, term.tilde)?;
                }
                Ok(id)
            }
        }
    }

    /// Insert the parent row and make it visible to the rest of the walk.
    fn reserve(&mut self, kind: TypeKind, name: &str, length: Option<i64>) -> Result<TypeId> {
        let id = rows::reserve(self.conn, kind, name, length)?;
        self.pending.insert(name.to_string(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::syntax::{BasicKind, TypeField};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let db = Database::open(&dir.path().join("types.db")).expect("should open");
        (dir, db)
    }

    fn basic(table: &mut TypeTable, name: &str, basic: BasicKind) -> TypeRef {
        table.push(name, TypeData::Basic { basic })
    }

    #[test]
    fn same_name_same_id_across_tables() {
        let (_dir, db) = setup();
        let mut session = db.session().expect("session");
        let interner = TypeInterner::default();

        let mut first = TypeTable::new();
        let a = basic(&mut first, "int", BasicKind::Int);
        let mut second = TypeTable::new();
        let _pad = basic(&mut second, "string", BasicKind::String);
        let b = basic(&mut second, "int", BasicKind::Int);

        let id_a = interner.type_id(&mut session, &first, Some(a)).expect("intern");
        let id_b = interner.type_id(&mut session, &second, Some(b)).expect("intern");

        assert_eq!(id_a, id_b);
    }

    #[test]
    fn recently_used_names_outlive_older_ones() {
        let (_dir, db) = setup();
        let mut session = db.session().expect("session");
        let interner = TypeInterner::new(NonZeroUsize::new(2).expect("non-zero"));
        let mut table = TypeTable::new();
        let int = basic(&mut table, "int", BasicKind::Int);
        let string = basic(&mut table, "string", BasicKind::String);
        let boolean = basic(&mut table, "bool", BasicKind::Bool);

        let int_id = interner.type_id(&mut session, &table, Some(int)).expect("intern");
        interner.type_id(&mut session, &table, Some(string)).expect("intern");
        assert_eq!(
            interner.type_id(&mut session, &table, Some(int)).expect("hit"),
            int_id
        );
        interner.type_id(&mut session, &table, Some(boolean)).expect("intern");

        assert_eq!(interner.cached("int"), Some(int_id));
        assert_eq!(interner.cached("string"), None);
        assert_eq!(interner.cached_len(), 2);
    }

    #[test]
    fn database_lookup_survives_fresh_cache() {
        let (_dir, db) = setup();
        let mut session = db.session().expect("session");
        let mut table = TypeTable::new();
        let i = basic(&mut table, "int64", BasicKind::Int64);

        let first = TypeInterner::default()
            .type_id(&mut session, &table, Some(i))
            .expect("intern");
        let second = TypeInterner::default()
            .type_id(&mut session, &table, Some(i))
            .expect("intern");

        assert_eq!(first, second);
    }

    #[test]
    fn missing_type_is_nil_type() {
        let (_dir, db) = setup();
        let mut session = db.session().expect("session");
        let interner = TypeInterner::default();
        let table = TypeTable::new();

        let err = interner
            .type_id(&mut session, &table, None)
            .expect_err("no type");
        assert!(err.is_nil_type());

        let dangling = interner
            .optional_type_id(&mut session, &table, Some(TypeRef(3)))
            .expect("dangling is not a failure");
        assert_eq!(dangling, None);
    }

    #[test]
    fn dangling_child_rolls_back_parent() {
        let (_dir, db) = setup();
        let mut session = db.session().expect("session");
        let interner = TypeInterner::default();
        let mut table = TypeTable::new();
        let bad = table.push("[]ghost", TypeData::Slice { elem: TypeRef(99) });

        let id = interner
            .optional_type_id(&mut session, &table, Some(bad))
            .expect("nil type is recoverable");

        assert_eq!(id, None);
        assert!(db.type_by_name("[]ghost").expect("query").is_none());
        assert!(interner.cached("[]ghost").is_none());
    }

    #[test]
    fn struct_members_are_ordered() {
        let (_dir, db) = setup();
        let mut session = db.session().expect("session");
        let interner = TypeInterner::default();
        let mut table = TypeTable::new();
        let i = basic(&mut table, "int", BasicKind::Int);
        let s = basic(&mut table, "string", BasicKind::String);
        let strukt = table.push(
            "struct{a int; b string}",
            TypeData::Struct {
                fields: vec![
                    TypeField {
                        name: "a".into(),
                        ty: i,
                        embedded: false,
                    },
                    TypeField {
                        name: "b".into(),
                        ty: s,
                        embedded: false,
                    },
                ],
            },
        );

        let id = interner
            .type_id(&mut session, &table, Some(strukt))
            .expect("intern");

        let names: Vec<String> = session
            .connection()
            .prepare("SELECT name FROM type_members WHERE type_id = ?1 ORDER BY position")
            .expect("prepare")
            .query_map([id.as_i64()], |row| row.get(0))
            .expect("query")
            .collect::<std::result::Result<_, _>>()
            .expect("collect");
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        assert!(interner.cached("int").is_some(), "children are published too");
    }
}
