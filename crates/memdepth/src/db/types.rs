//! Type rows.
//!
//! Called by the type interner inside its own transaction. The parent row is
//! always inserted (reserved) before any child row that refers to other types.

use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::ordinal;
use crate::syntax::ChanDir;
use crate::types::{SignatureRole, TypeId, TypeKind};

/// Look up a type row by canonical name.
pub(crate) fn find(conn: &Connection, name: &str) -> rusqlite::Result<Option<TypeId>> {
    conn.query_row("SELECT id FROM types WHERE name = ?1", [name], |row| {
        row.get::<_, i64>(0).map(TypeId::from)
    })
    .optional()
}

/// Insert the parent row of a type and return its id.
pub(crate) fn reserve(
    conn: &Connection,
    kind: TypeKind,
    name: &str,
    length: Option<i64>,
) -> rusqlite::Result<TypeId> {
    conn.execute(
        "INSERT INTO types (kind, name, length) VALUES (?1, ?2, ?3)",
        params![kind.as_str(), name, length],
    )?;
    Ok(TypeId::from(conn.last_insert_rowid()))
}

pub(crate) fn insert_int(conn: &Connection, id: TypeId, signed: bool) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO type_ints (type_id, signed) VALUES (?1, ?2)",
        params![id.as_i64(), signed],
    )?;
    Ok(())
}

pub(crate) fn insert_array(
    conn: &Connection,
    id: TypeId,
    base: TypeId,
    size: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO type_arrays (type_id, base_id, size) VALUES (?1, ?2, ?3)",
        params![id.as_i64(), base.as_i64(), size],
    )?;
    Ok(())
}

/// Element type of a pointer or slice.
pub(crate) fn insert_elem(conn: &Connection, id: TypeId, base: TypeId) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO type_elems (type_id, base_id) VALUES (?1, ?2)",
        params![id.as_i64(), base.as_i64()],
    )?;
    Ok(())
}

pub(crate) fn insert_map(
    conn: &Connection,
    id: TypeId,
    key: TypeId,
    value: TypeId,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO type_maps (type_id, key_id, value_id) VALUES (?1, ?2, ?3)",
        params![id.as_i64(), key.as_i64(), value.as_i64()],
    )?;
    Ok(())
}

pub(crate) fn insert_chan(
    conn: &Connection,
    id: TypeId,
    dir: ChanDir,
    base: TypeId,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO type_chans (type_id, direction, base_id) VALUES (?1, ?2, ?3)",
        params![id.as_i64(), dir.as_str(), base.as_i64()],
    )?;
    Ok(())
}

/// A struct field, interface method or interface embedding.
pub(crate) fn insert_member(
    conn: &Connection,
    id: TypeId,
    position: usize,
    embedded: bool,
    name: Option<&str>,
    member: TypeId,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO type_members (type_id, position, embedded, name, member_type_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id.as_i64(), ordinal(position), embedded, name, member.as_i64()],
    )?;
    Ok(())
}

pub(crate) fn insert_named(
    conn: &Connection,
    id: TypeId,
    package: Option<&str>,
    name: &str,
    underlying: TypeId,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO type_named (type_id, package, name, underlying_id) VALUES (?1, ?2, ?3, ?4)",
        params![id.as_i64(), package, name, underlying.as_i64()],
    )?;
    Ok(())
}

pub(crate) fn insert_func(
    conn: &Connection,
    id: TypeId,
    is_variadic: bool,
    is_generic: bool,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO type_funcs (type_id, is_variadic, is_generic) VALUES (?1, ?2, ?3)",
        params![id.as_i64(), is_variadic, is_generic],
    )?;
    Ok(())
}

pub(crate) fn insert_func_sig(
    conn: &Connection,
    id: TypeId,
    role: SignatureRole,
    position: usize,
    member: TypeId,
    name: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO type_func_sigs (type_id, role, position, member_type_id, name)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id.as_i64(), role.as_str(), ordinal(position), member.as_i64(), name],
    )?;
    Ok(())
}

pub(crate) fn insert_union_term(
    conn: &Connection,
    id: TypeId,
    position: usize,
    term: TypeId,
    tilde: bool,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO type_unions (type_id, position, term_type_id, tilde) VALUES (?1, ?2, ?3, ?4)",
        params![id.as_i64(), ordinal(position), term.as_i64(), tilde],
    )?;
    Ok(())
}
