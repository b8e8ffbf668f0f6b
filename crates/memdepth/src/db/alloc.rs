//! Allocation-site rows.
//!
//! These rows have no children, so re-running a directory just ignores
//! positions already present.

use rusqlite::params;

use super::Session;
use crate::error::Result;
use crate::types::{ContainerKind, FileId, Position};

/// A `make(T, ...)` call building a slice, map or channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeSite {
    /// Containing file
    pub file: FileId,
    /// Position of the call
    pub position: Position,
    /// What is built
    pub container: ContainerKind,
    /// Literal capacity, or -1
    pub capacity: i64,
}

/// A `make([]T, ...)` or `new(T)` call with its byte size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedAllocSite {
    /// Containing file
    pub file: FileId,
    /// Position of the call
    pub position: Position,
    /// `"make"` or `"new"`
    pub builtin: &'static str,
    /// Allocated type (element type for slices)
    pub type_name: String,
    /// Total bytes, or -1
    pub size: i64,
}

impl Session {
    /// Record a `make` site. Returns `false` if it was already recorded.
    pub fn insert_make_site(&mut self, site: &MakeSite) -> Result<bool> {
        self.write(|tx| {
            let changed = tx.execute(
                "INSERT OR IGNORE INTO make_sites (file_id, line, column, container, capacity)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    site.file.as_i64(),
                    site.position.line,
                    site.position.column,
                    site.container.as_str(),
                    site.capacity
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Record a sized allocation site. Returns `false` if it was already recorded.
    pub fn insert_sized_alloc_site(&mut self, site: &SizedAllocSite) -> Result<bool> {
        self.write(|tx| {
            let changed = tx.execute(
                "INSERT OR IGNORE INTO sized_alloc_sites (file_id, line, column, builtin, type_name, size)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    site.file.as_i64(),
                    site.position.line,
                    site.position.column,
                    site.builtin,
                    site.type_name,
                    site.size
                ],
            )?;
            Ok(changed > 0)
        })
    }
}
