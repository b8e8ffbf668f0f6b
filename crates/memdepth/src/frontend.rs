//! Front-end boundary.
//!
//! Parsing and type-checking Go is not done here. A [`FrontEnd`] turns a
//! source directory into [`ParsedUnit`]s, and the analyzer only consumes them.
//!
//! [`JsonFrontEnd`] reads units that an external exporter has already written
//! next to the sources, one JSON file per directory.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::syntax::ParsedUnit;

/// Default name of the per-directory export read by [`JsonFrontEnd`].
pub const DEFAULT_UNIT_FILE: &str = "memdepth-units.json";

/// What a front end must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Syntax plus types, objects and signatures
    Resolved,
    /// Syntax only; used when only structural constructs are needed
    SyntaxOnly,
}

/// Source of parsed units.
///
/// Implementations must be shareable across parse workers.
pub trait FrontEnd: Send + Sync {
    /// Load every package in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be parsed or resolved. The
    /// scheduler logs it and skips the directory.
    fn load(&self, dir: &Path, mode: LoadMode) -> Result<Vec<ParsedUnit>>;
}

/// Front end backed by pre-exported JSON units.
#[derive(Debug, Clone)]
pub struct JsonFrontEnd {
    file_name: String,
}

impl Default for JsonFrontEnd {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_FILE)
    }
}

impl JsonFrontEnd {
    /// Read units from `<dir>/<file_name>`.
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Name of the export file looked up in each directory.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl FrontEnd for JsonFrontEnd {
    fn load(&self, dir: &Path, mode: LoadMode) -> Result<Vec<ParsedUnit>> {
        let path = dir.join(&self.file_name);
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::FrontEnd(format!("no exported units at {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;

        let mut units: Vec<ParsedUnit> = serde_json::from_str(&content)
            .map_err(|e| Error::FrontEnd(format!("{}: {e}", path.display())))?;

        for unit in &mut units {
            if mode == LoadMode::SyntaxOnly {
                unit.strip_resolution();
            } else if !unit.has_resolution() && !unit.files.is_empty() {
                return Err(Error::FrontEnd(format!(
                    "{}: package {} has no type information",
                    path.display(),
                    unit.package
                )));
            }
        }

        debug!(dir = %dir.display(), units = units.len(), "Loaded exported units");
        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{BasicKind, TypeData};
    use tempfile::tempdir;

    fn write_units(dir: &Path, units: &[ParsedUnit]) {
        let json = serde_json::to_string(units).expect("should serialize units");
        fs::write(dir.join(DEFAULT_UNIT_FILE), json).expect("should write export");
    }

    #[test]
    fn missing_export_is_front_end_failure() {
        let dir = tempdir().expect("should create temp dir");

        let err = JsonFrontEnd::default()
            .load(dir.path(), LoadMode::Resolved)
            .expect_err("missing export should fail");

        assert!(matches!(err, Error::FrontEnd(_)));
    }

    #[test]
    fn malformed_export_is_front_end_failure() {
        let dir = tempdir().expect("should create temp dir");
        fs::write(dir.path().join(DEFAULT_UNIT_FILE), "{not json").expect("should write");

        let err = JsonFrontEnd::default()
            .load(dir.path(), LoadMode::Resolved)
            .expect_err("malformed export should fail");

        assert!(matches!(err, Error::FrontEnd(_)));
    }

    #[test]
    fn syntax_only_strips_resolution() {
        let dir = tempdir().expect("should create temp dir");
        let mut unit = ParsedUnit::new(dir.path(), "main");
        unit.types.push(
            "int",
            TypeData::Basic {
                basic: BasicKind::Int,
            },
        );
        write_units(dir.path(), &[unit]);

        let loaded = JsonFrontEnd::default()
            .load(dir.path(), LoadMode::SyntaxOnly)
            .expect("should load");

        assert_eq!(loaded.len(), 1);
        assert!(!loaded[0].has_resolution());
    }

    #[test]
    fn resolved_load_keeps_types() {
        let dir = tempdir().expect("should create temp dir");
        let mut unit = ParsedUnit::new(dir.path(), "main");
        unit.types.push(
            "int",
            TypeData::Basic {
                basic: BasicKind::Int,
            },
        );
        write_units(dir.path(), &[unit]);

        let loaded = JsonFrontEnd::default()
            .load(dir.path(), LoadMode::Resolved)
            .expect("should load");

        assert_eq!(loaded[0].types.len(), 1);
    }
}
