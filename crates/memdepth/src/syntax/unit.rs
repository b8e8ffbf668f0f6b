//! Parsed units: what the front end produces for one package in a directory.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ast::SourceFile;
use super::objects::ObjectTable;
use super::typetable::TypeTable;
use crate::error::UnitError;

/// A problem the front end reported for part of a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Affected file; `None` when the whole unit is affected
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Front-end message
    pub message: String,
}

/// One package of one directory, parsed and (optionally) type-resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedUnit {
    /// Source directory
    pub dir: PathBuf,
    /// Package name
    pub package: String,
    /// Files in the package
    pub files: Vec<SourceFile>,
    /// Resolved types referenced by the tree
    #[serde(default)]
    pub types: TypeTable,
    /// Resolved objects referenced by the tree
    #[serde(default)]
    pub objects: ObjectTable,
    /// Problems the front end reported
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedUnit {
    /// Create a unit with no resolution data.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            package: package.into(),
            files: Vec::new(),
            types: TypeTable::new(),
            objects: ObjectTable::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Drop type and object tables, leaving syntax only.
    ///
    /// References in the tree then resolve to nothing.
    pub fn strip_resolution(&mut self) {
        self.types.clear();
        self.objects.clear();
    }

    /// Whether any resolution data is present.
    #[must_use]
    pub fn has_resolution(&self) -> bool {
        !self.types.is_empty() || !self.objects.is_empty()
    }

    /// Files that survive the unit's diagnostics, plus an error per skipped part.
    ///
    /// A diagnostic naming a file skips that file. A diagnostic naming no
    /// file skips the whole unit.
    #[must_use]
    pub fn usable_files(&self) -> (Vec<&SourceFile>, Vec<UnitError>) {
        let mut errors = Vec::new();
        let mut skipped: HashSet<&PathBuf> = HashSet::new();

        for diag in &self.diagnostics {
            match &diag.file {
                Some(file) => {
                    warn!(
                        file = %file.display(),
                        message = %diag.message,
                        "Skipping file reported by front end"
                    );
                    skipped.insert(file);
                    errors.push(UnitError::diagnostic(file.clone(), diag.message.clone()));
                }
                None => {
                    warn!(dir = %self.dir.display(), message = %diag.message, "Skipping unit reported by front end");
                    errors.push(UnitError::diagnostic(self.dir.clone(), diag.message.clone()));
                    return (Vec::new(), errors);
                }
            }
        }

        let files = self
            .files
            .iter()
            .filter(|f| !skipped.contains(&f.path))
            .collect();
        (files, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::Ident;
    use crate::types::Span;

    fn file(path: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(path),
            package: Ident {
                name: "main".into(),
                span: Span::new(1, 9, 1, 13).expect("valid span"),
                ty: None,
                obj: None,
            },
            decls: Vec::new(),
        }
    }

    #[test]
    fn file_diagnostic_skips_only_that_file() {
        let mut unit = ParsedUnit::new("/corpus/a", "main");
        unit.files = vec![file("/corpus/a/x.go"), file("/corpus/a/y.go")];
        unit.diagnostics.push(Diagnostic {
            file: Some(PathBuf::from("/corpus/a/y.go")),
            message: "build constraints exclude file".into(),
        });

        let (files, errors) = unit.usable_files();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("/corpus/a/x.go"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn unit_diagnostic_skips_everything() {
        let mut unit = ParsedUnit::new("/corpus/a", "main");
        unit.files = vec![file("/corpus/a/x.go")];
        unit.diagnostics.push(Diagnostic {
            file: None,
            message: "type checking failed".into(),
        });

        let (files, errors) = unit.usable_files();

        assert!(files.is_empty());
        assert_eq!(errors.len(), 1);
    }
}
