//! Error types for memdepth operations.
//!
//! Errors are categorized into two main types:
//!
//! - **`Error`**: Top-level errors that halt a run (database failures, etc.)
//! - **`UnitError`**: Directory-level errors that are collected but don't halt the run
//!
//! ## Error Philosophy
//!
//! A single directory the front end cannot load shouldn't prevent analysis of
//! the rest of the corpus. Those failures are logged, collected and reported.
//! Storage failures are different: a half-written directory must never be
//! marked complete, so they abort the whole run.
//!
//! Lookups that find nothing are not errors at all. They return `Option` and
//! are the normal signal to proceed with an insert.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for memdepth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for memdepth operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The front end could not produce a unit for a directory
    #[error("front end error: {0}")]
    FrontEnd(String),

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// An expression or declaration has no statically resolvable type.
    ///
    /// Callers handle this by recording uncertainty, not by aborting.
    #[error("no static type available")]
    NilType,

    /// Internal invariant violated (lock poisoned, worker panicked, ...)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` if this is the nil-type condition.
    #[must_use]
    pub fn is_nil_type(&self) -> bool {
        matches!(self, Self::NilType)
    }

    /// Returns `true` if this error came from a unique constraint violation.
    ///
    /// Such violations arise when two writers race to create the same row and
    /// are resolved by re-querying rather than failing.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(e) => crate::db::is_unique_violation(e),
            _ => false,
        }
    }
}

/// Error encountered while processing a specific source directory.
///
/// These errors are collected during a run but don't halt it. The scheduler
/// continues with the remaining directories and reports all errors at the end.
#[derive(Debug, Clone)]
pub struct UnitError {
    /// Directory (or file inside it) that failed
    pub path: PathBuf,
    /// Category of the error
    pub kind: UnitErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for UnitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.path.display(),
            self.message,
            self.kind
        )
    }
}

impl std::error::Error for UnitError {}

/// Categorization of directory-level errors.
///
/// Uses a 4xx/5xx style pattern:
/// - Input problems are issues with the analyzed sources or their export
/// - Internal problems are issues with memdepth itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitErrorKind {
    // === Input Problems (analogous to HTTP 4xx) ===
    /// The front end failed to parse or type-check the directory
    FrontEndFailed,

    /// The front end reported diagnostics and part of the unit was skipped
    Diagnostic,

    // === Internal Problems (analogous to HTTP 5xx) ===
    /// Could not read the directory or its export from disk
    IoError,
}

impl std::fmt::Display for UnitErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrontEndFailed => write!(f, "front end failed"),
            Self::Diagnostic => write!(f, "skipped by diagnostic"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl UnitErrorKind {
    /// Returns `true` if this is an input problem (4xx-style).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::FrontEndFailed | Self::Diagnostic)
    }

    /// Returns `true` if this is an internal problem (5xx-style).
    #[must_use]
    pub fn is_internal_error(&self) -> bool {
        matches!(self, Self::IoError)
    }
}

impl UnitError {
    /// Create a new directory-level error.
    #[must_use]
    pub fn new(path: PathBuf, kind: UnitErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
        }
    }

    /// Create an error for a directory the front end could not load.
    ///
    /// I/O failures keep their own category so they are not mistaken for bad input.
    #[must_use]
    pub fn from_load_error(path: PathBuf, error: &Error) -> Self {
        let kind = match error {
            Error::Io(_) => UnitErrorKind::IoError,
            _ => UnitErrorKind::FrontEndFailed,
        };
        Self::new(path, kind, error.to_string())
    }

    /// Create an error for a file or unit skipped because of a front-end diagnostic.
    #[must_use]
    pub fn diagnostic(path: PathBuf, message: impl Into<String>) -> Self {
        Self::new(path, UnitErrorKind::Diagnostic, message)
    }
}
