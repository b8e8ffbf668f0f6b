//! # memdepth: Relational Encoding and Memory-Access Depth for Go Corpora
//!
//! memdepth walks a corpus of Go source directories, turns every parsed
//! package into rows of a `SQLite` database (files, types, functions,
//! variables, statements, expressions) and classifies each expression that
//! touches memory by how many indirections separate it from its root
//! variable.
//!
//! ## Design Philosophy
//!
//! - **Front end at the edge** - Parsing and type-checking Go happens
//!   elsewhere; a [`FrontEnd`] hands over syntax trees plus resolution tables
//! - **Idempotent writes** - Every row is found by its natural key before it
//!   is inserted, so re-running a directory never duplicates anything
//! - **Resumable** - Completed directories go to an append-only log that the
//!   next run skips
//! - **Uncertainty is data** - Missing type information is recorded, not
//!   guessed around
//!
//! ## Quick Start
//!
//! ```no_run
//! use memdepth::{AnalysisMode, Config, JsonFrontEnd, Pipeline};
//!
//! let config = Config::new("/path/to/corpus");
//! let pipeline = Pipeline::new(config, AnalysisMode::All, Box::new(JsonFrontEnd::default()));
//!
//! let stats = pipeline.run()?;
//! println!(
//!     "Analyzed {} directories ({} skipped as done)",
//!     stats.directories_completed, stats.directories_skipped_done
//! );
//! # Ok::<(), memdepth::Error>(())
//! ```

pub mod analyzer;
pub mod completed_log;
pub mod config;
pub mod context;
pub mod db;
mod error;
pub mod frontend;
pub mod interner;
pub mod pipeline;
pub mod position;
pub mod syntax;
mod types;

pub use analyzer::{AccessChain, Step, analyze_unit};
pub use completed_log::CompletedLog;
pub use config::Config;
pub use context::AnalysisContext;
pub use db::{Database, Session};
pub use error::{Error, Result, UnitError, UnitErrorKind};
pub use frontend::{FrontEnd, JsonFrontEnd, LoadMode};
pub use interner::TypeInterner;
pub use pipeline::{Pipeline, StageCloser, discover};
pub use position::PositionIndex;
pub use types::{
    AnalysisMode, ContainerKind, ExprId, ExprKind, FileId, FunctionId, MemAccessKind,
    MemoryAccessRecord, Position, RunStats, SchemaStats, SignatureRole, Span, StmtId, StmtKind,
    TypeId, TypeKind, UNKNOWN_ID, VariableId, VariableRole,
};
