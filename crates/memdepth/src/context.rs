//! Shared state of one analysis run.

use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::interner::TypeInterner;
use crate::position::PositionIndex;

/// Everything analyze workers share.
///
/// Built once per run and passed by reference to every worker. Workers bring
/// their own [`Session`](crate::db::Session); nothing here holds a connection.
#[derive(Debug)]
pub struct AnalysisContext {
    database: Database,
    interner: TypeInterner,
    positions: PositionIndex,
}

impl AnalysisContext {
    /// Assemble a context from its parts.
    #[must_use]
    pub fn new(database: Database, interner: TypeInterner, positions: PositionIndex) -> Self {
        Self {
            database,
            interner,
            positions,
        }
    }

    /// Open the configured database and build empty caches.
    pub fn from_config(config: &Config) -> Result<Self> {
        let database_path = config.database_path();
        let database = Database::open_with_timeout(&database_path, config.busy_timeout())?;
        info!(
            corpus = %config.corpus_root.display(),
            database = %database_path.display(),
            "Analysis context ready"
        );
        Ok(Self::new(
            database,
            TypeInterner::new(config.type_cache()),
            PositionIndex::new(config.corpus_root.clone(), config.file_cache()),
        ))
    }

    /// The database handle.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// The shared type interner.
    #[must_use]
    pub fn interner(&self) -> &TypeInterner {
        &self.interner
    }

    /// The position index.
    #[must_use]
    pub fn positions(&self) -> &PositionIndex {
        &self.positions
    }

    /// The corpus root.
    #[must_use]
    pub fn corpus_root(&self) -> &Path {
        self.positions.corpus_root()
    }
}
