//! Run configuration.
//!
//! Loaded from a YAML file, then overridden by command-line flags:
//!
//! ```yaml
//! corpus-root: /data/corpus
//! database: /data/memdepth.db
//! parse-workers: 8
//! write-workers: 4
//! ```
//!
//! Every field except `corpus-root` has a default.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Directory under the corpus root holding the default database and logs.
pub const STATE_DIR_NAME: &str = ".memdepth";

/// Default database file name inside [`STATE_DIR_NAME`].
pub const DATABASE_FILE_NAME: &str = "memdepth.db";

/// Default bound of every pipeline queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Default wait for another writer's lock, in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

/// Default capacity of the type-name and file-path caches.
pub const DEFAULT_CACHE_CAPACITY: usize = 65_536;

/// Upper bound on analyze workers, which bounds concurrent write transactions.
pub const MAX_WRITE_WORKERS: usize = 10;

/// Configuration for a memdepth run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Directory every analyzed directory lives under
    pub corpus_root: PathBuf,

    /// Database file; defaults to `<corpus-root>/.memdepth/memdepth.db`
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Directory of the completed-directory logs; defaults to `<corpus-root>/.memdepth`
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Parse workers; sized from the hardware when absent
    #[serde(default)]
    pub parse_workers: Option<usize>,

    /// Analyze/write workers; sized from the hardware when absent
    #[serde(default)]
    pub write_workers: Option<usize>,

    /// Bound of every pipeline queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Wait for another writer's lock, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Type-name cache capacity
    #[serde(default = "default_cache_capacity")]
    pub type_cache_capacity: usize,

    /// File-path cache capacity
    #[serde(default = "default_cache_capacity")]
    pub file_cache_capacity: usize,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Config {
    /// Defaults for a corpus root.
    pub fn new(corpus_root: impl Into<PathBuf>) -> Self {
        Self {
            corpus_root: corpus_root.into(),
            database: None,
            log_dir: None,
            parse_workers: None,
            write_workers: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            type_cache_capacity: DEFAULT_CACHE_CAPACITY,
            file_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a YAML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.corpus_root.as_os_str().is_empty() {
            return Err(Error::Config("corpus-root must be set".to_string()));
        }
        if !self.corpus_root.is_dir() {
            return Err(Error::Config(format!(
                "corpus-root {} is not a directory",
                self.corpus_root.display()
            )));
        }
        for (name, value) in [
            ("parse-workers", self.parse_workers),
            ("write-workers", self.write_workers),
        ] {
            if value == Some(0) {
                return Err(Error::Config(format!("{name} must be at least 1")));
            }
        }
        for (name, value) in [
            ("queue-capacity", self.queue_capacity),
            ("type-cache-capacity", self.type_cache_capacity),
            ("file-cache-capacity", self.file_cache_capacity),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    /// Database file, after defaults.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.state_dir().join(DATABASE_FILE_NAME))
    }

    /// Completed-log directory, after defaults.
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| self.state_dir())
    }

    fn state_dir(&self) -> PathBuf {
        self.corpus_root.join(STATE_DIR_NAME)
    }

    /// Wait for another writer's lock.
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Parse workers, after defaults.
    #[must_use]
    pub fn parse_workers(&self) -> usize {
        self.parse_workers
            .unwrap_or_else(|| default_parse_workers(hardware_threads()))
    }

    /// Analyze/write workers, after defaults.
    #[must_use]
    pub fn write_workers(&self) -> usize {
        self.write_workers
            .unwrap_or_else(|| default_write_workers(hardware_threads()))
    }

    /// Type-name cache capacity as a non-zero size.
    #[must_use]
    pub fn type_cache(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.type_cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// File-path cache capacity as a non-zero size.
    #[must_use]
    pub fn file_cache(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.file_cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

fn hardware_threads() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// A quarter of the hardware threads, at least one.
#[must_use]
pub fn default_parse_workers(hw: usize) -> usize {
    (hw / 4).max(1)
}

/// An eighth of the hardware threads, between one and [`MAX_WRITE_WORKERS`].
#[must_use]
pub fn default_write_workers(hw: usize) -> usize {
    (hw / 8).clamp(1, MAX_WRITE_WORKERS)
}
