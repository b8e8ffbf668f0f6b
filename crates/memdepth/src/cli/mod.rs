//! CLI command implementations.

use std::path::{Path, PathBuf};

use memdepth::{AnalysisMode, Config, Database};

pub mod depths;
pub mod run;
pub mod stats;
pub mod truncate;

/// Parse an analysis mode name for clap.
pub fn parse_mode(s: &str) -> Result<AnalysisMode, String> {
    AnalysisMode::parse(s).ok_or_else(|| {
        let names: Vec<&str> = AnalysisMode::ALL.iter().map(AnalysisMode::as_str).collect();
        format!("unknown mode '{s}' (expected one of: {})", names.join(", "))
    })
}

/// Build the effective configuration: file first, then command-line overrides.
pub fn load_config(
    path: Option<&Path>,
    corpus: Option<PathBuf>,
    database: Option<PathBuf>,
) -> Result<Config, memdepth::Error> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::new(std::env::current_dir()?),
    };
    if let Some(corpus) = corpus {
        config.corpus_root = corpus;
    }
    if database.is_some() {
        config.database = database;
    }
    Ok(config)
}

/// Open the configured database.
pub fn open_database(config: &Config) -> Result<Database, memdepth::Error> {
    Database::open_with_timeout(&config.database_path(), config.busy_timeout())
}
