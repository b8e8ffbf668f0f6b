//! `memdepth depths` command implementation.

use std::path::Path;

use colored::Colorize;
use memdepth::{Config, MemoryAccessRecord};

use super::open_database;

/// Print the memory accesses of one file, in source order.
pub fn run(config: &Config, file: &Path, min_depth: Option<i64>) -> Result<(), memdepth::Error> {
    let db = open_database(config)?;
    let records: Vec<MemoryAccessRecord> = db
        .memory_accesses(Some(file))?
        .into_iter()
        .filter(|r| min_depth.is_none_or(|min| r.depth >= min))
        .collect();

    if records.is_empty() {
        println!("No memory accesses recorded for {}", file.display());
        return Ok(());
    }

    println!(
        "{} in {}:",
        format!("{} memory accesses", records.len()).cyan().bold(),
        file.display()
    );
    println!();

    for record in &records {
        let depth = if record.uncertainty > 0 {
            format!("{}?{}", record.depth, record.uncertainty).yellow()
        } else {
            record.depth.to_string().green()
        };
        println!(
            "  {}:{}  {:<22} depth {}  {}",
            record.span.start_line,
            record.span.start_column,
            record.kind.as_str(),
            depth,
            record.base_name.as_deref().unwrap_or("<call>").dimmed()
        );
    }
    Ok(())
}
