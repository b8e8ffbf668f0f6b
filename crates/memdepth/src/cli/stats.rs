//! `memdepth stats` command implementation.

use colored::Colorize;
use memdepth::Config;

use super::open_database;

/// Print row counts per table.
pub fn run(config: &Config) -> Result<(), memdepth::Error> {
    let db = open_database(config)?;
    let stats = db.stats()?;

    let db_size = match std::fs::metadata(db.path()) {
        Ok(meta) => format_size(meta.len()),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to get database file size");
            "size unknown".to_string()
        }
    };

    println!("{}", "memdepth Database Statistics".cyan().bold());
    println!();
    println!(
        "  {}: {} ({})",
        "Database".white().bold(),
        db.path().display(),
        db_size
    );
    println!();

    let rows = [
        ("Files", stats.files),
        ("Types", stats.types),
        ("Functions", stats.functions),
        ("Variables", stats.variables),
        ("Statements", stats.statements),
        ("Expressions", stats.expressions),
        ("Memory accesses", stats.memory_accesses),
        ("Make sites", stats.make_sites),
        ("Sized allocations", stats.sized_alloc_sites),
    ];
    for (name, count) in rows {
        println!("  {}: {}", name.white().bold(), count.to_string().green());
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
