//! `memdepth run` command implementation.

use colored::Colorize;
use memdepth::{AnalysisMode, Config, JsonFrontEnd, Pipeline};

/// Run the pipeline and print a summary.
pub fn run(config: Config, mode: AnalysisMode, units_file: &str) -> Result<(), memdepth::Error> {
    println!(
        "{} {} ({} mode)...",
        "Analyzing".cyan().bold(),
        config.corpus_root.display(),
        mode
    );

    let pipeline = Pipeline::new(config, mode, Box::new(JsonFrontEnd::new(units_file)));
    let stats = pipeline.run()?;

    println!();
    println!(
        "{} {} directories, {} units",
        "Analyzed".green().bold(),
        stats.directories_completed,
        stats.units_analyzed
    );
    println!("{}: {:.2?}", "Duration".dimmed(), stats.duration);

    if stats.directories_skipped_done > 0 {
        println!(
            "{}: {} of {} directories (already completed)",
            "Skipped".yellow(),
            stats.directories_skipped_done,
            stats.directories_total
        );
    }

    if !stats.errors.is_empty() {
        println!();
        println!("{} ({}):", "Errors".red().bold(), stats.errors.len());
        for err in stats.errors.iter().take(5) {
            println!("  {} {}: {}", "•".red(), err.path.display(), err.message);
        }
        if stats.errors.len() > 5 {
            println!("  ... and {} more", stats.errors.len() - 5);
        }
    }

    for path in pipeline.log_paths() {
        println!("{}: {}", "Completed log".dimmed(), path.display());
    }
    Ok(())
}
