//! memdepth CLI - memory-access depth analysis from the command line.
//!
//! Runs the analysis pipeline over a corpus of Go source directories and
//! inspects the resulting database.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use memdepth::AnalysisMode;
use tracing_subscriber::EnvFilter;

mod cli;

/// memdepth: relational encoder and memory-access depth analyzer for Go corpora.
#[derive(Parser)]
#[command(name = "memdepth")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Corpus root directory (overrides the configuration; defaults to current directory)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Database file (overrides the configuration)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every pending directory of the corpus
    Run {
        /// Passes to run (defs, depth, all, make, alloc-sizes)
        #[arg(short, long, default_value = "all", value_parser = cli::parse_mode)]
        mode: AnalysisMode,

        /// Parse workers (defaults to a quarter of the hardware threads)
        #[arg(long)]
        parse_workers: Option<usize>,

        /// Analyze/write workers (defaults to an eighth of the hardware threads)
        #[arg(long)]
        write_workers: Option<usize>,

        /// Name of the per-directory unit export
        #[arg(long, default_value = memdepth::frontend::DEFAULT_UNIT_FILE)]
        units_file: String,
    },

    /// Delete every row from every table
    Truncate {
        /// Confirm deleting every row
        #[arg(short, long)]
        yes: bool,
    },

    /// Show row counts per table
    Stats,

    /// Show the memory accesses recorded for one source file
    Depths {
        /// Source file, as recorded (absolute path under the corpus root)
        file: PathBuf,

        /// Only show accesses at or below this depth
        #[arg(long)]
        min_depth: Option<i64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match cli::load_config(cli.config.as_deref(), cli.corpus, cli.database) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Run {
            mode,
            parse_workers,
            write_workers,
            units_file,
        } => {
            let mut config = config;
            if parse_workers.is_some() {
                config.parse_workers = parse_workers;
            }
            if write_workers.is_some() {
                config.write_workers = write_workers;
            }
            cli::run::run(config, mode, &units_file)
        }
        Commands::Truncate { yes } => cli::truncate::run(&config, yes),
        Commands::Stats => cli::stats::run(&config),
        Commands::Depths { file, min_depth } => cli::depths::run(&config, &file, min_depth),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::FAILURE
        }
    }
}
