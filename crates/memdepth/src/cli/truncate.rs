//! `memdepth truncate` command implementation.

use colored::Colorize;
use memdepth::Config;

use super::open_database;

/// Empty every table of the configured database.
///
/// Completed-directory logs are left alone; delete them to re-run a corpus.
pub fn run(config: &Config, yes: bool) -> Result<(), memdepth::Error> {
    let db = open_database(config)?;
    if !yes {
        return Err(memdepth::Error::Config(format!(
            "truncate deletes every row of {}; pass --yes to confirm",
            db.path().display()
        )));
    }

    db.truncate()?;

    println!(
        "{} all tables in {}",
        "Truncated".green().bold(),
        db.path().display()
    );
    println!(
        "{}",
        format!(
            "Completed logs in {} still list finished directories.",
            config.log_dir().display()
        )
        .dimmed()
    );
    Ok(())
}
