//! Durable log of completed directories.
//!
//! One directory path per line, append-only. The log is read in full at
//! startup to decide what to skip, and every new line is flushed and synced
//! before the next directory is recorded, so a crash loses at most the
//! directory in flight.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;

/// Append handle on a completed-directory log.
#[derive(Debug)]
pub struct CompletedLog {
    path: PathBuf,
    file: File,
}

impl CompletedLog {
    /// Read every path recorded in the log at `path`.
    ///
    /// A missing log is an empty set. Blank lines are ignored. Only line
    /// endings are stripped; other trailing characters belong to the path.
    pub fn read(path: &Path) -> Result<HashSet<PathBuf>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e.into()),
        };

        let mut done = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let entry = line.strip_suffix('\r').unwrap_or(&line);
            if !entry.is_empty() {
                done.insert(PathBuf::from(entry));
            }
        }
        debug!(log = %path.display(), entries = done.len(), "Read completed log");
        Ok(done)
    }

    /// Open the log for appending, creating it and its directory if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!(log = %path.display(), "Opened completed log");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a completed directory and make the record durable.
    pub fn append(&mut self, dir: &Path) -> Result<()> {
        writeln!(self.file, "{}", dir.display())?;
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_log_is_empty() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let done = CompletedLog::read(&dir.path().join("none.log")).expect("read");
        assert!(done.is_empty());
    }

    #[test]
    fn appended_paths_are_read_back() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let path = dir.path().join("state").join("done.log");

        let mut log = CompletedLog::open(&path).expect("open");
        log.append(Path::new("/corpus/a")).expect("append");
        log.append(Path::new("/corpus/b/c")).expect("append");
        drop(log);

        let done = CompletedLog::read(&path).expect("read");
        assert_eq!(done.len(), 2);
        assert!(done.contains(Path::new("/corpus/a")));
        assert!(done.contains(Path::new("/corpus/b/c")));
    }

    #[test]
    fn reopening_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let path = dir.path().join("done.log");

        CompletedLog::open(&path)
            .expect("open")
            .append(Path::new("/corpus/a"))
            .expect("append");
        CompletedLog::open(&path)
            .expect("reopen")
            .append(Path::new("/corpus/b"))
            .expect("append");

        assert_eq!(CompletedLog::read(&path).expect("read").len(), 2);
    }

    #[test]
    fn trailing_spaces_are_part_of_the_path() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let path = dir.path().join("done.log");

        let mut log = CompletedLog::open(&path).expect("open");
        log.append(Path::new("/corpus/odd name ")).expect("append");
        drop(log);
        let mut content = fs::read_to_string(&path).expect("read");
        content.push_str("/corpus/crlf\r\n");
        fs::write(&path, content).expect("write");

        let done = CompletedLog::read(&path).expect("read");
        assert!(done.contains(Path::new("/corpus/odd name ")));
        assert!(!done.contains(Path::new("/corpus/odd name")));
        assert!(done.contains(Path::new("/corpus/crlf")));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let path = dir.path().join("done.log");
        fs::write(&path, "/corpus/a\n\n/corpus/b\n").expect("write");

        assert_eq!(CompletedLog::read(&path).expect("read").len(), 2);
    }
}
