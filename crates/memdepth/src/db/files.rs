//! File rows.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use super::helpers::normalize_path;
use super::Session;
use crate::error::Result;
use crate::types::FileId;

fn find(conn: &Connection, path: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row("SELECT id FROM files WHERE path = ?1", [path], |row| {
        row.get(0)
    })
    .optional()
}

impl Session {
    /// Find or create the row for a file.
    pub fn file_id(&mut self, path: &Path) -> Result<FileId> {
        let path_str = normalize_path(path);
        let (id, _) = self.find_or_create(
            |conn| find(conn, &path_str),
            |conn| {
                conn.execute("INSERT INTO files (path) VALUES (?1)", [&path_str])?;
                Ok(conn.last_insert_rowid())
            },
            |_, _| Ok(()),
        )?;
        Ok(FileId::from(id))
    }

    /// Look up a file without creating it.
    pub fn find_file(&self, path: &Path) -> Result<Option<FileId>> {
        Ok(find(&self.conn, &normalize_path(path))?.map(FileId::from))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use std::path::Path;

    #[test]
    fn file_id_is_stable() {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let db = Database::open(&dir.path().join("t.db")).expect("should open");
        let mut session = db.session().expect("session");

        let a = session.file_id(Path::new("/corpus/x/a.go")).expect("insert");
        let b = session.file_id(Path::new("/corpus/x/a.go")).expect("lookup");
        let missing = session.find_file(Path::new("/corpus/x/b.go")).expect("query");

        assert_eq!(a, b);
        assert!(a.as_i64() > 1, "row 1 is reserved");
        assert_eq!(missing, None);
    }
}
