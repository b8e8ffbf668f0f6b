//! Position index: source positions to durable row ids.
//!
//! Files are cached by path, since every node of a file needs its file id.
//! Function, variable, statement and expression rows are keyed by position
//! in the database and looked up there (see [`crate::db`]).
//!
//! The index also decides whether a definition site is inside the corpus.
//! Only in-corpus definitions can resolve to rows; anything else is recorded
//! as unresolved.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

use crate::db::Session;
use crate::error::Result;
use crate::syntax::DeclSite;
use crate::types::{FileId, FunctionId, Position, VariableId};

/// Maps positions to row ids for one corpus.
pub struct PositionIndex {
    corpus_root: PathBuf,
    files: Mutex<LruCache<PathBuf, FileId>>,
}

impl std::fmt::Debug for PositionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionIndex")
            .field("corpus_root", &self.corpus_root)
            .field("cached_files", &self.files.lock().len())
            .finish()
    }
}

impl PositionIndex {
    /// Create an index for `corpus_root` caching at most `capacity` file ids.
    pub fn new(corpus_root: impl Into<PathBuf>, capacity: NonZeroUsize) -> Self {
        Self {
            corpus_root: corpus_root.into(),
            files: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The corpus root.
    #[must_use]
    pub fn corpus_root(&self) -> &Path {
        &self.corpus_root
    }

    /// Whether `path` lies under the corpus root.
    #[must_use]
    pub fn in_corpus(&self, path: &Path) -> bool {
        path.starts_with(&self.corpus_root)
    }

    /// Id of a file, creating its row on first sight.
    pub fn file_id(&self, session: &mut Session, path: &Path) -> Result<FileId> {
        if let Some(id) = self.files.lock().get(path) {
            return Ok(*id);
        }
        let id = session.file_id(path)?;
        trace!(file = %path.display(), id = id.as_i64(), "Cached file id");
        self.files.lock().put(path.to_path_buf(), id);
        Ok(id)
    }

    /// File row and position of an in-corpus definition site.
    ///
    /// Returns `None` for sites outside the corpus. The file row is created
    /// if needed, so the reference is recorded even before that file is
    /// analyzed.
    pub fn definition(
        &self,
        session: &mut Session,
        site: &DeclSite,
    ) -> Result<Option<(FileId, Position)>> {
        if !self.in_corpus(&site.file) {
            return Ok(None);
        }
        let file = self.file_id(session, &site.file)?;
        Ok(Some((file, site.position)))
    }

    /// Variable declared at `site`, if it is in the corpus and already recorded.
    pub fn variable_at(&self, session: &Session, site: &DeclSite) -> Result<Option<VariableId>> {
        match self.known_file(session, &site.file)? {
            Some(file) => session.find_variable(file, site.position),
            None => Ok(None),
        }
    }

    /// Function declared at `site`, if it is in the corpus and already recorded.
    pub fn function_at(&self, session: &Session, site: &DeclSite) -> Result<Option<FunctionId>> {
        match self.known_file(session, &site.file)? {
            Some(file) => session.find_function(file, site.position),
            None => Ok(None),
        }
    }

    /// File id of an in-corpus file that already has a row.
    fn known_file(&self, session: &Session, path: &Path) -> Result<Option<FileId>> {
        if !self.in_corpus(path) {
            return Ok(None);
        }
        if let Some(id) = self.files.lock().get(path) {
            return Ok(Some(*id));
        }
        let found = session.find_file(path)?;
        if let Some(id) = found {
            self.files.lock().put(path.to_path_buf(), id);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, VariableRow};
    use crate::types::VariableRole;

    fn setup() -> (tempfile::TempDir, Database, PositionIndex) {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let db = Database::open(&dir.path().join("pos.db")).expect("should open");
        let index = PositionIndex::new("/corpus", NonZeroUsize::new(4).expect("non-zero"));
        (dir, db, index)
    }

    fn site(file: &str, line: u32, column: u32) -> DeclSite {
        DeclSite {
            file: PathBuf::from(file),
            position: Position::new(line, column),
        }
    }

    #[test]
    fn corpus_membership_is_by_path_prefix() {
        let (_dir, _db, index) = setup();
        assert!(index.in_corpus(Path::new("/corpus/a/b.go")));
        assert!(!index.in_corpus(Path::new("/corpusx/b.go")));
        assert!(!index.in_corpus(Path::new("/usr/lib/go/src/fmt/print.go")));
    }

    #[test]
    fn file_id_is_cached_and_stable() {
        let (_dir, db, index) = setup();
        let mut session = db.session().expect("session");

        let a = index.file_id(&mut session, Path::new("/corpus/a.go")).expect("file");
        let b = index.file_id(&mut session, Path::new("/corpus/a.go")).expect("file");

        assert_eq!(a, b);
        assert_eq!(db.stats().expect("stats").files, 1);
    }

    #[test]
    fn out_of_corpus_sites_never_resolve() {
        let (_dir, db, index) = setup();
        let mut session = db.session().expect("session");
        let outside = site("/usr/lib/go/src/os/file.go", 10, 2);

        assert_eq!(index.definition(&mut session, &outside).expect("def"), None);
        assert_eq!(index.variable_at(&session, &outside).expect("var"), None);
        assert_eq!(db.stats().expect("stats").files, 0, "no row for outside files");
    }

    #[test]
    fn variable_at_finds_recorded_variable() {
        let (_dir, db, index) = setup();
        let mut session = db.session().expect("session");
        let decl = site("/corpus/a.go", 3, 5);
        let file = index.file_id(&mut session, &decl.file).expect("file");
        let (var, _) = session
            .insert_variable(&VariableRow {
                name: "a",
                file,
                position: decl.position,
                ty: None,
                is_const: false,
                function: None,
                role: VariableRole::Local,
            })
            .expect("insert");

        assert_eq!(index.variable_at(&session, &decl).expect("lookup"), Some(var));
        assert_eq!(
            index
                .variable_at(&session, &site("/corpus/a.go", 4, 5))
                .expect("lookup"),
            None
        );
    }
}
