//! Index writer for per-line documents.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tantivy::{Index, IndexWriter, Term, directory::MmapDirectory};

use crate::{
    analyzer::register_analyzers, document::FileDocuments, error::IndexError, schema::LineSchema,
};

/// Default heap size for the index writer (50 MB).
const DEFAULT_HEAP_SIZE: usize = 50_000_000;

/// Owns the single writer for one index directory.
///
/// Deletes and adds are staged until [`commit`](Self::commit); readers never see a file
/// half-written because commits only happen between files.
pub struct LineWriter {
    /// The Tantivy index.
    index: Index,
    /// The underlying Tantivy writer.
    writer: IndexWriter,
    /// Schema with field handles.
    schema: LineSchema,
    /// Index directory.
    path: PathBuf,
}

impl LineWriter {
    /// Opens or creates the index at `path`.
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let schema = LineSchema::new();

        fs::create_dir_all(path)?;

        let dir = MmapDirectory::open(path).map_err(|e| {
            let err: tantivy::TantivyError = e.into();
            IndexError::open_index(path.to_path_buf(), &err)
        })?;

        let index = Index::open_or_create(dir, schema.schema().clone())
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;
        register_analyzers(&index);

        let writer = index
            .writer(DEFAULT_HEAP_SIZE)
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;

        log::debug!("opened index writer at {}", path.display());
        Ok(Self {
            index,
            writer,
            schema,
            path: path.to_path_buf(),
        })
    }

    /// The underlying index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Field handles.
    pub fn schema(&self) -> &LineSchema {
        &self.schema
    }

    /// Index directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False once the index directory has been removed from under the writer.
    pub fn is_usable(&self) -> bool {
        self.path.join("meta.json").exists()
    }

    /// Stages deletion of every document of the file with full path `key`.
    pub fn delete_path(&mut self, key: &str) {
        let term = Term::from_field_text(self.schema.fullpath, key);
        self.writer.delete_term(term);
    }

    /// Stages deletion of every meta document.
    pub fn delete_meta_documents(&mut self) {
        let term = Term::from_field_text(self.schema.metadocument, crate::schema::META_MARKER);
        self.writer.delete_term(term);
    }

    /// Stages a file's line documents followed by its meta document.
    pub fn add_file(&mut self, documents: FileDocuments) -> Result<(), IndexError> {
        for doc in documents.lines {
            self.writer
                .add_document(doc)
                .map_err(|e| IndexError::write(&e))?;
        }
        self.writer
            .add_document(documents.meta)
            .map_err(|e| IndexError::write(&e))?;
        Ok(())
    }

    /// Stages a single document.
    pub fn add_document(&mut self, doc: tantivy::TantivyDocument) -> Result<(), IndexError> {
        self.writer
            .add_document(doc)
            .map_err(|e| IndexError::write(&e))?;
        Ok(())
    }

    /// Commits all staged changes.
    pub fn commit(&mut self) -> Result<(), IndexError> {
        self.writer.commit().map_err(|e| IndexError::commit(&e))?;
        Ok(())
    }

    /// Discards all staged changes.
    pub fn rollback(&mut self) -> Result<(), IndexError> {
        self.writer.rollback().map_err(|e| IndexError::commit(&e))?;
        Ok(())
    }

    /// Returns the number of committed documents, meta documents included.
    pub fn num_docs(&self) -> Result<u64, IndexError> {
        let reader = self.index.reader().map_err(|e| IndexError::read(&e))?;
        Ok(reader.searcher().num_docs())
    }

    /// Waits for merging threads and releases the writer lock.
    pub fn close(self) -> Result<(), IndexError> {
        self.writer
            .wait_merging_threads()
            .map_err(|e| IndexError::commit(&e))
    }
}

#[cfg(test)]
mod test {
    use castle_config::Config;
    use tempfile::TempDir;

    use super::*;
    use crate::document::DocumentBuilder;

    fn documents(key: &str, text: &str) -> FileDocuments {
        let builder = DocumentBuilder::new(LineSchema::new(), &Config::default()).unwrap();
        FileDocuments {
            lines: builder.line_documents(Path::new(key), "demo", text),
            meta: builder.meta_document(key, 1),
        }
    }

    #[test]
    fn creates_index_in_empty_directory() {
        let temp = TempDir::new().unwrap();
        let writer = LineWriter::open(temp.path()).unwrap();
        assert!(temp.path().join("meta.json").exists());
        assert!(writer.is_usable());
    }

    #[test]
    fn adds_lines_and_meta() {
        let temp = TempDir::new().unwrap();
        let mut writer = LineWriter::open(temp.path()).unwrap();

        writer.add_file(documents("/p/A.java", "int a;\nint b;\n")).unwrap();
        writer.commit().unwrap();

        assert_eq!(writer.num_docs().unwrap(), 3);
    }

    #[test]
    fn delete_then_add_replaces_file() {
        let temp = TempDir::new().unwrap();
        let mut writer = LineWriter::open(temp.path()).unwrap();

        writer.add_file(documents("/p/A.java", "int a;\nint b;\nint c;\n")).unwrap();
        writer.commit().unwrap();

        writer.delete_path("/p/A.java");
        writer.add_file(documents("/p/A.java", "int a;\n")).unwrap();
        writer.commit().unwrap();

        assert_eq!(writer.num_docs().unwrap(), 2);
    }

    #[test]
    fn rollback_discards_staged_documents() {
        let temp = TempDir::new().unwrap();
        let mut writer = LineWriter::open(temp.path()).unwrap();

        writer.add_file(documents("/p/A.java", "int a;\n")).unwrap();
        writer.rollback().unwrap();
        writer.commit().unwrap();

        assert_eq!(writer.num_docs().unwrap(), 0);
    }

    #[test]
    fn removed_directory_is_unusable() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("index");
        let writer = LineWriter::open(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();
        assert!(!writer.is_usable());
    }
}
