//! Change detection against the meta documents stored in the index.
//!
//! Each indexed file has one meta document holding its last-modified time and the
//! document version it was built with. Comparing those against the file system yields the
//! files to re-index and the paths whose documents should be deleted.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use castle_config::Project;
use regex::Regex;
use tantivy::{
    DocAddress, TantivyDocument, Term,
    collector::DocSetCollector,
    query::TermQuery,
    schema::{IndexRecordOption, Value},
};

use crate::{
    discovery::{SourceFile, discover_files},
    error::IndexError,
    provider::IndexSnapshot,
    schema::{META_MARKER, names},
};

/// Stored bookkeeping for one indexed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaInfo {
    /// Last-modified time, milliseconds since the epoch.
    pub last_modified: i64,
    /// Document version the file was indexed with.
    pub document_version: i64,
}

/// Work found by a change scan.
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// Files to (re)index, most recently modified first.
    pub files: Vec<SourceFile>,
    /// Full-path keys of indexed files that no longer exist.
    pub deletions: HashSet<String>,
}

impl ChangeSet {
    /// Returns true if there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.deletions.is_empty()
    }
}

/// Reads every meta document, keyed by full path.
pub fn read_meta(snapshot: &IndexSnapshot) -> Result<HashMap<String, MetaInfo>, IndexError> {
    let searcher = &snapshot.searcher;
    let query = TermQuery::new(
        Term::from_field_text(snapshot.schema.metadocument, META_MARKER),
        IndexRecordOption::Basic,
    );
    let addresses = searcher
        .search(&query, &DocSetCollector)
        .map_err(|e| IndexError::read(&e))?;

    // Group by segment so each segment's columns are opened once.
    let mut by_segment: HashMap<u32, Vec<u32>> = HashMap::new();
    for address in addresses {
        by_segment
            .entry(address.segment_ord)
            .or_default()
            .push(address.doc_id);
    }

    let mut meta = HashMap::new();
    for (segment_ord, docs) in by_segment {
        let fast_fields = searcher.segment_reader(segment_ord).fast_fields();
        let modified = fast_fields
            .i64(names::FILE_LAST_MODIFIED)
            .map_err(|e| IndexError::read(&e))?;
        let version = fast_fields
            .i64(names::DOCUMENT_VERSION)
            .map_err(|e| IndexError::read(&e))?;

        for doc_id in docs {
            let doc: TantivyDocument = searcher
                .doc(DocAddress::new(segment_ord, doc_id))
                .map_err(|e| IndexError::read(&e))?;
            let Some(path) = doc
                .get_first(snapshot.schema.metapath)
                .and_then(|v| v.as_str())
            else {
                continue;
            };
            meta.insert(
                path.to_string(),
                MetaInfo {
                    last_modified: modified.first(doc_id).unwrap_or(0),
                    document_version: version.first(doc_id).unwrap_or(0),
                },
            );
        }
    }

    Ok(meta)
}

/// Whether `file` has to be indexed again given its stored meta record.
pub fn needs_reindex(file: &SourceFile, stored: Option<&MetaInfo>, document_version: i64) -> bool {
    match stored {
        None => true,
        Some(meta) => {
            meta.last_modified != file.last_modified || meta.document_version != document_version
        }
    }
}

/// Compares the tracked projects with the index.
///
/// Without a snapshot every discovered file is new.
pub fn detect_changes(
    snapshot: Option<&IndexSnapshot>,
    projects: &[Project],
    extensions: Option<&Regex>,
    document_version: i64,
) -> Result<ChangeSet, IndexError> {
    let discovered = discover_files(projects, extensions);
    let stored = match snapshot {
        Some(snapshot) => read_meta(snapshot)?,
        None => HashMap::new(),
    };
    Ok(diff(discovered, &stored, document_version))
}

/// Splits discovered files into work, given the stored meta records.
fn diff(
    discovered: Vec<SourceFile>,
    stored: &HashMap<String, MetaInfo>,
    document_version: i64,
) -> ChangeSet {
    let mut files: Vec<SourceFile> = discovered
        .into_iter()
        .filter(|file| needs_reindex(file, stored.get(&file.key()), document_version))
        .collect();
    files.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    let deletions = stored
        .keys()
        .filter(|key| !Path::new(key.as_str()).exists())
        .cloned()
        .collect();

    ChangeSet { files, deletions }
}

#[cfg(test)]
mod test {
    use std::{fs, path::PathBuf};

    use castle_config::{Config, extension_pattern};
    use tempfile::TempDir;

    use super::*;
    use crate::{
        document::DocumentBuilder, provider::SearcherProvider, schema::LineSchema,
        writer::LineWriter,
    };

    fn file(path: &str, last_modified: i64) -> SourceFile {
        SourceFile {
            project: String::new(),
            path: PathBuf::from(path),
            last_modified,
        }
    }

    #[test]
    fn reindex_rules() {
        let meta = MetaInfo {
            last_modified: 10,
            document_version: 3,
        };
        assert!(needs_reindex(&file("/a", 10), None, 3));
        assert!(!needs_reindex(&file("/a", 10), Some(&meta), 3));
        assert!(needs_reindex(&file("/a", 11), Some(&meta), 3));
        assert!(needs_reindex(&file("/a", 10), Some(&meta), 4));
    }

    #[test]
    fn newest_files_first() {
        let changes = diff(
            vec![file("/a", 1), file("/b", 3), file("/c", 2)],
            &HashMap::new(),
            0,
        );
        let order: Vec<_> = changes.files.iter().map(|f| f.key()).collect();
        assert_eq!(order, vec!["/b", "/c", "/a"]);
    }

    #[test]
    fn missing_files_are_deleted() {
        let mut stored = HashMap::new();
        stored.insert(
            "/nonexistent/castle/Gone.java".to_string(),
            MetaInfo {
                last_modified: 1,
                document_version: 0,
            },
        );
        let changes = diff(Vec::new(), &stored, 0);
        assert!(changes.files.is_empty());
        assert!(changes.deletions.contains("/nonexistent/castle/Gone.java"));
    }

    #[test]
    fn meta_round_trips_through_index() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let path = src.join("A.java");
        fs::write(&path, "int a;\n").unwrap();

        let config = Config::default();
        let builder = DocumentBuilder::new(LineSchema::new(), &config).unwrap();
        let dir = temp.path().join("index");
        let mut writer = LineWriter::open(&dir).unwrap();
        let source = SourceFile::new("demo", &path);
        writer.add_file(builder.build(&source).unwrap()).unwrap();
        writer.commit().unwrap();

        let provider = SearcherProvider::new();
        let snapshot = provider.acquire(&dir).unwrap().unwrap();
        let meta = read_meta(&snapshot).unwrap();
        assert_eq!(
            meta.get(&source.key()),
            Some(&MetaInfo {
                last_modified: source.last_modified,
                document_version: builder.document_version(),
            })
        );

        let projects = [Project {
            name: "demo".to_string(),
            path: src,
        }];
        let re = extension_pattern(["java"]).unwrap();
        let changes =
            detect_changes(Some(&snapshot), &projects, Some(&re), builder.document_version())
                .unwrap();
        assert!(changes.is_empty());

        let changes = detect_changes(None, &projects, Some(&re), builder.document_version())
            .unwrap();
        assert_eq!(changes.files.len(), 1);
    }
}
