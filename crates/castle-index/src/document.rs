//! Builds per-line documents and the per-file meta document.

use std::{fs, path::Path};

use castle_config::Config;
use tantivy::TantivyDocument;

use crate::{
    IndexError,
    classify::{ClassifiedLine, LineClassifier},
    date::DateFinder,
    discovery::SourceFile,
    element::resolve_elements,
    schema::{LineSchema, META_MARKER, derived_terms},
};

/// Extensions whose lines are split into code and comments.
const CLASSIFIED_EXTENSIONS: &[&str] = &["java"];

/// All documents for one file.
#[derive(Debug)]
pub struct FileDocuments {
    /// One document per line, in line order.
    pub lines: Vec<TantivyDocument>,
    /// The meta document, written after the lines.
    pub meta: TantivyDocument,
}

/// Turns source files into index documents.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    /// Field handles.
    schema: LineSchema,
    /// One classifier per configured indexer, in indexer order.
    classifiers: Vec<(Vec<String>, LineClassifier)>,
    /// Date detector.
    dates: DateFinder,
    /// Loaded configuration.
    config: Config,
    /// Version written to meta documents.
    document_version: i64,
}

impl DocumentBuilder {
    /// Creates a builder for `config`.
    pub fn new(schema: LineSchema, config: &Config) -> Result<Self, IndexError> {
        let classifiers = config
            .indexers
            .iter()
            .map(|rules| {
                LineClassifier::new(rules.line_types.clone())
                    .map(|classifier| (rules.extensions.clone(), classifier))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            schema,
            classifiers,
            dates: DateFinder::new()?,
            config: config.clone(),
            document_version: config.document_version(),
        })
    }

    /// The version written to meta documents.
    pub fn document_version(&self) -> i64 {
        self.document_version
    }

    /// Reads `file` and builds its documents.
    ///
    /// Bytes are decoded as ISO-8859-1, so any file decodes without loss.
    pub fn build(&self, file: &SourceFile) -> Result<FileDocuments, IndexError> {
        let bytes = fs::read(&file.path)?;
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        let key = file.key();
        Ok(FileDocuments {
            lines: self.line_documents(&file.path, &file.project, &text),
            meta: self.meta_document(&key, file.last_modified),
        })
    }

    /// Builds one document per line of `text`.
    pub fn line_documents(&self, path: &Path, project: &str, text: &str) -> Vec<TantivyDocument> {
        let key = path.to_string_lossy();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = extension(&file_name);
        let derived: Vec<String> = self
            .config
            .indexer_for(ext)
            .map(|rules| rules.derived_fields(&file_name))
            .unwrap_or_default()
            .iter()
            .flat_map(|(field, value)| derived_terms(field, value))
            .collect();

        let raw_lines = split_lines(text);
        let classified = self
            .classifier_for(ext)
            .map(|classifier| classifier.classify_all(raw_lines.iter().copied()));
        let elements = classified
            .as_deref()
            .map(resolve_elements)
            .unwrap_or_default();

        let mut documents = Vec::with_capacity(raw_lines.len());
        for (index, line) in raw_lines.iter().enumerate() {
            let mut doc = TantivyDocument::default();
            doc.add_text(self.schema.fullpath, &key);
            doc.add_text(self.schema.path, &key);
            doc.add_text(self.schema.file, &file_name);
            if let Some(Some(element)) = elements.get(index) {
                doc.add_text(self.schema.element, element);
            }
            doc.add_u64(self.schema.line, index as u64 + 1);
            for term in &derived {
                doc.add_text(self.schema.derived, term);
            }
            if !project.is_empty() {
                doc.add_text(self.schema.proj, project);
            }
            if let Some(date) = self.dates.find(line) {
                doc.add_u64(self.schema.date, date);
            }
            if !ext.is_empty() {
                doc.add_text(self.schema.ext, ext);
            }

            match classified.as_ref().and_then(|lines| lines.get(index)) {
                Some(classified) => self.add_classified(&mut doc, classified),
                None => doc.add_text(self.schema.content, line),
            }
            documents.push(doc);
        }
        documents
    }

    /// Builds the meta document for a file.
    pub fn meta_document(&self, key: &str, last_modified: i64) -> TantivyDocument {
        self.versioned_meta_document(key, last_modified, self.document_version)
    }

    /// Builds a meta document with an explicit version.
    ///
    /// Rebuilds rewrite meta records under a version no file matches.
    pub fn versioned_meta_document(
        &self,
        key: &str,
        last_modified: i64,
        version: i64,
    ) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.schema.metadocument, META_MARKER);
        doc.add_text(self.schema.fullpath, key);
        doc.add_text(self.schema.metapath, key);
        doc.add_i64(self.schema.file_last_modified, last_modified);
        doc.add_i64(self.schema.document_version, version);
        doc
    }

    /// Adds the classifier's fields to `doc`.
    fn add_classified(&self, doc: &mut TantivyDocument, line: &ClassifiedLine) {
        doc.add_text(self.schema.content, &line.content);
        if !line.comment.is_empty() {
            doc.add_text(self.schema.comment, &line.comment);
        }
        if !line.line_type.is_empty() {
            doc.add_text(self.schema.line_type, &line.line_type);
        }
        for (field, value) in [
            (self.schema.var, &line.var),
            (self.schema.assign, &line.assign),
            (self.schema.method, &line.method),
        ] {
            if let Some(value) = value {
                doc.add_text(field, value);
            }
        }
    }

    /// The classifier for files with extension `ext`, if they are classified.
    fn classifier_for(&self, ext: &str) -> Option<&LineClassifier> {
        if !CLASSIFIED_EXTENSIONS.contains(&ext) {
            return None;
        }
        self.classifiers
            .iter()
            .find(|(extensions, _)| extensions.iter().any(|e| e == ext))
            .map(|(_, classifier)| classifier)
    }
}

/// The text after the last `.` of a file name, unless the name starts with it.
pub fn extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(i) if i > 0 => &file_name[i + 1..],
        _ => "",
    }
}

/// Splits `text` into lines ended by `\n`, `\r\n` or a lone `\r`.
///
/// A terminator at the very end does not start another line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

#[cfg(test)]
mod test {
    use castle_config::{Config, parse_config_str};
    use tantivy::schema::Value;
    use tempfile::TempDir;

    use super::*;

    fn builder(config: &Config) -> DocumentBuilder {
        DocumentBuilder::new(LineSchema::new(), config).unwrap()
    }

    fn text(doc: &TantivyDocument, field: tantivy::schema::Field) -> Option<String> {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    #[test]
    fn extension_rules() {
        assert_eq!(extension("App.java"), "java");
        assert_eq!(extension("archive.tar.gz"), "gz");
        assert_eq!(extension(".gitignore"), "");
        assert_eq!(extension("Makefile"), "");
    }

    #[test]
    fn one_document_per_line() {
        let config = Config::default();
        let builder = builder(&config);
        let schema = LineSchema::new();
        let docs = builder.line_documents(
            Path::new("/src/App.java"),
            "demo",
            "class App {\n    // greet\n    int count = 5;\n}\n",
        );

        assert_eq!(docs.len(), 4);
        assert_eq!(
            docs[2].get_first(schema.line).and_then(|v| v.as_u64()),
            Some(3)
        );
        assert_eq!(text(&docs[1], schema.comment).as_deref(), Some("// greet"));
        assert_eq!(text(&docs[1], schema.line_type).as_deref(), Some("comment"));
        assert_eq!(text(&docs[2], schema.var).as_deref(), Some("count"));
        assert_eq!(text(&docs[2], schema.element).as_deref(), Some("count"));
        assert_eq!(text(&docs[0], schema.proj).as_deref(), Some("demo"));
        assert_eq!(text(&docs[0], schema.ext).as_deref(), Some("java"));
        assert_eq!(text(&docs[0], schema.fullpath).as_deref(), Some("/src/App.java"));
    }

    #[test]
    fn line_terminators() {
        assert_eq!(split_lines("a\nb\r\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\r\r\nb\r"), vec!["a", "", "b"]);
        assert_eq!(split_lines("\n"), vec![""]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn carriage_returns_end_lines() {
        let builder = builder(&Config::default());
        let schema = LineSchema::new();
        let docs = builder.line_documents(Path::new("/src/A.java"), "", "int a;\rint b;\r");

        assert_eq!(docs.len(), 2);
        assert_eq!(text(&docs[1], schema.content).as_deref(), Some("int b;"));
        assert_eq!(
            docs[1].get_first(schema.line).and_then(|v| v.as_u64()),
            Some(2)
        );
    }

    #[test]
    fn unclassified_files_keep_whole_lines() {
        let raw = parse_config_str("[[indexer]]\next = [\"sql\"]\n", Path::new("c.toml")).unwrap();
        let config = Config::from_raw(raw, None);
        let builder = builder(&config);
        let schema = LineSchema::new();
        let docs = builder.line_documents(Path::new("q.sql"), "", "  select 1 -- note");

        assert_eq!(text(&docs[0], schema.content).as_deref(), Some("  select 1 -- note"));
        assert!(docs[0].get_first(schema.line_type).is_none());
        assert!(docs[0].get_first(schema.proj).is_none());
    }

    #[test]
    fn dates_are_numbers() {
        let builder = builder(&Config::default());
        let schema = LineSchema::new();
        let docs = builder.line_documents(Path::new("A.java"), "", "// 2020-02-29 leap");
        assert_eq!(
            docs[0].get_first(schema.date).and_then(|v| v.as_u64()),
            Some(20200229)
        );
    }

    #[test]
    fn meta_document_records_version() {
        let builder = builder(&Config::default());
        let schema = LineSchema::new();
        let meta = builder.meta_document("/src/A.java", 42);
        assert_eq!(
            meta.get_first(schema.file_last_modified).and_then(|v| v.as_i64()),
            Some(42)
        );
        assert_eq!(
            meta.get_first(schema.document_version).and_then(|v| v.as_i64()),
            Some(builder.document_version())
        );
    }

    #[test]
    fn build_reads_latin1() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Caf.java");
        fs::write(&path, [b'/', b'/', b' ', b'c', b'a', b'f', 0xE9]).unwrap();
        let builder = builder(&Config::default());
        let schema = LineSchema::new();
        let docs = builder.build(&SourceFile::new("p", &path)).unwrap();

        assert_eq!(docs.lines.len(), 1);
        assert_eq!(text(&docs.lines[0], schema.comment).as_deref(), Some("// café"));
    }
}
