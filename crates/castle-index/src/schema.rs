//! Index schema for per-line documents and per-file meta records.
//!
//! Every physical source line becomes one document. Each indexed file also gets one meta
//! document, marked by `metadocument`, that records the file's last-modified time and the
//! document version it was written under.

use tantivy::schema::{
    FAST, Field, INDEXED, IndexRecordOption, NumericOptions, STORED, STRING, Schema,
    TextFieldIndexing, TextOptions,
};

use crate::analyzer::{CODE_TOKENIZER, TYPE_TOKENIZER};

/// Field names as they appear in the schema and in queries.
pub mod names {
    /// Exact full path; delete key for every document of a file.
    pub const FULLPATH: &str = "fullpath";
    /// Tokenized full path.
    pub const PATH: &str = "path";
    /// File name.
    pub const FILE: &str = "file";
    /// Enclosing method or type.
    pub const ELEMENT: &str = "element";
    /// Project name.
    pub const PROJ: &str = "proj";
    /// One-based line number.
    pub const LINE: &str = "line";
    /// First date on the line as yyyyMMdd.
    pub const DATE: &str = "date";
    /// File extension.
    pub const EXT: &str = "ext";
    /// Code with comments removed.
    pub const CONTENT: &str = "content";
    /// Comment text.
    pub const COMMENT: &str = "comment";
    /// Line type label.
    pub const TYPE: &str = "type";
    /// Declared or assigned variable.
    pub const VAR: &str = "var";
    /// Declared type of a declaration or assignment.
    pub const ASSIGN: &str = "assign";
    /// Invoked or declared method.
    pub const METHOD: &str = "method";
    /// Filename-pattern fields, encoded as `key:word`.
    pub const DERIVED: &str = "derived";
    /// Marker present only on meta documents.
    pub const METADOCUMENT: &str = "metadocument";
    /// Full path of a meta document.
    pub const METAPATH: &str = "metapath";
    /// File last-modified time in milliseconds.
    pub const FILE_LAST_MODIFIED: &str = "fileLastModified";
    /// Document version a meta document was written under.
    pub const DOCUMENT_VERSION: &str = "documentVersion";
}

/// Value of the `metadocument` field on meta documents.
pub const META_MARKER: &str = "meta";

/// Handles to all fields in the index schema.
#[derive(Debug, Clone)]
pub struct LineSchema {
    /// The underlying Tantivy schema.
    schema: Schema,
    /// Exact full path.
    pub fullpath: Field,
    /// Tokenized full path, not stored.
    pub path: Field,
    /// File name.
    pub file: Field,
    /// Enclosing element name.
    pub element: Field,
    /// Project name.
    pub proj: Field,
    /// Line number.
    pub line: Field,
    /// Date token.
    pub date: Field,
    /// Extension.
    pub ext: Field,
    /// Content text.
    pub content: Field,
    /// Comment text.
    pub comment: Field,
    /// Line type label.
    pub line_type: Field,
    /// Variable name.
    pub var: Field,
    /// Declared type of a declaration or assignment.
    pub assign: Field,
    /// Method name.
    pub method: Field,
    /// Derived `key:word` terms.
    pub derived: Field,
    /// Meta marker.
    pub metadocument: Field,
    /// Meta document path, used by the change detector.
    pub metapath: Field,
    /// Last-modified time of the file a meta document describes.
    pub file_last_modified: Field,
    /// Document version of a meta document.
    pub document_version: Field,
}

/// Text options for a code field.
fn code_text(stored: bool) -> TextOptions {
    let options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(CODE_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );
    if stored { options.set_stored() } else { options }
}

impl LineSchema {
    /// Creates the schema with all fields configured.
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let fullpath = builder.add_text_field(names::FULLPATH, STRING | STORED);
        let path = builder.add_text_field(names::PATH, code_text(false));
        let file = builder.add_text_field(names::FILE, code_text(true));
        let element = builder.add_text_field(names::ELEMENT, code_text(true));
        let proj = builder.add_text_field(names::PROJ, code_text(true));

        let line = builder.add_u64_field(names::LINE, INDEXED | STORED | FAST);
        let date = builder.add_u64_field(names::DATE, INDEXED | STORED);
        let ext = builder.add_text_field(names::EXT, STRING | STORED);

        let content = builder.add_text_field(names::CONTENT, code_text(true));
        let comment = builder.add_text_field(names::COMMENT, code_text(true));

        // Type labels keep stop-words and skip stemming so phrases match as written.
        let type_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer(TYPE_TOKENIZER)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();
        let line_type = builder.add_text_field(names::TYPE, type_options);

        let var = builder.add_text_field(names::VAR, code_text(true));
        let assign = builder.add_text_field(names::ASSIGN, code_text(true));
        let method = builder.add_text_field(names::METHOD, code_text(true));
        let derived = builder.add_text_field(names::DERIVED, STRING);

        let metadocument = builder.add_text_field(names::METADOCUMENT, STRING);
        let metapath = builder.add_text_field(names::METAPATH, STRING | STORED);
        let file_last_modified = builder.add_i64_field(
            names::FILE_LAST_MODIFIED,
            NumericOptions::default().set_fast().set_stored(),
        );
        let document_version = builder.add_i64_field(
            names::DOCUMENT_VERSION,
            NumericOptions::default().set_fast().set_stored(),
        );

        Self {
            schema: builder.build(),
            fullpath,
            path,
            file,
            element,
            proj,
            line,
            date,
            ext,
            content,
            comment,
            line_type,
            var,
            assign,
            method,
            derived,
            metadocument,
            metapath,
            file_last_modified,
            document_version,
        }
    }

    /// Returns the underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Resolves a query field name to a tokenized text field.
    ///
    /// `line`, `date`, `ext`, `fullpath` and derived keys are handled separately by the
    /// query compiler because they are not analyzed.
    pub fn text_field(&self, name: &str) -> Option<Field> {
        let field = match name {
            names::CONTENT => self.content,
            names::COMMENT => self.comment,
            names::TYPE => self.line_type,
            names::FILE => self.file,
            names::PATH => self.path,
            names::ELEMENT => self.element,
            names::PROJ => self.proj,
            names::VAR => self.var,
            names::ASSIGN => self.assign,
            names::METHOD => self.method,
            _ => return None,
        };
        Some(field)
    }
}

impl Default for LineSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a derived field as terms of the `derived` field, one per word of the value.
///
/// Terms read `key:word`, lowercased, so `module:core` finds files whose pattern captured
/// a value containing the word `core`.
pub fn derived_terms(key: &str, value: &str) -> Vec<String> {
    let key = key.to_lowercase();
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| format!("{key}:{}", word.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod test {
    use tantivy::schema::FieldType;

    use super::*;

    #[test]
    fn schema_has_all_fields() {
        let schema = LineSchema::new();
        for name in [
            names::FULLPATH,
            names::PATH,
            names::FILE,
            names::ELEMENT,
            names::PROJ,
            names::LINE,
            names::DATE,
            names::EXT,
            names::CONTENT,
            names::COMMENT,
            names::TYPE,
            names::VAR,
            names::ASSIGN,
            names::METHOD,
            names::DERIVED,
            names::METADOCUMENT,
            names::METAPATH,
            names::FILE_LAST_MODIFIED,
            names::DOCUMENT_VERSION,
        ] {
            assert!(schema.schema().get_field(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn fullpath_is_raw_and_stored() {
        let schema = LineSchema::new();
        let entry = schema.schema().get_field_entry(schema.fullpath);
        assert!(entry.is_indexed());
        assert!(entry.is_stored());
        if let FieldType::Str(opts) = entry.field_type() {
            let indexing = opts.get_indexing_options().unwrap();
            assert_eq!(indexing.tokenizer(), "raw");
        } else {
            panic!("fullpath should be text");
        }
    }

    #[test]
    fn path_is_searchable_but_not_stored() {
        let schema = LineSchema::new();
        let entry = schema.schema().get_field_entry(schema.path);
        assert!(entry.is_indexed());
        assert!(!entry.is_stored());
    }

    #[test]
    fn type_uses_label_tokenizer() {
        let schema = LineSchema::new();
        let entry = schema.schema().get_field_entry(schema.line_type);
        if let FieldType::Str(opts) = entry.field_type() {
            let indexing = opts.get_indexing_options().unwrap();
            assert_eq!(indexing.tokenizer(), TYPE_TOKENIZER);
            assert_eq!(
                indexing.index_option(),
                IndexRecordOption::WithFreqsAndPositions
            );
        } else {
            panic!("type should be text");
        }
    }

    #[test]
    fn meta_numbers_are_fast() {
        let schema = LineSchema::new();
        for field in [schema.file_last_modified, schema.document_version] {
            let entry = schema.schema().get_field_entry(field);
            assert!(entry.is_fast());
        }
    }

    #[test]
    fn text_field_resolves_query_names() {
        let schema = LineSchema::new();
        assert_eq!(schema.text_field("type"), Some(schema.line_type));
        assert_eq!(schema.text_field("content"), Some(schema.content));
        assert_eq!(schema.text_field("line"), None);
    }

    #[test]
    fn derived_terms_split_values() {
        assert_eq!(derived_terms("Module", "Core"), vec!["module:core"]);
        assert_eq!(
            derived_terms("area", "order-Service"),
            vec!["area:order", "area:service"]
        );
        assert!(derived_terms("area", "--").is_empty());
    }
}
