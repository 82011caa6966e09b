//! Search over the line index.
//!
//! A search composes the parsed query with ranking helpers before executing it:
//! - the query itself, required
//! - lines whose type is not a comment, optional at 0.5, so commented-out code sinks
//! - lines whose type is not boilerplate (imports, braces, `else`, ...), optional at 0.75
//! - the caller's extra query, optional, such as a boost for the open file
//!
//! Meta documents never match.

mod collector;
mod compile;
mod summary;

use std::{path::PathBuf, sync::Arc, time::Duration};

use castle_config::{Config, Operator, SearchSettings};
use castle_query::DefaultOperator;
pub use collector::{PageFruit, ScoredDoc, SearchAfterCollector};
pub use compile::QueryCompiler;
use serde::Serialize;
pub use summary::{INDEX_NOT_READY, INVALID_QUERY, SEARCH_FAILED, total_results_message};
use tantivy::{
    TantivyDocument, Term,
    query::{BooleanQuery, BoostQuery, Occur, Query, TermQuery},
    schema::{Field, IndexRecordOption, Value},
};

use crate::{
    analyzer::load_query_analyzer,
    error::IndexError,
    provider::{IndexSnapshot, SearcherProvider},
    schema::{LineSchema, META_MARKER},
};

/// Type query for lines that are not comments.
const NOT_COMMENTED_OUT: &str = "*:* AND NOT comment";

/// Type query for lines that are not boilerplate.
const NOT_LOW_PRIORITY: &str = "*:* AND NOT import AND NOT empty AND NOT \"close brace\" \
     AND NOT symbols AND NOT \"else line\" AND NOT \"return null\" AND NOT \"return void\"";

/// Boost of the user's query.
const PRIMARY_BOOST: f32 = 1.0;
/// Boost for lines outside comments.
const NOT_COMMENTED_OUT_BOOST: f32 = 0.5;
/// Boost for lines that are not boilerplate.
const NOT_LOW_PRIORITY_BOOST: f32 = 0.75;
/// Boost for hits in the file the caller is looking at.
pub const CURRENT_FILE_BOOST: f32 = 5.0;

/// An additional optional clause supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraQuery {
    /// Ranks hits in the file with this full path higher.
    File {
        /// Full path of the file.
        path: String,
        /// Boost applied to its lines.
        boost: f32,
    },
}

impl ExtraQuery {
    /// Boosts the file at `path` by [`CURRENT_FILE_BOOST`].
    pub fn current_file(path: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            boost: CURRENT_FILE_BOOST,
        }
    }

    /// Builds the Tantivy query.
    fn to_query(&self, schema: &LineSchema) -> Box<dyn Query> {
        match self {
            Self::File { path, boost } => Box::new(BoostQuery::new(
                Box::new(TermQuery::new(
                    Term::from_field_text(schema.fullpath, path),
                    IndexRecordOption::Basic,
                )),
                *boost,
            )),
        }
    }
}

/// One search to run.
///
/// Equality ignores `delay`, so a repeat of the same request is recognized however it
/// was scheduled.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Query text.
    pub text: String,
    /// Hits per page.
    pub limit: usize,
    /// Additional optional clause.
    pub extra: Option<ExtraQuery>,
    /// Operator between clauses without an explicit one.
    pub operator: Operator,
    /// Whether unfielded terms also match comment text.
    pub include_comments: bool,
    /// Index directory to search.
    pub location: PathBuf,
    /// Wait before running; zero runs immediately and always reruns.
    pub delay: Duration,
}

impl PartialEq for SearchRequest {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
            && self.limit == other.limit
            && self.extra == other.extra
            && self.operator == other.operator
            && self.include_comments == other.include_comments
            && self.location == other.location
    }
}

impl SearchRequest {
    /// A request for `text` against `location` with the configured search defaults.
    pub fn new(text: impl Into<String>, location: PathBuf, config: &Config) -> Self {
        Self {
            text: text.into(),
            limit: config.settings.default_hit_limit,
            extra: None,
            operator: config.search.default_operator,
            include_comments: config.search.include_comments,
            location,
            delay: Duration::ZERO,
        }
    }
}

/// Position after the last hit delivered, for fetching the next page.
///
/// Only meaningful against the snapshot that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    /// Last hit delivered.
    pub last: ScoredDoc,
    /// Hits delivered so far, across pages.
    pub delivered: usize,
}

/// One hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEntry {
    /// Position in the result list, starting at 1 and continuing across pages.
    pub index: usize,
    /// File name.
    pub file: String,
    /// Enclosing method or type; empty when unknown.
    pub element: String,
    /// 1-based line number.
    pub line: u64,
    /// Trimmed code, followed by the comment text when there is one.
    pub content: String,
    /// Line type label; empty when unclassified.
    #[serde(rename = "type")]
    pub line_type: String,
    /// Full path.
    pub path: String,
    /// File extension.
    pub extension: String,
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    /// Results (possibly none) are available.
    Completed,
    /// The search failed; previous results should stay in place.
    Failed,
}

/// The outcome of a search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Hits, best first.
    pub entries: Vec<ResultEntry>,
    /// Summary for display.
    pub message: String,
    /// False until the index has been created.
    pub index_exists: bool,
    /// Whether results are available.
    pub status: SearchStatus,
    /// Matching lines, capped at the count threshold.
    pub total_hits: usize,
    /// Continuation point for the next page.
    #[serde(skip)]
    pub cursor: Option<Cursor>,
}

impl SearchResult {
    /// The result while no index exists yet.
    pub fn not_ready() -> Self {
        Self {
            entries: Vec::new(),
            message: INDEX_NOT_READY.to_string(),
            index_exists: false,
            status: SearchStatus::Completed,
            total_hits: 0,
            cursor: None,
        }
    }

    /// A failed search with a user-facing message.
    pub fn failed(message: &str) -> Self {
        Self {
            entries: Vec::new(),
            message: message.to_string(),
            index_exists: true,
            status: SearchStatus::Failed,
            total_hits: 0,
            cursor: None,
        }
    }
}

/// Maps the configured operator to the parser's.
pub fn default_operator(operator: Operator) -> DefaultOperator {
    match operator {
        Operator::And => DefaultOperator::And,
        Operator::Or => DefaultOperator::Or,
    }
}

/// Runs searches against indexes served by a [`SearcherProvider`].
pub struct SearchEngine {
    /// Reader registry.
    provider: Arc<SearcherProvider>,
    /// Synonym files and defaults.
    settings: SearchSettings,
    /// Hits counted exactly before totals become approximate.
    hits_threshold: usize,
}

impl SearchEngine {
    /// Creates an engine with the search settings of `config`.
    pub fn new(provider: Arc<SearcherProvider>, config: &Config) -> Self {
        Self {
            provider,
            settings: config.search.clone(),
            hits_threshold: config.settings.total_hits_threshold.max(1),
        }
    }

    /// The reader registry.
    pub fn provider(&self) -> &Arc<SearcherProvider> {
        &self.provider
    }

    /// Runs `request`, converting failures into a result carrying a message.
    pub fn run(&self, request: &SearchRequest, cursor: Option<&Cursor>) -> SearchResult {
        match self.search(request, cursor) {
            Ok(result) => result,
            Err(e) if e.is_query_error() => {
                log::debug!("invalid query {:?}: {e}", request.text);
                SearchResult::failed(INVALID_QUERY)
            }
            Err(e) => {
                log::warn!("search failed: {e}");
                SearchResult::failed(SEARCH_FAILED)
            }
        }
    }

    /// Runs `request`, continuing after `cursor` when given.
    pub fn search(
        &self,
        request: &SearchRequest,
        cursor: Option<&Cursor>,
    ) -> Result<SearchResult, IndexError> {
        let Some(snapshot) = self.provider.acquire(&request.location)? else {
            return Ok(SearchResult::not_ready());
        };

        let analyzer = load_query_analyzer(
            self.settings.abbreviations_file.as_deref(),
            self.settings.synonyms_file.as_deref(),
        );
        let mut compiler = QueryCompiler::new(
            &snapshot.index,
            snapshot.schema.clone(),
            analyzer,
            default_operator(request.operator),
            request.include_comments,
        );

        let Some(primary) = compiler.parse(&request.text)? else {
            return self.assemble(&snapshot, request, cursor, PageFruit::default());
        };

        let mut clauses: Vec<(Occur, Box<dyn Query>)> =
            vec![(Occur::Must, Box::new(BoostQuery::new(primary, PRIMARY_BOOST)))];
        for (text, boost) in [
            (NOT_COMMENTED_OUT, NOT_COMMENTED_OUT_BOOST),
            (NOT_LOW_PRIORITY, NOT_LOW_PRIORITY_BOOST),
        ] {
            if let Some(query) = compiler.parse_type_query(text)? {
                clauses.push((Occur::Should, Box::new(BoostQuery::new(query, boost))));
            }
        }
        if let Some(extra) = &request.extra {
            clauses.push((Occur::Should, extra.to_query(&snapshot.schema)));
        }
        clauses.push((
            Occur::MustNot,
            Box::new(TermQuery::new(
                Term::from_field_text(snapshot.schema.metadocument, META_MARKER),
                IndexRecordOption::Basic,
            )),
        ));
        let query = BooleanQuery::new(clauses);

        let collector = SearchAfterCollector::new(request.limit, cursor.map(|c| c.last));
        let page = snapshot
            .searcher
            .search(&query, &collector)
            .map_err(|e| IndexError::read(&e))?;

        self.assemble(&snapshot, request, cursor, page)
    }

    /// Loads stored fields for a page of hits and builds the result.
    fn assemble(
        &self,
        snapshot: &IndexSnapshot,
        request: &SearchRequest,
        cursor: Option<&Cursor>,
        page: PageFruit,
    ) -> Result<SearchResult, IndexError> {
        let limit = request.limit.max(1);
        let exact = page.total <= self.hits_threshold;
        let total_hits = page.total.min(self.hits_threshold);
        let message = total_results_message(total_hits, limit, exact);

        let offset = cursor.map_or(0, |c| c.delivered);
        let schema = &snapshot.schema;
        let mut entries = Vec::with_capacity(page.hits.len());
        for (i, hit) in page.hits.iter().enumerate() {
            let doc: TantivyDocument = snapshot
                .searcher
                .doc(hit.address)
                .map_err(|e| IndexError::read(&e))?;
            entries.push(result_entry(schema, &doc, offset + i + 1));
        }

        let cursor = page.hits.last().map(|last| Cursor {
            last: *last,
            delivered: offset + page.hits.len(),
        });

        Ok(SearchResult {
            entries,
            message,
            index_exists: true,
            status: SearchStatus::Completed,
            total_hits,
            cursor,
        })
    }
}

/// Maps a stored line document to a result entry.
fn result_entry(schema: &LineSchema, doc: &TantivyDocument, index: usize) -> ResultEntry {
    let text = |field: Field| {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let mut content = text(schema.content).trim().to_string();
    let comment = text(schema.comment);
    if !comment.is_empty() {
        content.push(' ');
        content.push_str(&comment);
    }

    ResultEntry {
        index,
        file: text(schema.file),
        element: text(schema.element),
        line: doc
            .get_first(schema.line)
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        content,
        line_type: text(schema.line_type),
        path: text(schema.fullpath),
        extension: text(schema.ext),
    }
}
