//! Per-line code index for castle.
//!
//! Every physical line of a tracked source file is one Tantivy document carrying the
//! line's code, its comment text, a type label inferred by the classifier, and the
//! file's metadata. This crate handles:
//! - Line classification and document building
//! - Change detection against per-file meta records
//! - Incremental indexing with group commits and cooperative cancellation
//! - Shared, refreshable searchers per index directory
//! - Query compilation, ranking and "search after" pagination
//! - Background jobs that serialize indexing and searching
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use castle_config::Config;
//! use castle_index::{
//!     CancelToken, Indexer, SearchEngine, SearchRequest, SearcherProvider, SilentListener,
//! };
//!
//! let config = Config::load_or_default(".".as_ref());
//! let provider = Arc::new(SearcherProvider::new());
//! let mut indexer =
//!     Indexer::new(&config, "./index".into(), Arc::clone(&provider)).unwrap();
//! indexer.incremental(&CancelToken::new(), &SilentListener).unwrap();
//!
//! let engine = SearchEngine::new(provider, &config);
//! let result = engine.run(&SearchRequest::new("saveUser", "./index".into(), &config), None);
//! println!("{}", result.message);
//! ```

#![warn(missing_docs)]

mod analyzer;
mod cancel;
mod changes;
mod classify;
mod date;
mod discovery;
mod document;
mod element;
mod error;
mod indexer;
mod jobs;
mod location;
mod provider;
mod schema;
mod search;
mod status;
mod writer;

pub use analyzer::{
    CodeTokenizer, SynonymMap, build_index_analyzer, build_query_analyzer, load_query_analyzer,
    register_analyzers,
};
pub use cancel::CancelToken;
pub use changes::{ChangeSet, MetaInfo, detect_changes, needs_reindex, read_meta};
pub use classify::{
    COMMENT_TYPE, ClassifiedLine, ClassifierState, CommentMode, EMPTY_LINE_TYPE, LineClassifier,
};
pub use discovery::{SourceFile, discover_files, path_key, should_index};
pub use document::{DocumentBuilder, FileDocuments};
pub use error::IndexError;
pub use indexer::{
    IndexListener, IndexOutcome, Indexer, SilentListener, done_message, format_duration,
};
pub use jobs::{
    INDEX_FAILED, IndexJob, IndexReport, JobStatus, PendingWork, SearchDecision, SearchJob,
    SearchListener, should_schedule,
};
pub use location::{index_directory, searcher_directory, user_index_directory};
pub use provider::{IndexSnapshot, SearcherProvider};
pub use schema::{LineSchema, META_MARKER};
pub use search::{
    CURRENT_FILE_BOOST, Cursor, ExtraQuery, INDEX_NOT_READY, INVALID_QUERY, ResultEntry,
    SEARCH_FAILED, SearchEngine, SearchRequest, SearchResult, SearchStatus,
    total_results_message,
};
pub use status::{IndexStatus, detect_index_status, index_exists, index_status};
pub use writer::LineWriter;
