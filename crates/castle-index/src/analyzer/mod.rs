//! Text analysis pipelines for the line index.
//!
//! Index-time pipeline for code fields:
//! 1. `CodeTokenizer` - words plus their camelCase and digit parts
//! 2. `LowerCaser`
//! 3. `RemoveLongFilter` - drops tokens longer than 40 bytes
//! 4. `Stemmer` - English stemming
//! 5. `RemoveDuplicates` - one copy of each text per position
//!
//! The query-time pipeline is the same with two synonym filters in front of the lowercaser:
//! abbreviations (case-sensitive) then synonyms (case-insensitive). The `type` field uses a
//! plain lowercased word pipeline so labels like `close brace }` match as written.

mod dedupe;
mod synonyms;
mod tokenizer;

use std::path::Path;

pub use dedupe::RemoveDuplicates;
pub use synonyms::{SynonymFilter, SynonymMap};
use tantivy::{
    Index,
    tokenizer::{
        Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer,
        TokenStream,
    },
};
pub use tokenizer::CodeTokenizer;

/// Name of the code tokenizer registered with Tantivy.
pub const CODE_TOKENIZER: &str = "castle_code";

/// Name of the type-label tokenizer registered with Tantivy.
pub const TYPE_TOKENIZER: &str = "castle_type";

/// Maximum token length in bytes before filtering.
const MAX_TOKEN_LENGTH: usize = 40;

/// Builds the index-time analyzer for code text.
pub fn build_index_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(CodeTokenizer)
        .filter(LowerCaser)
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .filter(Stemmer::new(Language::English))
        .filter(RemoveDuplicates)
        .build()
}

/// Builds the query-time analyzer for code text with the given synonym lists.
pub fn build_query_analyzer(abbreviations: SynonymMap, synonyms: SynonymMap) -> TextAnalyzer {
    TextAnalyzer::builder(CodeTokenizer)
        .filter(SynonymFilter::new(abbreviations))
        .filter(SynonymFilter::new(synonyms))
        .filter(LowerCaser)
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LENGTH))
        .filter(Stemmer::new(Language::English))
        .filter(RemoveDuplicates)
        .build()
}

/// Builds the query-time analyzer, reading synonym files fresh from disk.
///
/// Missing files expand nothing.
pub fn load_query_analyzer(abbreviations: Option<&Path>, synonyms: Option<&Path>) -> TextAnalyzer {
    build_query_analyzer(
        SynonymMap::load_or_empty(abbreviations, false),
        SynonymMap::load_or_empty(synonyms, true),
    )
}

/// Builds the analyzer for line-type labels.
pub fn build_type_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build()
}

/// Registers the index-time analyzers on `index`.
pub fn register_analyzers(index: &Index) {
    let tokenizers = index.tokenizers();
    tokenizers.register(CODE_TOKENIZER, build_index_analyzer());
    tokenizers.register(TYPE_TOKENIZER, build_type_analyzer());
}

/// A token's text and position, as produced by an analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    /// Token text.
    pub text: String,
    /// Token position.
    pub position: usize,
}

/// Runs `analyzer` over `text`, collecting tokens.
pub fn analyze(analyzer: &mut TextAnalyzer, text: &str) -> Vec<AnalyzedToken> {
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while stream.advance() {
        let token = stream.token();
        tokens.push(AnalyzedToken {
            text: token.text.clone(),
            position: token.position,
        });
    }
    tokens
}
