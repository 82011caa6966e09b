//! Query-time synonym expansion.
//!
//! Synonym lists use the Solr text format:
//!
//! ```text
//! # equivalent terms expand to each other
//! customer, client, cust
//! # explicit mappings replace the left side with the right side
//! esht => escheat
//! ```
//!
//! Only single-word entries are supported. The filter runs on queries only, so lists can be
//! edited without reindexing.

use std::{
    collections::{HashMap, VecDeque},
    fs, io,
    path::Path,
    sync::Arc,
};

use tantivy::tokenizer::{Token, TokenFilter, TokenStream, Tokenizer};

/// Expansion for one source term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Expansion {
    /// Terms emitted at the source term's position.
    replacements: Vec<String>,
    /// Whether the source term itself is kept.
    keep_original: bool,
}

/// A parsed synonym list.
#[derive(Debug, Clone, Default)]
pub struct SynonymMap {
    /// Source term (lowercased when `ignore_case`) to expansion.
    entries: HashMap<String, Expansion>,
    /// Whether lookups ignore case.
    ignore_case: bool,
}

impl SynonymMap {
    /// An empty map that expands nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads a synonym file.
    pub fn load(path: &Path, ignore_case: bool) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::parse(&contents, ignore_case))
    }

    /// Reads a synonym file, returning an empty map if the file is absent or unreadable.
    pub fn load_or_empty(path: Option<&Path>, ignore_case: bool) -> Self {
        let Some(path) = path else {
            return Self::empty();
        };
        match Self::load(path, ignore_case) {
            Ok(map) => map,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::empty(),
            Err(e) => {
                log::warn!("could not read synonyms from {}: {e}", path.display());
                Self::empty()
            }
        }
    }

    /// Parses Solr-format synonym text.
    pub fn parse(contents: &str, ignore_case: bool) -> Self {
        let mut map = Self {
            entries: HashMap::new(),
            ignore_case,
        };

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((lhs, rhs)) = line.split_once("=>") {
                let sources = map.terms(lhs);
                let targets = map.terms(rhs);
                for source in &sources {
                    let entry = map.entries.entry(source.clone()).or_default();
                    entry.keep_original |= targets.contains(source);
                    for target in targets.iter().filter(|t| *t != source) {
                        push_unique(&mut entry.replacements, target);
                    }
                }
            } else {
                let group = map.terms(line);
                for term in &group {
                    let entry = map.entries.entry(term.clone()).or_insert_with(|| Expansion {
                        keep_original: true,
                        ..Expansion::default()
                    });
                    entry.keep_original = true;
                    for other in group.iter().filter(|o| *o != term) {
                        push_unique(&mut entry.replacements, other);
                    }
                }
            }
        }

        map
    }

    /// Splits a comma-separated side into single-word terms.
    fn terms(&self, side: &str) -> Vec<String> {
        side.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .filter(|t| {
                let single = !t.contains(char::is_whitespace);
                if !single {
                    log::debug!("ignoring multi-word synonym '{t}'");
                }
                single
            })
            .map(|t| self.normalize(t))
            .collect()
    }

    /// Applies case folding when the map ignores case.
    fn normalize(&self, term: &str) -> String {
        if self.ignore_case {
            term.to_lowercase()
        } else {
            term.to_string()
        }
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the expansion for a token text.
    fn lookup(&self, text: &str) -> Option<&Expansion> {
        if self.entries.is_empty() {
            return None;
        }
        if self.ignore_case {
            self.entries.get(&text.to_lowercase())
        } else {
            self.entries.get(text)
        }
    }
}

/// Appends `value` unless already present.
fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// Token filter that injects synonyms at the position of the matched token.
#[derive(Clone)]
pub struct SynonymFilter {
    /// The synonym list.
    map: Arc<SynonymMap>,
}

impl SynonymFilter {
    /// Creates a filter over `map`.
    pub fn new(map: SynonymMap) -> Self {
        Self { map: Arc::new(map) }
    }
}

impl TokenFilter for SynonymFilter {
    type Tokenizer<T: Tokenizer> = SynonymTokenizer<T>;

    fn transform<T: Tokenizer>(self, tokenizer: T) -> SynonymTokenizer<T> {
        SynonymTokenizer {
            inner: tokenizer,
            map: self.map,
        }
    }
}

/// Tokenizer wrapper produced by [`SynonymFilter`].
#[derive(Clone)]
pub struct SynonymTokenizer<T> {
    /// Wrapped tokenizer.
    inner: T,
    /// The synonym list.
    map: Arc<SynonymMap>,
}

impl<T: Tokenizer> Tokenizer for SynonymTokenizer<T> {
    type TokenStream<'a> = SynonymTokenStream<'a, T::TokenStream<'a>>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        SynonymTokenStream {
            tail: self.inner.token_stream(text),
            map: self.map.as_ref(),
            pending: VecDeque::new(),
            token: Token::default(),
        }
    }
}

/// Token stream that emits queued synonyms before pulling from the wrapped stream.
pub struct SynonymTokenStream<'a, T> {
    /// Wrapped stream.
    tail: T,
    /// The synonym list.
    map: &'a SynonymMap,
    /// Synonyms waiting to be emitted.
    pending: VecDeque<Token>,
    /// Current token.
    token: Token,
}

impl<T: TokenStream> TokenStream for SynonymTokenStream<'_, T> {
    fn advance(&mut self) -> bool {
        if let Some(next) = self.pending.pop_front() {
            self.token = next;
            return true;
        }
        if !self.tail.advance() {
            return false;
        }

        let source = self.tail.token().clone();
        let Some(expansion) = self.map.lookup(&source.text) else {
            self.token = source;
            return true;
        };

        for replacement in &expansion.replacements {
            self.pending.push_back(Token {
                text: replacement.clone(),
                ..source.clone()
            });
        }
        if expansion.keep_original {
            self.token = source;
        } else if let Some(first) = self.pending.pop_front() {
            self.token = first;
        } else {
            self.token = source;
        }
        true
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

#[cfg(test)]
mod tests {
    use tantivy::tokenizer::{TextAnalyzer, WhitespaceTokenizer};

    use super::*;

    fn run(map: SynonymMap, text: &str) -> Vec<(String, usize)> {
        let mut analyzer = TextAnalyzer::builder(WhitespaceTokenizer::default())
            .filter(SynonymFilter::new(map))
            .build();
        let mut stream = analyzer.token_stream(text);
        let mut out = Vec::new();
        while stream.advance() {
            let token = stream.token();
            out.push((token.text.clone(), token.position));
        }
        out
    }

    #[test]
    fn equivalence_expands_in_place() {
        let map = SynonymMap::parse("customer, client\n", true);
        assert_eq!(
            run(map, "find Client"),
            vec![
                ("find".to_string(), 0),
                ("Client".to_string(), 1),
                ("customer".to_string(), 1),
            ]
        );
    }

    #[test]
    fn explicit_mapping_replaces_source() {
        let map = SynonymMap::parse("esht => escheat, escheatment\n", false);
        assert_eq!(
            run(map, "esht"),
            vec![("escheat".to_string(), 0), ("escheatment".to_string(), 0)]
        );
    }

    #[test]
    fn case_sensitive_map_ignores_other_case() {
        let map = SynonymMap::parse("PK => primary\n", false);
        assert_eq!(run(map, "pk"), vec![("pk".to_string(), 0)]);
    }

    #[test]
    fn comments_blank_and_multiword_lines_are_skipped() {
        let map = SynonymMap::parse("# note\n\nhash map, hashmap\n", true);
        assert!(map.lookup("hashmap").is_none_or(|e| e.replacements.is_empty()));
        assert!(map.lookup("hash map").is_none());
    }

    #[test]
    fn missing_file_is_empty() {
        let map = SynonymMap::load_or_empty(Some(Path::new("/nonexistent/synonyms.txt")), true);
        assert!(map.is_empty());
    }
}
