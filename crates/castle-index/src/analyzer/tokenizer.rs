//! Tokenizer for source code text.
//!
//! Splits text into words made of letters, digits and underscores. Each word is emitted as
//! written, followed by its camelCase and digit parts at the same position, so
//! `getHTTPResponse2` is findable as `gethttpresponse2`, `http`, `response` or `2`.

use std::mem;

use tantivy::tokenizer::{Token, TokenStream, Tokenizer};

/// Tokenizer that keeps whole identifiers and adds their camelCase parts.
#[derive(Clone, Default)]
pub struct CodeTokenizer;

impl Tokenizer for CodeTokenizer {
    type TokenStream<'a> = CodeTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        CodeTokenStream {
            tokens: tokenize_code(text),
            index: 0,
            token: Token::default(),
        }
    }
}

/// Token stream over precomputed tokens.
pub struct CodeTokenStream {
    /// Tokens in emission order.
    tokens: Vec<Token>,
    /// Next token to emit.
    index: usize,
    /// Current token.
    token: Token,
}

impl TokenStream for CodeTokenStream {
    fn advance(&mut self) -> bool {
        let Some(next) = self.tokens.get_mut(self.index) else {
            return false;
        };
        self.token = mem::take(next);
        self.index += 1;
        true
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

/// Returns true for characters that belong to a word.
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Splits `text` into word tokens plus their same-position parts.
fn tokenize_code(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut position = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        if !is_word_char(ch) {
            continue;
        }

        let mut end = start + ch.len_utf8();
        while let Some(&(idx, next)) = chars.peek() {
            if !is_word_char(next) {
                break;
            }
            end = idx + next.len_utf8();
            chars.next();
        }

        let word = &text[start..end];
        if is_possessive_suffix(text, start, word) {
            continue;
        }

        tokens.push(make_token(word, start, end, position));
        let mut seen: Vec<&str> = vec![word];
        for (part_start, part_end) in split_parts(word) {
            let part = &word[part_start..part_end];
            if seen.contains(&part) {
                continue;
            }
            seen.push(part);
            tokens.push(make_token(part, start + part_start, start + part_end, position));
        }
        position += 1;
    }

    tokens
}

/// True for the `s` of an English possessive such as `user's`.
fn is_possessive_suffix(text: &str, start: usize, word: &str) -> bool {
    if !matches!(word, "s" | "S") {
        return false;
    }
    let mut before = text[..start].chars().rev();
    matches!(before.next(), Some('\'' | '\u{2019}')) && before.next().is_some_and(is_word_char)
}

/// Builds a token.
fn make_token(text: &str, from: usize, to: usize, position: usize) -> Token {
    Token {
        offset_from: from,
        offset_to: to,
        position,
        text: text.to_string(),
        position_length: 1,
    }
}

/// Byte ranges of the camelCase and digit parts of `word`.
///
/// Parts are runs of lowercase letters, a capital followed by lowercase letters, runs of
/// capitals not followed by a lowercase letter (`SQL` in `SQLException`), and digit runs.
fn split_parts(word: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = word.char_indices().collect();
    let n = chars.len();
    let byte_at = |i: usize| chars.get(i).map_or(word.len(), |(b, _)| *b);
    let is_lower = |i: usize| chars.get(i).is_some_and(|(_, c)| c.is_lowercase());
    let is_upper = |i: usize| chars.get(i).is_some_and(|(_, c)| c.is_uppercase());
    let is_digit = |i: usize| chars.get(i).is_some_and(|(_, c)| c.is_ascii_digit());

    let mut parts = Vec::new();
    let mut i = 0;
    while i < n {
        let mut j = i;
        if is_lower(i) || (is_upper(i) && is_lower(i + 1)) {
            j += 1;
            while is_lower(j) {
                j += 1;
            }
        } else if is_upper(i) {
            while is_upper(j) && !is_lower(j + 1) {
                j += 1;
            }
        } else if is_digit(i) {
            while is_digit(j) {
                j += 1;
            }
        }

        if j > i {
            parts.push((byte_at(i), byte_at(j)));
            i = j;
        } else {
            i += 1;
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(text: &str) -> Vec<(String, usize)> {
        let mut tokenizer = CodeTokenizer;
        let mut stream = tokenizer.token_stream(text);
        let mut out = Vec::new();
        while stream.advance() {
            let token = stream.token();
            out.push((token.text.clone(), token.position));
        }
        out
    }

    fn parts(word: &str) -> Vec<&str> {
        split_parts(word)
            .into_iter()
            .map(|(s, e)| &word[s..e])
            .collect()
    }

    #[test]
    fn camel_case_parts() {
        assert_eq!(parts("getUserName"), vec!["get", "User", "Name"]);
        assert_eq!(parts("SQLException"), vec!["SQL", "Exception"]);
        assert_eq!(parts("getHTTPResponse2"), vec!["get", "HTTP", "Response", "2"]);
        assert_eq!(parts("MAX_VALUE"), vec!["MAX", "VALUE"]);
        assert_eq!(parts("x"), vec!["x"]);
    }

    #[test]
    fn parts_share_the_word_position() {
        assert_eq!(
            texts("int userCount = 5;"),
            vec![
                ("int".to_string(), 0),
                ("userCount".to_string(), 1),
                ("user".to_string(), 1),
                ("Count".to_string(), 1),
                ("5".to_string(), 2),
            ]
        );
    }

    #[test]
    fn plain_word_has_no_duplicate_part() {
        assert_eq!(texts("Test"), vec![("Test".to_string(), 0)]);
    }

    #[test]
    fn punctuation_separates_words() {
        let words: Vec<String> = texts("a.b(c)").into_iter().map(|(t, _)| t).collect();
        assert_eq!(words, vec!["a", "b", "c"]);
    }

    #[test]
    fn possessive_s_is_dropped() {
        let words: Vec<String> = texts("the user's name").into_iter().map(|(t, _)| t).collect();
        assert_eq!(words, vec!["the", "user", "name"]);
    }

    #[test]
    fn contraction_keeps_suffix() {
        let words: Vec<String> = texts("don't").into_iter().map(|(t, _)| t).collect();
        assert_eq!(words, vec!["don", "t"]);
    }

    #[test]
    fn offsets_cover_the_word() {
        let mut tokenizer = CodeTokenizer;
        let text = "  fooBar";
        let mut stream = tokenizer.token_stream(text);
        assert!(stream.advance());
        let token = stream.token();
        assert_eq!(&text[token.offset_from..token.offset_to], "fooBar");
        assert!(stream.advance());
        let token = stream.token();
        assert_eq!(&text[token.offset_from..token.offset_to], "foo");
    }
}
