//! Drops repeated tokens at the same position.
//!
//! Lowercasing and stemming can turn distinct camelCase parts or synonyms into the same
//! text (`userUser` gives `user` twice); only the first copy is kept.

use tantivy::tokenizer::{Token, TokenFilter, TokenStream, Tokenizer};

/// Token filter that removes same-position duplicates.
#[derive(Clone, Copy, Default)]
pub struct RemoveDuplicates;

impl TokenFilter for RemoveDuplicates {
    type Tokenizer<T: Tokenizer> = RemoveDuplicatesTokenizer<T>;

    fn transform<T: Tokenizer>(self, tokenizer: T) -> RemoveDuplicatesTokenizer<T> {
        RemoveDuplicatesTokenizer { inner: tokenizer }
    }
}

/// Tokenizer wrapper produced by [`RemoveDuplicates`].
#[derive(Clone)]
pub struct RemoveDuplicatesTokenizer<T> {
    /// Wrapped tokenizer.
    inner: T,
}

impl<T: Tokenizer> Tokenizer for RemoveDuplicatesTokenizer<T> {
    type TokenStream<'a> = RemoveDuplicatesTokenStream<T::TokenStream<'a>>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        RemoveDuplicatesTokenStream {
            tail: self.inner.token_stream(text),
            position: usize::MAX,
            seen: Vec::new(),
        }
    }
}

/// Stream that skips tokens already seen at the current position.
pub struct RemoveDuplicatesTokenStream<T> {
    /// Wrapped stream.
    tail: T,
    /// Position of the tokens in `seen`.
    position: usize,
    /// Texts emitted at `position`.
    seen: Vec<String>,
}

impl<T: TokenStream> TokenStream for RemoveDuplicatesTokenStream<T> {
    fn advance(&mut self) -> bool {
        while self.tail.advance() {
            let token = self.tail.token();
            if token.position != self.position {
                self.position = token.position;
                self.seen.clear();
            }
            if self.seen.iter().any(|s| *s == token.text) {
                continue;
            }
            self.seen.push(token.text.clone());
            return true;
        }
        false
    }

    fn token(&self) -> &Token {
        self.tail.token()
    }

    fn token_mut(&mut self) -> &mut Token {
        self.tail.token_mut()
    }
}

#[cfg(test)]
mod tests {
    use tantivy::tokenizer::{LowerCaser, TextAnalyzer};

    use super::*;
    use crate::analyzer::CodeTokenizer;

    #[test]
    fn lowercased_parts_are_not_repeated() {
        let mut analyzer = TextAnalyzer::builder(CodeTokenizer)
            .filter(LowerCaser)
            .filter(RemoveDuplicates)
            .build();
        let mut stream = analyzer.token_stream("userUser");
        let mut texts = Vec::new();
        while stream.advance() {
            texts.push(stream.token().text.clone());
        }
        assert_eq!(texts, vec!["useruser", "user"]);
    }
}
