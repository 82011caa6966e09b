//! Query lexer (tokenizer).
//!
//! Converts a query string into a stream of tokens for the parser. Each token remembers
//! the byte offset it started at so parse errors can point into the query.

use std::{iter::Peekable, str::Chars};

use crate::error::LexError;

/// A token in the query language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare word (search term), with escapes resolved.
    Term(String),

    /// A word ending in an unescaped `*`; holds the text before the star.
    Prefix(String),

    /// A quoted phrase (the quotes are stripped, content preserved).
    Phrase(String),

    /// The `AND` keyword or `&&`.
    And,

    /// The `OR` keyword or `||`.
    Or,

    /// The `NOT` keyword or `!`.
    Not,

    /// Exclusion prefix (`-`).
    Minus,

    /// Requirement prefix (`+`).
    Plus,

    /// Left parenthesis.
    LParen,

    /// Right parenthesis.
    RParen,

    /// Field prefix (e.g., "file:" produces FieldPrefix("file")).
    FieldPrefix(String),

    /// Boost operator with factor (e.g., "^2.5" produces Boost(2.5)).
    Boost(f32),

    /// A bracketed range; only recognized directly after a field prefix.
    Range {
        /// Lower bound, `None` when open (`*`).
        lower: Option<String>,
        /// Upper bound, `None` when open (`*`).
        upper: Option<String>,
        /// `[` rather than `{`.
        lower_inclusive: bool,
        /// `]` rather than `}`.
        upper_inclusive: bool,
    },
}

/// A token together with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    /// The token.
    pub token: Token,
    /// Byte offset in the query.
    pub offset: usize,
}

/// Tokenizes a query string.
struct Lexer<'a> {
    /// The original input string.
    input: &'a str,
    /// Character iterator with one-character lookahead.
    chars: Peekable<Chars<'a>>,
    /// Current byte position in input.
    position: usize,
    /// Whether the last token was a field prefix (enables range syntax).
    after_field: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            position: 0,
            after_field: false,
        }
    }

    /// Creates an error at a specific position.
    fn error_at(&self, message: impl Into<String>, position: usize) -> LexError {
        LexError::new(message, position, self.input)
    }

    /// Tokenizes the entire input, returning all tokens or an error.
    fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let offset = self.position;
            let Some(token) = self.next_token()? else {
                break;
            };
            self.after_field = matches!(token, Token::FieldPrefix(_));
            tokens.push(Spanned { token, offset });
        }

        Ok(tokens)
    }

    /// Returns the next token, or None if at end of input.
    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        let Some(&ch) = self.chars.peek() else {
            return Ok(None);
        };

        match ch {
            '"' => self.read_phrase(),
            '(' => Ok(Some(self.single(Token::LParen))),
            ')' => Ok(Some(self.single(Token::RParen))),
            '-' => Ok(Some(self.single(Token::Minus))),
            '+' => Ok(Some(self.single(Token::Plus))),
            '!' => Ok(Some(self.single(Token::Not))),
            '^' => self.read_boost(),
            '[' | '{' if self.after_field => self.read_range(),
            _ => self.read_term_or_keyword(),
        }
    }

    /// Consumes one character and returns `token`.
    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Reads a quoted phrase. Backslash escapes the next character.
    fn read_phrase(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance(); // opening quote

        let mut content = String::new();

        loop {
            match self.chars.peek() {
                Some(&'"') => {
                    self.advance();
                    return Ok(Some(Token::Phrase(content)));
                }
                Some(&'\\') => {
                    self.advance();
                    if let Some(&next) = self.chars.peek() {
                        content.push(next);
                        self.advance();
                    }
                }
                Some(&ch) => {
                    content.push(ch);
                    self.advance();
                }
                None => {
                    return Err(self.error_at("unclosed quote", start_pos));
                }
            }
        }
    }

    /// Reads a term, keyword, prefix term, or field prefix.
    fn read_term_or_keyword(&mut self) -> Result<Option<Token>, LexError> {
        let mut word = String::new();
        let mut escaped_last = false;

        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' || ch == '^' {
                break;
            }

            if ch == '\\' {
                self.advance();
                if let Some(&next) = self.chars.peek() {
                    word.push(next);
                    self.advance();
                    escaped_last = true;
                }
                continue;
            }

            if ch == ':' {
                self.advance();
                if word.is_empty() {
                    continue;
                }
                return Ok(Some(Token::FieldPrefix(word)));
            }

            word.push(ch);
            escaped_last = false;
            self.advance();
        }

        if word.is_empty() {
            return Ok(None);
        }

        let token = match word.as_str() {
            "AND" | "&&" => Token::And,
            "OR" | "||" => Token::Or,
            "NOT" => Token::Not,
            _ if word.len() > 1 && word.ends_with('*') && !escaped_last => {
                word.pop();
                Token::Prefix(word)
            }
            _ => Token::Term(word),
        };
        Ok(Some(token))
    }

    /// Reads a boost operator (^N or ^N.N).
    fn read_boost(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance(); // '^'

        let mut number = String::new();

        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() || (ch == '.' && !number.contains('.')) {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if number.is_empty() {
            return Err(self.error_at("expected number after '^'", start_pos));
        }

        match number.parse::<f32>() {
            Ok(factor) => Ok(Some(Token::Boost(factor))),
            Err(_) => Err(self.error_at(format!("invalid boost value: {number}"), start_pos)),
        }
    }

    /// Reads `[lower TO upper]`, with `{`/`}` marking exclusive bounds.
    fn read_range(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        let lower_inclusive = self.chars.peek() == Some(&'[');
        self.advance();

        let mut body = String::new();
        let upper_inclusive = loop {
            match self.chars.peek() {
                Some(&']') => break true,
                Some(&'}') => break false,
                Some(&ch) => {
                    body.push(ch);
                    self.advance();
                }
                None => return Err(self.error_at("unclosed range", start_pos)),
            }
        };
        self.advance(); // closing bracket

        let parts: Vec<&str> = body.split_whitespace().collect();
        let [lower, keyword, upper] = parts.as_slice() else {
            return Err(self.error_at("range must look like [lower TO upper]", start_pos));
        };
        if *keyword != "TO" {
            return Err(self.error_at("range must look like [lower TO upper]", start_pos));
        }

        let bound = |s: &str| (s != "*").then(|| s.to_string());
        Ok(Some(Token::Range {
            lower: bound(*lower),
            upper: bound(*upper),
            lower_inclusive,
            upper_inclusive,
        }))
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Advances to the next character.
    fn advance(&mut self) {
        if let Some(ch) = self.chars.next() {
            self.position += ch.len_utf8();
        }
    }
}

/// Tokenizes a query string, keeping token offsets.
pub(crate) fn tokenize_spanned(input: &str) -> Result<Vec<Spanned>, LexError> {
    Lexer::new(input).tokenize()
}

/// Convenience function to tokenize a query string.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Ok(tokenize_spanned(input)?
        .into_iter()
        .map(|s| s.token)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(s: &str) -> Token {
        Token::Term(s.into())
    }

    #[test]
    fn empty_input() {
        assert_eq!(tokenize("").unwrap(), vec![]);
        assert_eq!(tokenize("   ").unwrap(), vec![]);
    }

    #[test]
    fn code_like_terms_stay_whole() {
        assert_eq!(
            tokenize("getUserName foo_bar x.y").unwrap(),
            vec![term("getUserName"), term("foo_bar"), term("x.y")]
        );
    }

    #[test]
    fn quoted_phrase_with_escape() {
        assert_eq!(
            tokenize(r#""say \"hi\"""#).unwrap(),
            vec![Token::Phrase("say \"hi\"".into())]
        );
    }

    #[test]
    fn unclosed_quote_error() {
        let err = tokenize("\"hello world").unwrap_err();
        assert_eq!(err.position, 0);
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn keywords_are_uppercase_only() {
        assert_eq!(
            tokenize("a AND b OR c NOT d").unwrap(),
            vec![
                term("a"),
                Token::And,
                term("b"),
                Token::Or,
                term("c"),
                Token::Not,
                term("d")
            ]
        );
        assert_eq!(
            tokenize("a or b").unwrap(),
            vec![term("a"), term("or"), term("b")]
        );
    }

    #[test]
    fn symbolic_operators() {
        assert_eq!(
            tokenize("a && b || !c").unwrap(),
            vec![
                term("a"),
                Token::And,
                term("b"),
                Token::Or,
                Token::Not,
                term("c")
            ]
        );
    }

    #[test]
    fn plus_and_minus_prefixes() {
        assert_eq!(
            tokenize("+must -never").unwrap(),
            vec![Token::Plus, term("must"), Token::Minus, term("never")]
        );
    }

    #[test]
    fn hyphen_inside_word_is_kept() {
        assert_eq!(tokenize("foo-bar").unwrap(), vec![term("foo-bar")]);
    }

    #[test]
    fn field_prefix() {
        assert_eq!(
            tokenize("type:import").unwrap(),
            vec![Token::FieldPrefix("type".into()), term("import")]
        );
    }

    #[test]
    fn escaped_colon_is_literal() {
        assert_eq!(tokenize(r"a\:b").unwrap(), vec![term("a:b")]);
    }

    #[test]
    fn prefix_term() {
        assert_eq!(tokenize("getUser*").unwrap(), vec![Token::Prefix("getUser".into())]);
        assert_eq!(tokenize(r"lit\*").unwrap(), vec![term("lit*")]);
        assert_eq!(tokenize("*").unwrap(), vec![term("*")]);
    }

    #[test]
    fn boost() {
        assert_eq!(
            tokenize("rust^2.5").unwrap(),
            vec![term("rust"), Token::Boost(2.5)]
        );
        assert!(tokenize("rust^").is_err());
    }

    #[test]
    fn inclusive_and_exclusive_ranges() {
        assert_eq!(
            tokenize("line:[10 TO 20}").unwrap(),
            vec![
                Token::FieldPrefix("line".into()),
                Token::Range {
                    lower: Some("10".into()),
                    upper: Some("20".into()),
                    lower_inclusive: true,
                    upper_inclusive: false,
                }
            ]
        );
    }

    #[test]
    fn open_range_bounds() {
        let tokens = tokenize("date:{* TO 20240101]").unwrap();
        assert_eq!(
            tokens[1],
            Token::Range {
                lower: None,
                upper: Some("20240101".into()),
                lower_inclusive: false,
                upper_inclusive: true,
            }
        );
    }

    #[test]
    fn brace_without_field_is_a_term() {
        assert_eq!(tokenize("{").unwrap(), vec![term("{")]);
        assert_eq!(tokenize("[x]").unwrap(), vec![term("[x]")]);
    }

    #[test]
    fn malformed_range_errors() {
        assert!(tokenize("line:[1 20]").is_err());
        assert!(tokenize("line:[1 TO 20").is_err());
    }

    #[test]
    fn offsets_are_byte_positions() {
        let spanned = tokenize_spanned("ab  (cd)").unwrap();
        let offsets: Vec<usize> = spanned.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 4, 5, 7]);
    }
}
