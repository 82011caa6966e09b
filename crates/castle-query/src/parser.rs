//! Query parser.
//!
//! Parses a token stream into a query AST using recursive descent.
//!
//! # Grammar
//!
//! ```text
//! query      → or_expr
//! or_expr    → and_expr (("OR" | <default OR>) and_expr)*
//! and_expr   → unary (("AND" | <default AND>) unary)*
//! unary      → ("NOT" | "-") unary | "+" unary | primary
//! primary    → (TERM | PREFIX | PHRASE | field_expr | "(" or_expr ")") BOOST?
//! field_expr → FIELD_PREFIX (TERM | PREFIX | PHRASE | RANGE | "(" or_expr ")")
//! ```
//!
//! Clauses written next to each other without a keyword are joined by the default
//! operator, so `save user` means `save OR user` under the default OR and
//! `save AND user` under the default AND. Explicit AND binds tighter than OR.

use std::mem;

use crate::{
    ast::QueryExpr,
    error::{ParseError, QueryError},
    lexer::{Spanned, Token, tokenize_spanned},
};

/// Operator used between adjacent clauses that have no explicit keyword.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultOperator {
    /// Adjacent clauses are alternatives.
    #[default]
    Or,
    /// Adjacent clauses are all required.
    And,
}

/// Recursive descent parser for query expressions.
struct Parser {
    /// Token stream to parse.
    tokens: Vec<Spanned>,
    /// Current position in token stream.
    position: usize,
    /// Operator for implicit joins.
    default_operator: DefaultOperator,
}

impl Parser {
    /// Creates a new parser from a token stream.
    fn new(tokens: Vec<Spanned>, default_operator: DefaultOperator) -> Self {
        Self {
            tokens,
            position: 0,
            default_operator,
        }
    }

    /// Parses the token stream into a query expression.
    fn parse(mut self) -> Result<Option<QueryExpr>, ParseError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }

        let expr = self.parse_or_expr()?;

        if let Some(token) = self.peek() {
            let message = match token {
                Token::RParen => "unexpected closing parenthesis".to_string(),
                other => format!("unexpected token: {other:?}"),
            };
            return Err(self.error(message));
        }

        Ok(Some(expr))
    }

    /// Parses: or_expr → and_expr (("OR" | implicit) and_expr)*
    fn parse_or_expr(&mut self) -> Result<QueryExpr, ParseError> {
        let mut exprs = vec![self.parse_and_expr()?];

        loop {
            if self.check(&Token::Or) {
                self.advance();
                if !self.can_start_unary() {
                    return Err(self.error("unexpected end after OR"));
                }
            } else if !(self.default_operator == DefaultOperator::Or && self.can_start_unary()) {
                break;
            }
            exprs.push(self.parse_and_expr()?);
        }

        Ok(QueryExpr::or(exprs))
    }

    /// Parses: and_expr → unary (("AND" | implicit) unary)*
    fn parse_and_expr(&mut self) -> Result<QueryExpr, ParseError> {
        let mut exprs = vec![self.parse_unary()?];

        loop {
            if self.check(&Token::And) {
                self.advance();
                if !self.can_start_unary() {
                    return Err(self.error("unexpected end after AND"));
                }
            } else if !(self.default_operator == DefaultOperator::And && self.can_start_unary())
            {
                break;
            }
            exprs.push(self.parse_unary()?);
        }

        Ok(QueryExpr::and(exprs))
    }

    /// Checks if the current token can start a unary expression.
    fn can_start_unary(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Term(_)
                    | Token::Prefix(_)
                    | Token::Phrase(_)
                    | Token::Not
                    | Token::Minus
                    | Token::Plus
                    | Token::LParen
                    | Token::FieldPrefix(_)
            )
        )
    }

    /// Parses: unary → ("NOT" | "-") unary | "+" unary | primary
    fn parse_unary(&mut self) -> Result<QueryExpr, ParseError> {
        match self.peek() {
            Some(Token::Not | Token::Minus) => {
                self.advance();
                let expr = self.parse_unary()?;
                Ok(QueryExpr::Not(Box::new(expr)))
            }
            Some(Token::Plus) => {
                self.advance();
                let expr = self.parse_unary()?;
                Ok(QueryExpr::Required(Box::new(expr)))
            }
            _ => self.parse_primary(),
        }
    }

    /// Parses a primary expression and an optional boost suffix.
    fn parse_primary(&mut self) -> Result<QueryExpr, ParseError> {
        let expr = match self.peek().cloned() {
            Some(Token::Term(_) | Token::Prefix(_) | Token::Phrase(_)) => self.parse_leaf()?,

            Some(Token::FieldPrefix(name)) => {
                self.advance();
                self.parse_field_expr(name)?
            }

            Some(Token::LParen) => self.parse_group("expected closing parenthesis")?,

            Some(Token::RParen) => return Err(self.error("unexpected closing parenthesis")),

            Some(Token::Or) => return Err(self.error("unexpected OR (needs expression before it)")),

            Some(Token::And) => {
                return Err(self.error("unexpected AND (needs expression before it)"));
            }

            Some(Token::Boost(_)) => {
                return Err(self.error("unexpected boost (needs expression before it)"));
            }

            Some(Token::Range { .. }) => return Err(self.error("range needs a field, e.g. line:[1 TO 9]")),

            Some(Token::Not | Token::Minus | Token::Plus) => {
                return Err(self.error("unexpected operator"));
            }

            None => return Err(ParseError::new("unexpected end of query", None)),
        };

        Ok(self.maybe_apply_boost(expr))
    }

    /// Parses the expression after a field prefix.
    fn parse_field_expr(&mut self, name: String) -> Result<QueryExpr, ParseError> {
        let expr = match self.peek().cloned() {
            Some(Token::Term(text)) if name == "*" && text == "*" => {
                self.advance();
                return Ok(QueryExpr::All);
            }
            Some(Token::Term(_) | Token::Prefix(_) | Token::Phrase(_)) => self.parse_leaf()?,
            Some(Token::Range {
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            }) => {
                self.advance();
                QueryExpr::Range {
                    lower,
                    upper,
                    lower_inclusive,
                    upper_inclusive,
                }
            }
            Some(Token::LParen) => {
                self.parse_group("expected closing parenthesis after field expression")?
            }
            _ => {
                return Err(self.error(format!(
                    "expected term, phrase, range, or group after '{name}:'"
                )));
            }
        };

        Ok(QueryExpr::field(name, expr))
    }

    /// Consumes a TERM, PREFIX, or PHRASE token.
    fn parse_leaf(&mut self) -> Result<QueryExpr, ParseError> {
        let expr = match self.peek() {
            Some(Token::Term(text)) if text == "*" => QueryExpr::All,
            Some(Token::Term(text)) => QueryExpr::Term(text.clone()),
            Some(Token::Prefix(text)) => QueryExpr::Prefix(text.clone()),
            Some(Token::Phrase(text)) => QueryExpr::Phrase(text.clone()),
            _ => return Err(self.error("expected term or phrase")),
        };
        self.advance();
        Ok(expr)
    }

    /// Applies a trailing boost, if present.
    fn maybe_apply_boost(&mut self, expr: QueryExpr) -> QueryExpr {
        if let Some(Token::Boost(factor)) = self.peek().cloned() {
            self.advance();
            QueryExpr::boost(expr, factor)
        } else {
            expr
        }
    }

    /// Parses a parenthesized group, consuming the surrounding parentheses.
    fn parse_group(&mut self, missing_rparen_msg: &str) -> Result<QueryExpr, ParseError> {
        self.advance(); // (
        let inner = self.parse_or_expr()?;

        if !self.check(&Token::RParen) {
            return Err(self.error(missing_rparen_msg));
        }
        self.advance(); // )

        Ok(inner)
    }

    /// Builds an error located at the current token.
    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.tokens.get(self.position).map(|s| s.offset))
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|s| &s.token)
    }

    /// Checks if the current token has the same kind as `token`.
    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| mem::discriminant(t) == mem::discriminant(token))
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }
}

/// Parses a query string into an AST.
///
/// Returns `Ok(None)` for empty queries, `Ok(Some(expr))` for valid queries,
/// or `Err(QueryError)` for invalid syntax.
pub fn parse(input: &str, default_operator: DefaultOperator) -> Result<Option<QueryExpr>, QueryError> {
    let tokens = tokenize_spanned(input).map_err(QueryError::from)?;
    Parser::new(tokens, default_operator)
        .parse()
        .map_err(|e| QueryError::from(e).with_query(input))
}
