//! Query parsing and AST for castle search.
//!
//! The query language follows the familiar Lucene syntax:
//!
//! - **Terms**: `getUser` - words to look for
//! - **Phrases**: `"user name"` - consecutive words
//! - **Prefixes**: `getUs*` - any word starting with the text
//! - **Operators**: `AND`, `OR`, `NOT` (or `&&`, `||`, `!`), plus `+required` and `-excluded`
//! - **Grouping**: `(a b) AND c` - precedence control
//! - **Fields**: `type:import`, `file:Widget` - search specific fields
//! - **Ranges**: `line:[1 TO 100]`, `date:{20240101 TO *]`
//! - **Boosting**: `save^2.5` - adjust clause importance
//!
//! Clauses without an operator between them are joined by a caller-chosen default.
//!
//! # Example
//!
//! ```
//! use castle_query::{DefaultOperator, parse};
//!
//! let expr = parse("type:import (save OR load) -test", DefaultOperator::Or).unwrap();
//! assert!(expr.is_some());
//! ```

#![warn(missing_docs)]

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::QueryExpr;
pub use error::{LexError, ParseError, QueryError, QueryErrorKind};
pub use lexer::{Token, tokenize};
pub use parser::{DefaultOperator, parse};
