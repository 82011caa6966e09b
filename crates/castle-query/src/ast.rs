//! Query abstract syntax tree.
//!
//! Represents parsed query expressions before they are analyzed and compiled against an index.
//! Leaves hold raw user text; tokenization happens at compile time with the index analyzer.

use std::fmt;

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    /// A single search word, not yet analyzed.
    Term(String),

    /// A word that matches any indexed token starting with it.
    Prefix(String),

    /// Quoted text whose tokens must appear consecutively.
    Phrase(String),

    /// Matches every document.
    All,

    /// A bounded range over an ordered field.
    Range {
        /// Lower bound, `None` when open.
        lower: Option<String>,
        /// Upper bound, `None` when open.
        upper: Option<String>,
        /// Whether the lower bound is included.
        lower_inclusive: bool,
        /// Whether the upper bound is included.
        upper_inclusive: bool,
    },

    /// Negation: results must NOT match this expression.
    Not(Box<Self>),

    /// Requirement (`+`): the expression must match even inside an OR.
    Required(Box<Self>),

    /// Conjunction: all sub-expressions must match.
    And(Vec<Self>),

    /// Disjunction: at least one sub-expression must match.
    Or(Vec<Self>),

    /// Field-scoped query.
    Field {
        /// Field name (e.g., content, comment, type, file).
        name: String,
        /// Expression to match within that field.
        expr: Box<Self>,
    },

    /// Boosted query: multiplies the score of the inner expression.
    Boost {
        /// The expression to boost.
        expr: Box<Self>,
        /// The boost factor.
        factor: f32,
    },
}

impl QueryExpr {
    /// Creates an And expression, flattening nested Ands.
    pub fn and(exprs: Vec<Self>) -> Self {
        Self::flatten(exprs, true)
    }

    /// Creates an Or expression, flattening nested Ors.
    pub fn or(exprs: Vec<Self>) -> Self {
        Self::flatten(exprs, false)
    }

    /// Shared body of [`Self::and`] and [`Self::or`].
    fn flatten(exprs: Vec<Self>, conjunction: bool) -> Self {
        let mut flattened: Vec<Self> = Vec::with_capacity(exprs.len());
        for e in exprs {
            match e {
                Self::And(inner) if conjunction => flattened.extend(inner),
                Self::Or(inner) if !conjunction => flattened.extend(inner),
                other => flattened.push(other),
            }
        }

        if flattened.len() == 1
            && let Some(only) = flattened.pop()
        {
            return only;
        }
        if conjunction {
            Self::And(flattened)
        } else {
            Self::Or(flattened)
        }
    }

    /// Creates a boosted expression.
    pub fn boost(expr: Self, factor: f32) -> Self {
        Self::Boost {
            expr: Box::new(expr),
            factor,
        }
    }

    /// Creates a field-scoped expression.
    pub fn field(name: impl Into<String>, expr: Self) -> Self {
        Self::Field {
            name: name.into(),
            expr: Box::new(expr),
        }
    }

    /// Returns true if this expression only excludes documents.
    pub fn is_negative(&self) -> bool {
        match self {
            Self::Not(_) => true,
            Self::Boost { expr, .. } => expr.is_negative(),
            _ => false,
        }
    }

    /// Formats the expression as a tree structure with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Term(s) => writeln!(f, "{prefix}Term({s:?})"),
            Self::Prefix(s) => writeln!(f, "{prefix}Prefix({s:?})"),
            Self::Phrase(s) => writeln!(f, "{prefix}Phrase({s:?})"),
            Self::All => writeln!(f, "{prefix}All"),
            Self::Range {
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            } => writeln!(
                f,
                "{prefix}Range({}{} TO {}{})",
                if *lower_inclusive { '[' } else { '{' },
                lower.as_deref().unwrap_or("*"),
                upper.as_deref().unwrap_or("*"),
                if *upper_inclusive { ']' } else { '}' },
            ),
            Self::Not(inner) => {
                writeln!(f, "{prefix}Not")?;
                inner.fmt_tree(f, indent + 1)
            }
            Self::Required(inner) => {
                writeln!(f, "{prefix}Required")?;
                inner.fmt_tree(f, indent + 1)
            }
            Self::And(exprs) | Self::Or(exprs) => {
                let label = if matches!(self, Self::And(_)) { "And" } else { "Or" };
                writeln!(f, "{prefix}{label}")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Field { name, expr } => {
                writeln!(f, "{prefix}Field({name:?})")?;
                expr.fmt_tree(f, indent + 1)
            }
            Self::Boost { expr, factor } => {
                writeln!(f, "{prefix}Boost({factor})")?;
                expr.fmt_tree(f, indent + 1)
            }
        }
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(s: &str) -> QueryExpr {
        QueryExpr::Term(s.into())
    }

    #[test]
    fn and_flattens_nested() {
        let nested = QueryExpr::and(vec![
            term("a"),
            QueryExpr::And(vec![term("b"), term("c")]),
        ]);
        assert_eq!(nested, QueryExpr::And(vec![term("a"), term("b"), term("c")]));
    }

    #[test]
    fn and_keeps_nested_or() {
        let mixed = QueryExpr::and(vec![term("a"), QueryExpr::Or(vec![term("b"), term("c")])]);
        assert_eq!(
            mixed,
            QueryExpr::And(vec![term("a"), QueryExpr::Or(vec![term("b"), term("c")])])
        );
    }

    #[test]
    fn single_element_unwraps() {
        assert_eq!(QueryExpr::and(vec![term("a")]), term("a"));
        assert_eq!(QueryExpr::or(vec![term("a")]), term("a"));
    }

    #[test]
    fn negative_detection_sees_through_boost() {
        let not = QueryExpr::Not(Box::new(term("a")));
        assert!(not.is_negative());
        assert!(QueryExpr::boost(not, 2.0).is_negative());
        assert!(!term("a").is_negative());
    }

    #[test]
    fn display_renders_tree() {
        let expr = QueryExpr::field(
            "line",
            QueryExpr::Range {
                lower: Some("1".into()),
                upper: None,
                lower_inclusive: true,
                upper_inclusive: false,
            },
        );
        let rendered = expr.to_string();
        assert!(rendered.contains("Field(\"line\")"));
        assert!(rendered.contains("Range([1 TO *})"));
    }
}
