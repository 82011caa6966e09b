//! Query compiler.
//!
//! Compiles a query AST into Tantivy queries over the line schema.

use castle_query::{DefaultOperator, QueryError, QueryExpr};
use tantivy::{
    Index, Term,
    query::{
        AllQuery, BooleanQuery, BoostQuery, Occur, PhraseQuery, Query, QueryParser, RegexQuery,
        TermQuery,
    },
    schema::{Field, IndexRecordOption},
    tokenizer::TextAnalyzer,
};

use crate::{
    analyzer::{analyze, build_type_analyzer},
    schema::{LineSchema, derived_terms, names},
};

/// Where a leaf is matched.
#[derive(Debug, Clone)]
enum Target {
    /// The default fields: content, plus comment when comments are included.
    Default,
    /// A code-analyzed text field.
    Code(Field),
    /// The line-type field.
    Type,
    /// An untokenized field matched verbatim.
    Keyword(Field),
    /// A numeric field, with its schema name for ranges.
    Numeric(Field, &'static str),
    /// A filename-pattern field stored in `derived`.
    Derived(String),
}

/// Compiles query AST nodes into Tantivy queries.
pub struct QueryCompiler {
    /// Field handles.
    schema: LineSchema,
    /// Query-time analyzer for code fields.
    analyzer: TextAnalyzer,
    /// Analyzer for type labels.
    type_analyzer: TextAnalyzer,
    /// Operator joining clauses and analyzed positions.
    default_operator: DefaultOperator,
    /// Fields searched by unfielded leaves.
    default_fields: Vec<Field>,
    /// Parses numeric ranges against the index schema.
    range_parser: QueryParser,
}

impl QueryCompiler {
    /// Creates a compiler for `index`.
    pub fn new(
        index: &Index,
        schema: LineSchema,
        analyzer: TextAnalyzer,
        default_operator: DefaultOperator,
        include_comments: bool,
    ) -> Self {
        let default_fields = if include_comments {
            vec![schema.content, schema.comment]
        } else {
            vec![schema.content]
        };
        Self {
            range_parser: QueryParser::for_index(index, Vec::new()),
            schema,
            analyzer,
            type_analyzer: build_type_analyzer(),
            default_operator,
            default_fields,
        }
    }

    /// Parses and compiles `text` against the default fields.
    ///
    /// Returns `Ok(None)` when the text holds no searchable clause.
    pub fn parse(&mut self, text: &str) -> Result<Option<Box<dyn Query>>, QueryError> {
        match castle_query::parse(text, self.default_operator)? {
            Some(expr) => self.compile(&expr).map_err(|e| e.with_query(text)),
            None => Ok(None),
        }
    }

    /// Parses and compiles `text` against the type field.
    pub fn parse_type_query(&mut self, text: &str) -> Result<Option<Box<dyn Query>>, QueryError> {
        match castle_query::parse(text, self.default_operator)? {
            Some(expr) => self.compile_in(&expr, &Target::Type),
            None => Ok(None),
        }
    }

    /// Compiles a query expression against the default fields.
    pub fn compile(&mut self, expr: &QueryExpr) -> Result<Option<Box<dyn Query>>, QueryError> {
        self.compile_in(expr, &Target::Default)
    }

    /// Compiles `expr` with leaves matched against `target`.
    fn compile_in(
        &mut self,
        expr: &QueryExpr,
        target: &Target,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        match expr {
            QueryExpr::Term(text) => self.compile_term(text, target),
            QueryExpr::Prefix(text) => self.compile_prefix(text, target),
            QueryExpr::Phrase(text) => self.compile_phrase(text, target),
            QueryExpr::All => Ok(Some(Box::new(AllQuery))),
            QueryExpr::Range {
                lower,
                upper,
                lower_inclusive,
                upper_inclusive,
            } => self
                .compile_range(
                    target,
                    lower.as_deref(),
                    upper.as_deref(),
                    *lower_inclusive,
                    *upper_inclusive,
                )
                .map(Some),
            QueryExpr::Not(inner) => Ok(self
                .compile_in(inner, target)?
                .map(|q| exclude_from_all(vec![q]))),
            QueryExpr::Required(inner) => self.compile_in(inner, target),
            QueryExpr::And(exprs) => self.compile_and(exprs, target),
            QueryExpr::Or(exprs) => self.compile_or(exprs, target),
            QueryExpr::Field { name, expr } => {
                if !matches!(target, Target::Default) {
                    return Err(QueryError::compile("nested field queries are not supported"));
                }
                let target = self.target_for(name);
                self.compile_in(expr, &target)
            }
            QueryExpr::Boost { expr, factor } => Ok(self
                .compile_in(expr, target)?
                .map(|q| Box::new(BoostQuery::new(q, *factor)) as Box<dyn Query>)),
        }
    }

    /// Resolves a field name to a target. Unknown names are derived fields.
    fn target_for(&self, name: &str) -> Target {
        match name {
            "*" => Target::Default,
            names::TYPE => Target::Type,
            names::FULLPATH => Target::Keyword(self.schema.fullpath),
            names::EXT => Target::Keyword(self.schema.ext),
            names::LINE => Target::Numeric(self.schema.line, names::LINE),
            names::DATE => Target::Numeric(self.schema.date, names::DATE),
            other => match self.schema.text_field(other) {
                Some(field) => Target::Code(field),
                None => Target::Derived(other.to_string()),
            },
        }
    }

    /// Occur for clauses joined by the default operator.
    fn join_occur(&self) -> Occur {
        match self.default_operator {
            DefaultOperator::And => Occur::Must,
            DefaultOperator::Or => Occur::Should,
        }
    }

    /// Compiles an AND expression.
    ///
    /// Negated clauses become MUST_NOT. With no positive clause the exclusions apply to
    /// every document.
    fn compile_and(
        &mut self,
        exprs: &[QueryExpr],
        target: &Target,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        let mut negative: Vec<Box<dyn Query>> = Vec::new();

        for expr in exprs {
            match expr {
                QueryExpr::Not(inner) => {
                    if let Some(q) = self.compile_in(inner, target)? {
                        negative.push(q);
                    }
                }
                other => {
                    if let Some(q) = self.compile_in(other, target)? {
                        clauses.push((Occur::Must, q));
                    }
                }
            }
        }

        Ok(combine(clauses, negative))
    }

    /// Compiles an OR expression.
    ///
    /// `+` clauses stay required and `-` clauses stay excluded; the rest are optional.
    fn compile_or(
        &mut self,
        exprs: &[QueryExpr],
        target: &Target,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        let mut negative: Vec<Box<dyn Query>> = Vec::new();

        for expr in exprs {
            match expr {
                QueryExpr::Not(inner) => {
                    if let Some(q) = self.compile_in(inner, target)? {
                        negative.push(q);
                    }
                }
                QueryExpr::Required(inner) => {
                    if let Some(q) = self.compile_in(inner, target)? {
                        clauses.push((Occur::Must, q));
                    }
                }
                other => {
                    if let Some(q) = self.compile_in(other, target)? {
                        clauses.push((Occur::Should, q));
                    }
                }
            }
        }

        Ok(combine(clauses, negative))
    }

    /// Compiles a single word.
    fn compile_term(
        &mut self,
        text: &str,
        target: &Target,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        match target {
            Target::Default => {
                let fields = self.default_fields.clone();
                Ok(any_of(
                    fields
                        .into_iter()
                        .filter_map(|field| self.analyzed_term(field, text, false))
                        .collect(),
                ))
            }
            Target::Code(field) => Ok(self.analyzed_term(*field, text, false)),
            Target::Type => Ok(self.analyzed_term(self.schema.line_type, text, true)),
            Target::Keyword(field) => Ok(Some(term_query(Term::from_field_text(*field, text)))),
            Target::Numeric(field, name) => {
                let value = parse_number(name, text)?;
                Ok(Some(term_query(Term::from_field_u64(*field, value))))
            }
            Target::Derived(key) => {
                let occur = self.join_occur();
                let clauses = derived_terms(key, text)
                    .into_iter()
                    .map(|t| (occur, term_query(Term::from_field_text(self.schema.derived, &t))))
                    .collect();
                Ok(boolean(clauses))
            }
        }
    }

    /// Compiles quoted text into a positional phrase.
    fn compile_phrase(
        &mut self,
        text: &str,
        target: &Target,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        match target {
            Target::Default => {
                let fields = self.default_fields.clone();
                Ok(any_of(
                    fields
                        .into_iter()
                        .filter_map(|field| self.analyzed_phrase(field, text, false))
                        .collect(),
                ))
            }
            Target::Code(field) => Ok(self.analyzed_phrase(*field, text, false)),
            Target::Type => Ok(self.analyzed_phrase(self.schema.line_type, text, true)),
            Target::Derived(key) => {
                let clauses = derived_terms(key, text)
                    .into_iter()
                    .map(|t| {
                        (
                            Occur::Must,
                            term_query(Term::from_field_text(self.schema.derived, &t)),
                        )
                    })
                    .collect();
                Ok(boolean(clauses))
            }
            Target::Keyword(_) | Target::Numeric(..) => self.compile_term(text, target),
        }
    }

    /// Compiles a trailing-`*` word into a regex over the term dictionary.
    fn compile_prefix(
        &mut self,
        text: &str,
        target: &Target,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        let lower = text.to_lowercase();
        match target {
            Target::Default => {
                let fields = self.default_fields.clone();
                let queries = fields
                    .into_iter()
                    .map(|field| prefix_query(field, &lower))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(any_of(queries))
            }
            Target::Code(field) => prefix_query(*field, &lower).map(Some),
            Target::Type => prefix_query(self.schema.line_type, &lower).map(Some),
            Target::Keyword(field) => prefix_query(*field, text).map(Some),
            Target::Derived(key) => {
                prefix_query(self.schema.derived, &format!("{}:{lower}", key.to_lowercase()))
                    .map(Some)
            }
            Target::Numeric(_, name) => Err(QueryError::compile(format!(
                "prefix queries are not supported on {name}"
            ))),
        }
    }

    /// Compiles a range. Only numeric fields are ordered.
    fn compile_range(
        &self,
        target: &Target,
        lower: Option<&str>,
        upper: Option<&str>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Result<Box<dyn Query>, QueryError> {
        let Target::Numeric(_, name) = target else {
            return Err(QueryError::compile(
                "ranges are only supported on line and date",
            ));
        };
        let bound = |value: Option<&str>| -> Result<String, QueryError> {
            match value {
                Some(v) => parse_number(name, v).map(|n| n.to_string()),
                None => Ok("*".to_string()),
            }
        };
        let text = format!(
            "{name}:{}{} TO {}{}",
            if lower_inclusive { '[' } else { '{' },
            bound(lower)?,
            bound(upper)?,
            if upper_inclusive { ']' } else { '}' },
        );
        self.range_parser
            .parse_query(&text)
            .map_err(|e| QueryError::compile(format!("invalid range: {e}")))
    }

    /// Analyzes `text` into a query on `field`.
    ///
    /// Tokens sharing a position are alternatives; positions join by the default operator.
    fn analyzed_term(&mut self, field: Field, text: &str, type_field: bool) -> Option<Box<dyn Query>> {
        let occur = self.join_occur();
        let clauses = self
            .positions(text, type_field)
            .into_iter()
            .map(|alternatives| (occur, alternatives_query(field, &alternatives)))
            .collect();
        boolean(clauses)
    }

    /// Analyzes `text` into a phrase on `field`, using the first token of each position.
    fn analyzed_phrase(&mut self, field: Field, text: &str, type_field: bool) -> Option<Box<dyn Query>> {
        let positions = self.positions(text, type_field);
        if positions.len() < 2 {
            return self.analyzed_term(field, text, type_field);
        }
        let terms = positions
            .iter()
            .enumerate()
            .filter_map(|(offset, alternatives)| {
                alternatives
                    .first()
                    .map(|t| (offset, Term::from_field_text(field, t)))
            })
            .collect();
        Some(Box::new(PhraseQuery::new_with_offset(terms)))
    }

    /// Token texts grouped by position, in order.
    fn positions(&mut self, text: &str, type_field: bool) -> Vec<Vec<String>> {
        let analyzer = if type_field {
            &mut self.type_analyzer
        } else {
            &mut self.analyzer
        };
        let mut groups: Vec<(usize, Vec<String>)> = Vec::new();
        for token in analyze(analyzer, text) {
            match groups.last_mut() {
                Some((position, texts)) if *position == token.position => {
                    if !texts.contains(&token.text) {
                        texts.push(token.text);
                    }
                }
                _ => groups.push((token.position, vec![token.text])),
            }
        }
        groups.into_iter().map(|(_, texts)| texts).collect()
    }
}

/// A term query recording frequencies for scoring.
fn term_query(term: Term) -> Box<dyn Query> {
    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs))
}

/// Any of the given texts on `field`.
fn alternatives_query(field: Field, texts: &[String]) -> Box<dyn Query> {
    let mut queries: Vec<Box<dyn Query>> = texts
        .iter()
        .map(|t| term_query(Term::from_field_text(field, t)))
        .collect();
    if queries.len() == 1
        && let Some(only) = queries.pop()
    {
        return only;
    }
    Box::new(BooleanQuery::new(
        queries.into_iter().map(|q| (Occur::Should, q)).collect(),
    ))
}

/// Matches indexed terms of `field` starting with `prefix`.
fn prefix_query(field: Field, prefix: &str) -> Result<Box<dyn Query>, QueryError> {
    let pattern = format!("{}.*", regex::escape(prefix));
    RegexQuery::from_pattern(&pattern, field)
        .map(|q| Box::new(q) as Box<dyn Query>)
        .map_err(|e| QueryError::compile(format!("invalid prefix {prefix}*: {e}")))
}

/// Parses a numeric leaf for `name`.
fn parse_number(name: &str, text: &str) -> Result<u64, QueryError> {
    text.trim()
        .parse()
        .map_err(|_| QueryError::compile(format!("{name} expects a number, got {text}")))
}

/// A disjunction of queries, unwrapped when there is only one.
fn any_of(queries: Vec<Box<dyn Query>>) -> Option<Box<dyn Query>> {
    boolean(queries.into_iter().map(|q| (Occur::Should, q)).collect())
}

/// A boolean query over `clauses`, unwrapped when there is only one.
fn boolean(mut clauses: Vec<(Occur, Box<dyn Query>)>) -> Option<Box<dyn Query>> {
    match clauses.len() {
        0 => None,
        1 => clauses.pop().map(|(_, q)| q),
        _ => Some(Box::new(BooleanQuery::new(clauses))),
    }
}

/// Every document except those matching any of `excluded`.
fn exclude_from_all(excluded: Vec<Box<dyn Query>>) -> Box<dyn Query> {
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, Box::new(AllQuery))];
    clauses.extend(excluded.into_iter().map(|q| (Occur::MustNot, q)));
    Box::new(BooleanQuery::new(clauses))
}

/// Joins positive clauses with exclusions.
fn combine(
    mut clauses: Vec<(Occur, Box<dyn Query>)>,
    negative: Vec<Box<dyn Query>>,
) -> Option<Box<dyn Query>> {
    if negative.is_empty() {
        if clauses.len() == 1
            && let Some((_, only)) = clauses.pop()
        {
            return Some(only);
        }
        return boolean(clauses);
    }
    if clauses.is_empty() {
        return Some(exclude_from_all(negative));
    }
    clauses.extend(negative.into_iter().map(|q| (Occur::MustNot, q)));
    Some(Box::new(BooleanQuery::new(clauses)))
}
