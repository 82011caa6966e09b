//! castle: per-line code search.
//!
//! castle indexes every line of the source files in a set of project roots, labels each
//! line with a type inferred from its shape (declarations, calls, comments, braces, ...),
//! and answers Lucene-style queries ranked so that real code outranks comments and
//! boilerplate. The index is updated incrementally from file modification times.

#![warn(missing_docs)]

pub mod cli;
