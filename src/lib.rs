//! # dtsyntax - search query analysis
//!
//! A front-end for boolean/proximity full-text search queries (AND, OR, NOT,
//! ANDANY, NEAR, WITHIN, W/n, PRE/n, field functions, wildcards and quoted
//! phrases). It tokenizes queries, builds query trees, validates them, explains
//! their evaluation order and suggests fixes. It never runs a search.
//!
//! ## Architecture
//!
//! - [`query`] - Lexer, balance checks, tree builder, flow analysis,
//!   diagnostics, fixes, OR expansion, cleanup and highlight classification
//! - [`session`] - Caller-owned analysis session holding the configuration
//! - [`check`] - Batch validation of query files
//! - [`output`] - Coloured terminal rendering
//! - [`utils`] - Configuration and line helpers
//!
//! ## Quick Start
//!
//! ```
//! use dtsyntax::query::{split_or_query, validate};
//!
//! let diagnostics = validate("AND apple");
//! assert_eq!(diagnostics[0].code(), "operator-at-start");
//!
//! let queries = split_or_query("(apple OR orange) AND (red OR blue)");
//! assert_eq!(queries.len(), 4);
//! ```
//!
//! All analysis functions are pure and total: they take text and return new
//! values, never panic on malformed input and keep no state between calls.

pub mod check;
pub mod output;
pub mod query;
pub mod session;
pub mod utils;
