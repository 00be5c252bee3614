pub mod balance;
pub mod cleanup;
pub mod diagnostics;
pub mod expand;
pub mod fixes;
pub mod highlight;
pub mod lexer;
pub mod parser;
pub mod planner;
pub mod vocabulary;

pub use balance::{match_parens, paren_balance, query_paren_balance, quote_balance, unbalanced_quote_lines};
pub use cleanup::{cleanup, cleanup_with_report, CleanupReport};
pub use diagnostics::{validate, validate_with, Diagnostic, LineSpan, RuleCode, Severity};
pub use expand::split_or_query;
pub use fixes::{analyze_and_suggest_fixes, apply_all_fixes, suggest_fixes, suggest_fixes_with, Fix, FixAction};
pub use highlight::{highlight, noise_word_info, HighlightClass, HighlightSpan};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{build_custom_tree, build_query_trees, build_tree, ParseError, QueryNode, Span};
pub use planner::{analyze_flow, format_flow_report, FlowStep, FlowStepKind};
pub use vocabulary::{BooleanOp, Operator, ProximityOp, SpecialFunction};
