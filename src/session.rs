//! Analysis session owned by a caller such as an editor or the CLI.
//!
//! A session holds configuration only. Every call analyzes the text it is
//! given from scratch, so one session can serve any number of documents.

use crate::query::balance::{paren_balance, quote_balance, unbalanced_quote_lines};
use crate::query::cleanup::{cleanup_with_report, CleanupReport};
use crate::query::diagnostics::{validate_with, Diagnostic, Severity};
use crate::query::expand::split_or_query;
use crate::query::fixes::{suggest_fixes_with, Fix};
use crate::query::highlight::{highlight, HighlightSpan};
use crate::query::lexer::{tokenize, Token};
use crate::query::parser::{build_query_trees, QueryNode};
use crate::query::planner::{analyze_flow, FlowStep};
use crate::utils::app_data::AnalyzerConfig;
use serde::Serialize;
use tracing::debug;

/// Parenthesis and quote balance of a text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceStatus {
    pub paren_balance: i64,
    pub quote_balance: u8,
    pub unbalanced_quote_lines: Vec<usize>,
}

impl BalanceStatus {
    pub fn of(text: &str) -> Self {
        Self {
            paren_balance: paren_balance(text),
            quote_balance: quote_balance(text),
            unbalanced_quote_lines: unbalanced_quote_lines(text),
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.paren_balance == 0 && self.quote_balance == 0
    }
}

/// Everything known about one text snapshot
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub tokens: Vec<Token>,
    pub trees: Vec<QueryNode>,
    pub diagnostics: Vec<Diagnostic>,
    pub fixes: Vec<Fix>,
    pub balance: BalanceStatus,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    config: AnalyzerConfig,
}

impl AnalysisSession {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, text: &str) -> Analysis {
        let analysis = Analysis {
            tokens: tokenize(text, 0),
            trees: build_query_trees(text),
            diagnostics: validate_with(text, &self.config),
            fixes: suggest_fixes_with(text, &self.config),
            balance: BalanceStatus::of(text),
        };
        debug!(
            tokens = analysis.tokens.len(),
            diagnostics = analysis.diagnostics.len(),
            fixes = analysis.fixes.len(),
            "analysis finished"
        );
        analysis
    }

    pub fn highlight(&self, text: &str) -> Vec<HighlightSpan> {
        highlight(text, &self.config)
    }

    pub fn flow(&self, query: &str) -> Vec<FlowStep> {
        analyze_flow(query)
    }

    pub fn split(&self, query: &str) -> Vec<String> {
        split_or_query(query)
    }

    pub fn cleanup(&self, text: &str) -> CleanupReport {
        cleanup_with_report(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze() {
        let session = AnalysisSession::default();
        let analysis = session.analyze("apple AND AND orange\n(red OR \"blue");

        assert_eq!(analysis.trees.len(), 2);
        assert!(analysis.has_errors());
        assert_eq!(analysis.balance.paren_balance, 1);
        assert_eq!(analysis.balance.unbalanced_quote_lines, vec![2]);
        assert!(!analysis.balance.is_balanced());
        assert!(analysis.fixes.iter().any(|f| f.code == "remove-duplicate-operators"));
    }

    #[test]
    fn test_session_is_stateless() {
        let session = AnalysisSession::default();
        let first = session.analyze("AND apple");
        session.analyze("apple OR pear OR plum");
        let again = session.analyze("AND apple");
        assert_eq!(first.diagnostics, again.diagnostics);
    }

    #[test]
    fn test_config_flows_through() {
        let session = AnalysisSession::new(AnalyzerConfig {
            disabled_rules: vec!["operator-at-start".to_string()],
            ..AnalyzerConfig::default()
        });
        assert!(!session.analyze("AND apple").has_errors());
    }

    #[test]
    fn test_passthroughs() {
        let session = AnalysisSession::default();
        assert_eq!(session.split("(a OR b) c").len(), 2);
        assert_eq!(session.cleanup("A and B").text, "a AND b");
        assert_eq!(session.flow("a").len(), 3);
        assert!(!session.highlight("a").is_empty());
    }
}
