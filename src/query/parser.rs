//! Query tree construction.
//!
//! The builder walks the flat token list produced by [`tokenize`] and nests
//! it into groups and operator nodes. Groups are matched with an explicit
//! frame stack, so nesting depth is bounded only by memory.

use crate::query::balance::{paren_balance, quote_balance, unmatched_quote};
use crate::query::lexer::{tokenize, Token, TokenKind};
use crate::query::vocabulary::{is_noise_word, Operator, SpecialFunction};
use crate::utils::lines::lines_with_offsets;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{trace, warn};

/// Byte range `start..end` in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Query tree node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum QueryNode {
    /// One logical query (a line, or a caller-supplied string)
    Root {
        label: String,
        children: Vec<QueryNode>,
        span: Span,
    },
    /// Parenthesized sub-expression
    Group { children: Vec<QueryNode>, span: Span },
    /// Operator with the operands that directly follow it
    Operator {
        operator: Operator,
        operator_text: String,
        description: String,
        operands: Vec<QueryNode>,
        span: Span,
    },
    Term {
        text: String,
        description: String,
        span: Span,
    },
    /// Quoted phrase, quotes included
    Phrase { text: String, span: Span },
    Wildcard {
        text: String,
        description: String,
        span: Span,
    },
    Error { message: String, span: Span },
    Warning { message: String, span: Span },
}

impl QueryNode {
    pub fn span(&self) -> Span {
        match self {
            QueryNode::Root { span, .. }
            | QueryNode::Group { span, .. }
            | QueryNode::Operator { span, .. }
            | QueryNode::Term { span, .. }
            | QueryNode::Phrase { span, .. }
            | QueryNode::Wildcard { span, .. }
            | QueryNode::Error { span, .. }
            | QueryNode::Warning { span, .. } => *span,
        }
    }

    /// Child nodes (operands for operator nodes)
    pub fn children(&self) -> &[QueryNode] {
        match self {
            QueryNode::Root { children, .. } | QueryNode::Group { children, .. } => children,
            QueryNode::Operator { operands, .. } => operands,
            _ => &[],
        }
    }

    /// One-line label for tree views
    pub fn label(&self) -> String {
        match self {
            QueryNode::Root { label, .. } => label.clone(),
            QueryNode::Group { children, .. } => format!("( ) group of {}", children.len()),
            QueryNode::Operator {
                operator_text,
                description,
                ..
            } => format!("{} - {}", operator_text, description),
            QueryNode::Term {
                text, description, ..
            }
            | QueryNode::Wildcard {
                text, description, ..
            } => format!("{} - {}", text, description),
            QueryNode::Phrase { text, .. } => format!("{} - Exact phrase", text),
            QueryNode::Error { message, .. } => format!("Error: {}", message),
            QueryNode::Warning { message, .. } => format!("Warning: {}", message),
        }
    }
}

/// Token shapes the tree builder cannot place
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("`{text}` at offset {offset} is not a known operator")]
    UnknownOperator { text: String, offset: usize },
    #[error("token `{text}` has an inverted span {start}..{end}")]
    InvertedSpan {
        text: String,
        start: usize,
        end: usize,
    },
}

/// Open group on the frame stack
struct Frame {
    open: Option<Span>,
    children: Vec<QueryNode>,
}

impl Frame {
    fn close(self, end: Option<usize>) -> QueryNode {
        let open = self.open.unwrap_or(Span::new(0, 0));
        let end = end
            .or_else(|| self.children.last().map(|c| c.span().end))
            .unwrap_or(open.end);
        QueryNode::Group {
            children: self.children,
            span: Span::new(open.start, end),
        }
    }
}

/// Build the node list for a token sequence.
///
/// A `)` with no open group is skipped; a `(` that is never closed becomes a
/// group running to its last child. Both are reported by the balance pass,
/// not here.
pub fn build_tree(tokens: &[Token]) -> Result<Vec<QueryNode>, ParseError> {
    let mut stack = vec![Frame {
        open: None,
        children: Vec::new(),
    }];
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        check_span(token)?;

        match token.kind {
            TokenKind::GroupStart => {
                stack.push(Frame {
                    open: Some(Span::new(token.start, token.end)),
                    children: Vec::new(),
                });
                i += 1;
            }
            TokenKind::GroupEnd => {
                if stack.len() > 1 {
                    if let Some(frame) = stack.pop() {
                        let group = frame.close(Some(token.end));
                        push_child(&mut stack, group);
                    }
                } else {
                    trace!(offset = token.start, "skipping unmatched closing parenthesis");
                }
                i += 1;
            }
            TokenKind::Operator => {
                let operator = match token.operator.or_else(|| Operator::parse(&token.text)) {
                    Some(op) => op,
                    None => {
                        return Err(ParseError::UnknownOperator {
                            text: token.text.clone(),
                            offset: token.start,
                        })
                    }
                };

                let mut operands = Vec::new();
                let mut j = i + 1;
                while j < tokens.len() && tokens[j].is_operand() {
                    check_span(&tokens[j])?;
                    operands.push(leaf(&tokens[j]));
                    j += 1;
                }

                let end = operands.last().map(|n| n.span().end).unwrap_or(token.end);
                push_child(
                    &mut stack,
                    QueryNode::Operator {
                        operator,
                        operator_text: token.text.clone(),
                        description: operator.description(),
                        operands,
                        span: Span::new(token.start, end),
                    },
                );
                i = j;
            }
            TokenKind::Term | TokenKind::Phrase | TokenKind::Wildcard => {
                push_child(&mut stack, leaf(token));
                i += 1;
            }
        }
    }

    while stack.len() > 1 {
        if let Some(frame) = stack.pop() {
            let group = frame.close(None);
            push_child(&mut stack, group);
        }
    }

    Ok(stack.pop().map(|root| root.children).unwrap_or_default())
}

fn check_span(token: &Token) -> Result<(), ParseError> {
    if token.start > token.end {
        return Err(ParseError::InvertedSpan {
            text: token.text.clone(),
            start: token.start,
            end: token.end,
        });
    }
    Ok(())
}

fn push_child(stack: &mut [Frame], node: QueryNode) {
    if let Some(frame) = stack.last_mut() {
        frame.children.push(node);
    }
}

fn leaf(token: &Token) -> QueryNode {
    let span = Span::new(token.start, token.end);
    match token.kind {
        TokenKind::Phrase => QueryNode::Phrase {
            text: token.text.clone(),
            span,
        },
        TokenKind::Wildcard => QueryNode::Wildcard {
            text: token.text.clone(),
            description: wildcard_description(&token.text).to_string(),
            span,
        },
        _ => QueryNode::Term {
            text: token.text.clone(),
            description: term_description(&token.text).to_string(),
            span,
        },
    }
}

fn term_description(text: &str) -> &'static str {
    if is_noise_word(text) {
        "Noise word, ignored by the search engine"
    } else if SpecialFunction::parse(text).is_some() {
        "Field function"
    } else {
        "Search term"
    }
}

fn wildcard_description(text: &str) -> &'static str {
    if text.starts_with('*') || text.starts_with('?') {
        "Leading wildcard, expands against the whole index and can be slow"
    } else {
        "Wildcard, matches word variations"
    }
}

static LEADING_WILDCARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\w").expect("valid leading wildcard regex"));

/// Error and warning nodes for one query line starting at `base`
pub fn detect_errors(line: &str, base: usize) -> Vec<QueryNode> {
    let mut nodes = Vec::new();
    let line_span = Span::new(base, base + line.len());

    let balance = paren_balance(line);
    if balance > 0 {
        nodes.push(QueryNode::Error {
            message: format!(
                "Unbalanced parentheses: {} missing closing {}",
                balance,
                plural(balance, "parenthesis", "parentheses")
            ),
            span: line_span,
        });
    } else if balance < 0 {
        nodes.push(QueryNode::Error {
            message: format!(
                "Unbalanced parentheses: {} extra closing {}",
                -balance,
                plural(-balance, "parenthesis", "parentheses")
            ),
            span: line_span,
        });
    }

    if quote_balance(line) != 0 {
        let start = unmatched_quote(line).map(|i| base + i).unwrap_or(base);
        nodes.push(QueryNode::Error {
            message: "Unbalanced quotes: missing closing quote".to_string(),
            span: Span::new(start, line_span.end),
        });
    }

    if let Some(m) = LEADING_WILDCARD.find(line) {
        nodes.push(QueryNode::Warning {
            message: "Leading wildcard can be very slow on large indexes".to_string(),
            span: Span::new(base + m.start(), base + m.end()),
        });
    }

    nodes
}

fn plural(n: i64, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}

/// Build one root for a single query string whose first byte sits at `base`
pub fn build_root(label: &str, query: &str, base: usize) -> QueryNode {
    root_from_tokens(label, query, base, &tokenize(query, base))
}

fn root_from_tokens(label: &str, query: &str, base: usize, tokens: &[Token]) -> QueryNode {
    let span = Span::new(base, base + query.len());

    let mut children = match build_tree(tokens) {
        Ok(children) => children,
        Err(e) => {
            warn!(error = %e, "query tree degraded to a parse error node");
            vec![QueryNode::Error {
                message: format!("Parse Error: {}", e),
                span,
            }]
        }
    };
    children.extend(detect_errors(query, base));

    QueryNode::Root {
        label: label.to_string(),
        children,
        span,
    }
}

/// Build one root per query line. Blank lines and `//` comments are skipped.
pub fn build_query_trees(text: &str) -> Vec<QueryNode> {
    lines_with_offsets(text)
        .filter(|line| line.is_query())
        .map(|line| build_root(&format!("Line {}", line.number), line.text, line.start))
        .collect()
}

/// Build the tree for a caller-supplied query
pub fn build_custom_tree(query: &str, label: &str) -> QueryNode {
    build_root(label, query, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn children(node: &QueryNode) -> &[QueryNode] {
        node.children()
    }

    fn assert_spans_nested(node: &QueryNode) {
        for child in node.children() {
            assert!(
                node.span().contains(&child.span()),
                "{:?} not inside {:?}",
                child.span(),
                node.span()
            );
            assert_spans_nested(child);
        }
    }

    #[test]
    fn test_simple_term() {
        let nodes = build_tree(&tokenize("apple", 0)).unwrap();
        assert!(matches!(&nodes[0], QueryNode::Term { text, .. } if text == "apple"));
    }

    #[test]
    fn test_operator_collects_operands() {
        let nodes = build_tree(&tokenize("apple AND orange \"red fruit\" OR pear", 0)).unwrap();
        assert_eq!(nodes.len(), 3);
        match &nodes[1] {
            QueryNode::Operator {
                operator_text,
                operands,
                ..
            } => {
                assert_eq!(operator_text, "AND");
                assert_eq!(operands.len(), 2);
                assert!(matches!(operands[1], QueryNode::Phrase { .. }));
            }
            other => panic!("expected operator, got {:?}", other),
        }
        assert!(matches!(&nodes[2], QueryNode::Operator { operands, .. } if operands.len() == 1));
    }

    #[test]
    fn test_operator_stops_at_group() {
        let nodes = build_tree(&tokenize("a AND (b OR c)", 0)).unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[1], QueryNode::Operator { operands, .. } if operands.is_empty()));
        assert!(matches!(&nodes[2], QueryNode::Group { children, .. } if children.len() == 2));
    }

    #[test]
    fn test_nested_groups() {
        let nodes = build_tree(&tokenize("((a OR b) AND c)", 0)).unwrap();
        assert_eq!(nodes.len(), 1);
        let outer = &nodes[0];
        assert_eq!(outer.span(), Span::new(0, 16));
        assert!(matches!(&children(outer)[0], QueryNode::Group { .. }));
    }

    #[test]
    fn test_deep_nesting() {
        let query = format!("{}a{}", "(".repeat(2_000), ")".repeat(2_000));
        let nodes = build_tree(&tokenize(&query, 0)).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_unmatched_close_is_skipped() {
        let nodes = build_tree(&tokenize("a) OR b", 0)).unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_unclosed_group() {
        let nodes = build_tree(&tokenize("(a OR b", 0)).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].span(), Span::new(0, 7));
    }

    #[test]
    fn test_unknown_operator_is_an_error() {
        let mut tokens = tokenize("a AND b", 0);
        tokens[1].text = "FOO".to_string();
        tokens[1].operator = None;
        assert!(matches!(
            build_tree(&tokens),
            Err(ParseError::UnknownOperator { offset: 2, .. })
        ));
    }

    #[test]
    fn test_inverted_span_is_an_error() {
        let mut tokens = tokenize("a", 0);
        tokens[0].start = 5;
        assert!(matches!(build_tree(&tokens), Err(ParseError::InvertedSpan { .. })));
    }

    #[test]
    fn test_parse_error_degrades_to_error_node() {
        let mut tokens = tokenize("apple", 0);
        tokens[0].start = 4;
        tokens[0].end = 2;
        let root = root_from_tokens("Line 1", "apple", 0, &tokens);

        let children = children(&root);
        assert_eq!(children.len(), 1);
        assert!(matches!(&children[0], QueryNode::Error { message, span }
            if message.starts_with("Parse Error") && *span == Span::new(0, 5)));
    }

    #[test]
    fn test_descriptions() {
        let nodes = build_tree(&tokenize("the *ing app*", 0)).unwrap();
        assert!(matches!(&nodes[0], QueryNode::Term { description, .. } if description.starts_with("Noise word")));
        assert!(matches!(&nodes[1], QueryNode::Wildcard { description, .. } if description.starts_with("Leading wildcard")));
        assert!(matches!(&nodes[2], QueryNode::Wildcard { description, .. } if description.starts_with("Wildcard")));
    }

    #[test]
    fn test_detect_errors() {
        let nodes = detect_errors("((a OR *b \"c", 10);
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[0], QueryNode::Error { message, .. } if message.contains("2 missing")));
        assert!(matches!(&nodes[1], QueryNode::Error { span, .. } if span.start == 20));
        assert!(matches!(&nodes[2], QueryNode::Warning { span, .. } if *span == Span::new(17, 19)));
    }

    #[test]
    fn test_detect_errors_clean_line() {
        assert!(detect_errors("apple AND orange*", 0).is_empty());
    }

    #[test]
    fn test_query_trees_one_root_per_line() {
        let text = "apple AND orange\n\n// comment\n(red OR blue\n";
        let roots = build_query_trees(text);
        assert_eq!(roots.len(), 2);
        assert!(matches!(&roots[0], QueryNode::Root { label, .. } if label == "Line 1"));
        assert_eq!(roots[1].span(), Span::new(29, 41));
        assert!(children(&roots[1]).iter().any(|n| matches!(n, QueryNode::Error { .. })));
        for root in &roots {
            assert_spans_nested(root);
        }
    }

    #[test]
    fn test_custom_tree() {
        let root = build_custom_tree("x W/5 y", "Custom");
        assert!(matches!(&root, QueryNode::Root { label, .. } if label == "Custom"));
        assert_spans_nested(&root);
    }
}
