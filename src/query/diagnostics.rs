//! Line-by-line query validation.
//!
//! Every line is checked on its own against a fixed battery of rules. Each
//! finding carries a stable [`RuleCode`] so callers can filter or disable
//! rules. A validation pass always produces a complete, fresh list.

use crate::query::balance::{mask_quoted, match_parens, quote_count, unmatched_quote};
use crate::query::lexer::{tokenize, Token, TokenKind};
use crate::query::vocabulary::Operator;
use crate::utils::app_data::AnalyzerConfig;
use crate::utils::lines::{lines_with_offsets, Line};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Stable rule identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCode {
    ConsecutiveOperators,
    OperatorAtStart,
    OperatorAtEnd,
    MixedOperatorsInParens,
    SuggestParentheses,
    MixedOperatorsNeedParens,
    ProximityWithoutTerms,
    AmbiguousProximityComplex,
    AmbiguousProximityNested,
    MultipleProximityOperators,
    InvalidProximity,
    EmptyParentheses,
    RedundantParentheses,
    NestedParentheses,
    DoubleNegation,
    OperatorInQuotes,
    UnbalancedParentheses,
    UnbalancedQuotes,
    LeadingWildcard,
}

impl RuleCode {
    pub const ALL: [RuleCode; 19] = [
        RuleCode::ConsecutiveOperators,
        RuleCode::OperatorAtStart,
        RuleCode::OperatorAtEnd,
        RuleCode::MixedOperatorsInParens,
        RuleCode::SuggestParentheses,
        RuleCode::MixedOperatorsNeedParens,
        RuleCode::ProximityWithoutTerms,
        RuleCode::AmbiguousProximityComplex,
        RuleCode::AmbiguousProximityNested,
        RuleCode::MultipleProximityOperators,
        RuleCode::InvalidProximity,
        RuleCode::EmptyParentheses,
        RuleCode::RedundantParentheses,
        RuleCode::NestedParentheses,
        RuleCode::DoubleNegation,
        RuleCode::OperatorInQuotes,
        RuleCode::UnbalancedParentheses,
        RuleCode::UnbalancedQuotes,
        RuleCode::LeadingWildcard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCode::ConsecutiveOperators => "consecutive-operators",
            RuleCode::OperatorAtStart => "operator-at-start",
            RuleCode::OperatorAtEnd => "operator-at-end",
            RuleCode::MixedOperatorsInParens => "mixed-operators-in-parens",
            RuleCode::SuggestParentheses => "suggest-parentheses",
            RuleCode::MixedOperatorsNeedParens => "mixed-operators-need-parens",
            RuleCode::ProximityWithoutTerms => "proximity-without-terms",
            RuleCode::AmbiguousProximityComplex => "ambiguous-proximity-complex",
            RuleCode::AmbiguousProximityNested => "ambiguous-proximity-nested",
            RuleCode::MultipleProximityOperators => "multiple-proximity-operators",
            RuleCode::InvalidProximity => "invalid-proximity",
            RuleCode::EmptyParentheses => "empty-parentheses",
            RuleCode::RedundantParentheses => "redundant-parentheses",
            RuleCode::NestedParentheses => "nested-parentheses",
            RuleCode::DoubleNegation => "double-negation",
            RuleCode::OperatorInQuotes => "operator-in-quotes",
            RuleCode::UnbalancedParentheses => "unbalanced-parentheses",
            RuleCode::UnbalancedQuotes => "unbalanced-quotes",
            RuleCode::LeadingWildcard => "leading-wildcard",
        }
    }

    pub fn from_code(code: &str) -> Option<RuleCode> {
        RuleCode::ALL.into_iter().find(|rule| rule.as_str() == code)
    }

    pub fn severity(&self) -> Severity {
        match self {
            RuleCode::OperatorAtStart
            | RuleCode::OperatorAtEnd
            | RuleCode::MixedOperatorsInParens
            | RuleCode::InvalidProximity
            | RuleCode::UnbalancedParentheses
            | RuleCode::UnbalancedQuotes => Severity::Error,
            RuleCode::ConsecutiveOperators
            | RuleCode::MixedOperatorsNeedParens
            | RuleCode::ProximityWithoutTerms
            | RuleCode::AmbiguousProximityComplex
            | RuleCode::AmbiguousProximityNested
            | RuleCode::EmptyParentheses
            | RuleCode::LeadingWildcard => Severity::Warning,
            RuleCode::SuggestParentheses
            | RuleCode::MultipleProximityOperators
            | RuleCode::RedundantParentheses
            | RuleCode::NestedParentheses
            | RuleCode::DoubleNegation
            | RuleCode::OperatorInQuotes => Severity::Info,
        }
    }
}

/// Location of a diagnostic: 1-based line, byte columns `start_col..end_col`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineSpan {
    pub line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule: RuleCode,
    pub severity: Severity,
    pub message: String,
    pub span: LineSpan,
}

impl Diagnostic {
    pub fn code(&self) -> &'static str {
        self.rule.as_str()
    }
}

static INVALID_PROXIMITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:W|PRE)/").expect("valid proximity prefix regex"));

static EMPTY_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\)").expect("valid empty parentheses regex"));

static SINGLE_WORD_PARENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*([\w*?]+)\s*\)").expect("valid single word parentheses regex")
});

/// Connective keywords in any case
static QUOTED_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ANDANY|AND|OR|NOT|NEAR|WITHIN|W/\d+|PRE/\d+)\b")
        .expect("valid quoted operator regex")
});

/// Validate every query line with the default configuration
pub fn validate(text: &str) -> Vec<Diagnostic> {
    validate_with(text, &AnalyzerConfig::default())
}

/// Validate every query line, skipping rules listed in `config.disabled_rules`
pub fn validate_with(text: &str, config: &AnalyzerConfig) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = lines_with_offsets(text)
        .filter(|line| line.is_query())
        .flat_map(|line| LineChecker::new(line).run())
        .filter(|d| !config.is_rule_disabled(d.rule))
        .collect();

    diagnostics.sort_by(|a, b| {
        (a.span.line, a.span.start_col, a.rule.as_str())
            .cmp(&(b.span.line, b.span.start_col, b.rule.as_str()))
    });
    debug!(count = diagnostics.len(), "validation finished");
    diagnostics
}

/// Item at one nesting level of a line
#[derive(Debug, Clone, Copy)]
enum Element {
    Operand {
        start: usize,
        end: usize,
    },
    Group {
        start: usize,
        end: usize,
        has_boolean: bool,
        has_proximity: bool,
    },
    Op {
        start: usize,
        end: usize,
        op: Operator,
    },
}

impl Element {
    fn bounds(&self) -> (usize, usize) {
        match *self {
            Element::Operand { start, end }
            | Element::Group { start, end, .. }
            | Element::Op { start, end, .. } => (start, end),
        }
    }

    fn is_operand(&self) -> bool {
        matches!(self, Element::Operand { .. } | Element::Group { .. })
    }

    fn op(&self) -> Option<Operator> {
        match self {
            Element::Op { op, .. } => Some(*op),
            _ => None,
        }
    }
}

/// Elements collected between a `(` and its `)`; the bottom frame is the line
struct LevelFrame {
    open: Option<usize>,
    elements: Vec<Element>,
    has_boolean: bool,
    has_proximity: bool,
}

impl LevelFrame {
    fn new(open: Option<usize>) -> Self {
        Self {
            open,
            elements: Vec::new(),
            has_boolean: false,
            has_proximity: false,
        }
    }
}

struct LineChecker<'a> {
    line: Line<'a>,
    tokens: Vec<Token>,
    /// Line text with phrase content blanked out
    masked: String,
    out: Vec<Diagnostic>,
}

impl<'a> LineChecker<'a> {
    fn new(line: Line<'a>) -> Self {
        Self {
            line,
            tokens: tokenize(line.text, 0),
            masked: mask_quoted(line.text),
            out: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Diagnostic> {
        self.check_adjacent_operators();
        self.check_line_edges();
        self.check_levels();
        self.check_invalid_proximity();
        self.check_parenthesis_style();
        self.check_nested_parentheses();
        self.check_operators_in_quotes();
        self.check_balance();
        self.check_leading_wildcards();
        self.out
    }

    fn emit(&mut self, rule: RuleCode, start: usize, end: usize, message: String) {
        self.out.push(Diagnostic {
            rule,
            severity: rule.severity(),
            message,
            span: LineSpan {
                line: self.line.number,
                start_col: start,
                end_col: end,
            },
        });
    }

    fn check_adjacent_operators(&mut self) {
        let mut found = Vec::new();
        for pair in self.tokens.windows(2) {
            let (Some(a), Some(b)) = (pair[0].connective(), pair[1].connective()) else {
                continue;
            };
            let span = (pair[0].start, pair[1].end);
            let text = format!("{} {}", pair[0].text, pair[1].text);

            if a.is_not() && b.is_not() {
                found.push((
                    RuleCode::DoubleNegation,
                    span,
                    format!("Double negation '{}' cancels itself out", text),
                ));
            } else if a.is_proximity_connective() && b.is_proximity_connective() {
                found.push((
                    RuleCode::ProximityWithoutTerms,
                    span,
                    format!("Proximity operators '{}' need a search term between them", text),
                ));
            } else if b.is_not() || (a.is_not() && b.is_proximity_connective()) {
                // `AND NOT x` and `NOT W/5` are valid forms
            } else {
                found.push((
                    RuleCode::ConsecutiveOperators,
                    span,
                    format!("Consecutive operators '{}': a search term is missing", text),
                ));
            }
        }
        for (rule, (start, end), message) in found {
            self.emit(rule, start, end, message);
        }
    }

    fn check_line_edges(&mut self) {
        let first = self
            .tokens
            .first()
            .and_then(|t| t.connective().map(|op| (op, t.start, t.end, t.text.clone())));
        if let Some((op, start, end, text)) = first {
            if !op.is_not() {
                self.emit(
                    RuleCode::OperatorAtStart,
                    start,
                    end,
                    format!("Query cannot start with operator '{}'", text),
                );
            }
        }

        let last = self
            .tokens
            .last()
            .and_then(|t| t.connective().map(|_| (t.start, t.end, t.text.clone())));
        if let Some((start, end, text)) = last {
            self.emit(
                RuleCode::OperatorAtEnd,
                start,
                end,
                format!("Query cannot end with operator '{}'", text),
            );
        }
    }

    /// Rules that look at the operators of one nesting level
    fn check_levels(&mut self) {
        let mut stack = vec![LevelFrame::new(None)];
        let mut closed: Vec<(LevelFrame, usize)> = Vec::new();

        for token in &self.tokens {
            match token.kind {
                TokenKind::GroupStart => stack.push(LevelFrame::new(Some(token.start))),
                TokenKind::GroupEnd => {
                    if stack.len() > 1 {
                        if let Some(frame) = stack.pop() {
                            close_frame(&mut stack, &mut closed, frame, token.end);
                        }
                    }
                }
                TokenKind::Operator => {
                    if let (Some(op), Some(frame)) = (token.connective(), stack.last_mut()) {
                        frame.has_boolean |= op.is_and() || op.is_or();
                        frame.has_proximity |= op.is_proximity_connective();
                        frame.elements.push(Element::Op {
                            start: token.start,
                            end: token.end,
                            op,
                        });
                    }
                }
                TokenKind::Term | TokenKind::Phrase | TokenKind::Wildcard => {
                    if let Some(frame) = stack.last_mut() {
                        frame.elements.push(Element::Operand {
                            start: token.start,
                            end: token.end,
                        });
                    }
                }
            }
        }

        while stack.len() > 1 {
            if let Some(frame) = stack.pop() {
                let end = frame
                    .elements
                    .last()
                    .map(|e| e.bounds().1)
                    .or(frame.open.map(|o| o + 1))
                    .unwrap_or(0);
                close_frame(&mut stack, &mut closed, frame, end);
            }
        }

        for (frame, end) in &closed {
            self.check_level(&frame.elements, frame.open.map(|open| (open, *end)));
        }
        if let Some(root) = stack.pop() {
            self.check_level(&root.elements, None);
            self.check_mixed_chains(&root.elements);
        }
    }

    fn check_level(&mut self, elements: &[Element], group: Option<(usize, usize)>) {
        if let Some((open, close)) = group {
            let has_and = elements.iter().any(|e| e.op().is_some_and(|op| op.is_and()));
            let has_or = elements.iter().any(|e| e.op().is_some_and(|op| op.is_or()));
            if has_and && has_or {
                self.emit(
                    RuleCode::MixedOperatorsInParens,
                    open,
                    close,
                    "AND and OR mixed in one parenthesized group; nest them explicitly".to_string(),
                );
            }
        }

        let proximity: Vec<(usize, usize)> = elements
            .iter()
            .filter(|e| e.op().is_some_and(|op| op.is_proximity_connective()))
            .map(|e| e.bounds())
            .collect();
        if proximity.len() >= 2 {
            let start = proximity[0].0;
            let end = proximity[proximity.len() - 1].1;
            self.emit(
                RuleCode::MultipleProximityOperators,
                start,
                end,
                format!(
                    "{} proximity operators in one chain; results depend on evaluation order",
                    proximity.len()
                ),
            );
        }

        for window in elements.windows(3) {
            let (
                Element::Group {
                    start,
                    has_boolean: left_bool,
                    has_proximity: left_prox,
                    ..
                },
                Some(op),
                Element::Group {
                    end,
                    has_boolean: right_bool,
                    has_proximity: right_prox,
                    ..
                },
            ) = (window[0], window[1].op(), window[2])
            else {
                continue;
            };
            if !op.is_proximity_connective() {
                continue;
            }
            if left_prox || right_prox {
                self.emit(
                    RuleCode::AmbiguousProximityNested,
                    start,
                    end,
                    format!("'{}' joins groups that contain proximity operators; nesting is ambiguous", op),
                );
            } else if left_bool || right_bool {
                self.emit(
                    RuleCode::AmbiguousProximityComplex,
                    start,
                    end,
                    format!("'{}' joins groups that contain AND/OR; proximity over boolean groups is ambiguous", op),
                );
            }
        }
    }

    /// `a AND b OR c` reads the way AND>OR binds; `a OR b AND c` does not
    fn check_mixed_chains(&mut self, elements: &[Element]) {
        for window in elements.windows(5) {
            if !(window[0].is_operand() && window[2].is_operand() && window[4].is_operand()) {
                continue;
            }
            let (Some(first), Some(second)) = (window[1].op(), window[3].op()) else {
                continue;
            };
            let start = window[0].bounds().0;
            let end = window[4].bounds().1;
            if first.is_and() && second.is_or() {
                self.emit(
                    RuleCode::SuggestParentheses,
                    start,
                    end,
                    "AND binds tighter than OR; consider parentheses to make the grouping explicit"
                        .to_string(),
                );
            } else if first.is_or() && second.is_and() {
                self.emit(
                    RuleCode::MixedOperatorsNeedParens,
                    start,
                    end,
                    "AND binds tighter than OR, so this evaluates as 'a OR (b AND c)'; add parentheses"
                        .to_string(),
                );
            }
        }
    }

    fn check_invalid_proximity(&mut self) {
        let found: Vec<(usize, usize, String)> = INVALID_PROXIMITY
            .find_iter(&self.masked)
            .filter(|m| {
                !self.masked[m.end()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit())
            })
            .map(|m| (m.start(), m.end(), m.as_str().to_string()))
            .collect();
        for (start, end, text) in found {
            self.emit(
                RuleCode::InvalidProximity,
                start,
                end,
                format!("'{}' must be followed by a word distance, e.g. {}5", text, text),
            );
        }
    }

    /// `date(2023)` and `creditcard()` are function calls, not groups
    fn is_call(&self, open: usize) -> bool {
        self.masked[..open]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric())
    }

    fn check_parenthesis_style(&mut self) {
        let empty: Vec<(usize, usize)> = EMPTY_PARENS
            .find_iter(&self.masked)
            .filter(|m| !self.is_call(m.start()))
            .map(|m| (m.start(), m.end()))
            .collect();
        for (start, end) in empty {
            self.emit(
                RuleCode::EmptyParentheses,
                start,
                end,
                "Empty parentheses".to_string(),
            );
        }

        let single: Vec<(usize, usize, String)> = SINGLE_WORD_PARENS
            .captures_iter(&self.masked)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let word = caps.get(1)?.as_str();
                if self.is_call(whole.start()) || Operator::parse(word).is_some() {
                    return None;
                }
                Some((whole.start(), whole.end(), word.to_string()))
            })
            .collect();
        for (start, end, word) in single {
            self.emit(
                RuleCode::RedundantParentheses,
                start,
                end,
                format!("Parentheses around the single term '{}' are redundant", word),
            );
        }
    }

    fn check_nested_parentheses(&mut self) {
        // (open offset, is call, contains a nested group)
        let mut stack: Vec<(usize, bool, bool)> = Vec::new();
        let mut found = Vec::new();

        for (i, ch) in self.masked.char_indices() {
            if ch == '(' {
                stack.push((i, self.is_call(i), false));
            } else if ch == ')' {
                let Some((open, is_call, nested)) = stack.pop() else {
                    continue;
                };
                match stack.last_mut() {
                    Some(parent) => parent.2 |= nested || !is_call,
                    None if nested && !is_call => found.push((open, i + 1)),
                    None => {}
                }
            }
        }

        for (start, end) in found {
            self.emit(
                RuleCode::NestedParentheses,
                start,
                end,
                "Nested parentheses; check the grouping matches the intended evaluation order"
                    .to_string(),
            );
        }
    }

    fn check_operators_in_quotes(&mut self) {
        let mut found = Vec::new();
        for token in self.tokens.iter().filter(|t| t.kind == TokenKind::Phrase) {
            let content = token.phrase_content();
            let offset = token.start + 1;
            for m in QUOTED_OPERATOR.find_iter(content) {
                found.push((offset + m.start(), offset + m.end(), m.as_str().to_string()));
            }
        }
        for (start, end, op) in found {
            self.emit(
                RuleCode::OperatorInQuotes,
                start,
                end,
                format!("Operator '{}' inside quotes is searched as literal text", op),
            );
        }
    }

    fn check_balance(&mut self) {
        let text = self.line.text;
        for offset in match_parens(text).unmatched {
            let message = if text.as_bytes()[offset] == b'(' {
                "Unmatched opening parenthesis"
            } else {
                "Unmatched closing parenthesis"
            };
            self.emit(
                RuleCode::UnbalancedParentheses,
                offset,
                offset + 1,
                message.to_string(),
            );
        }

        if quote_count(text) % 2 == 1 {
            if let Some(offset) = unmatched_quote(text) {
                self.emit(
                    RuleCode::UnbalancedQuotes,
                    offset,
                    text.len(),
                    "Unmatched quote: the phrase is never closed".to_string(),
                );
            }
        }
    }

    fn check_leading_wildcards(&mut self) {
        let found: Vec<(usize, usize, String)> = self
            .tokens
            .iter()
            .filter(|t| {
                t.kind == TokenKind::Wildcard
                    && t.text.len() > 1
                    && (t.text.starts_with('*') || t.text.starts_with('?'))
            })
            .map(|t| (t.start, t.end, t.text.clone()))
            .collect();
        for (start, end, text) in found {
            self.emit(
                RuleCode::LeadingWildcard,
                start,
                end,
                format!("Leading wildcard '{}' expands against the whole index and can be very slow", text),
            );
        }
    }
}

fn close_frame(
    stack: &mut [LevelFrame],
    closed: &mut Vec<(LevelFrame, usize)>,
    frame: LevelFrame,
    end: usize,
) {
    let group = Element::Group {
        start: frame.open.unwrap_or(0),
        end,
        has_boolean: frame.has_boolean,
        has_proximity: frame.has_proximity,
    };
    if let Some(parent) = stack.last_mut() {
        parent.has_boolean |= frame.has_boolean;
        parent.has_proximity |= frame.has_proximity;
        parent.elements.push(group);
    }
    closed.push((frame, end));
}
