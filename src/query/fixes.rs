//! Fix suggestions.
//!
//! Every auto-fix is a pure text transform that doubles as its own detector:
//! a fix is offered only when its transform changes the text, and
//! [`Fix::apply`] re-runs the transform, so applying a stale or repeated fix
//! is a no-op. Advisories carry no transform and return their input.

use crate::query::balance::{in_quotes, query_paren_balance, quote_count, quoted_ranges, unmatched_quote};
use crate::query::diagnostics::{validate_with, RuleCode};
use crate::query::lexer::{tokenize, Token, TokenKind};
use crate::utils::app_data::AnalyzerConfig;
use crate::utils::lines::{lines_with_offsets, map_lines, map_query_lines};
use memchr::memrchr_iter;
use regex::{Captures, Regex};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

/// Transform carried by a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FixAction {
    NormalizeProximity,
    NormalizeOperatorCase,
    RemoveDuplicateOperators,
    CollapseWhitespace,
    /// Close the phrase left open on one 1-based line
    BalanceQuotes { line: usize },
    BalanceParentheses,
    ClampProximity { max: u32 },
    /// Needs user judgment; applying returns the input unchanged
    Advisory,
}

/// A suggested fix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix {
    pub code: &'static str,
    pub description: String,
    /// 1-based line the fix is about, when it is about one line
    pub line_number: Option<usize>,
    pub auto_fixable: bool,
    pub action: FixAction,
}

impl Fix {
    fn auto(code: &'static str, description: String, line_number: Option<usize>, action: FixAction) -> Self {
        Self {
            code,
            description,
            line_number,
            auto_fixable: true,
            action,
        }
    }

    fn advisory(code: &'static str, description: String, line_number: usize) -> Self {
        Self {
            code,
            description,
            line_number: Some(line_number),
            auto_fixable: false,
            action: FixAction::Advisory,
        }
    }

    /// Apply the fix to `text`, returning the new text
    pub fn apply(&self, text: &str) -> String {
        match self.action {
            FixAction::NormalizeProximity => normalize_proximity_syntax(text),
            FixAction::NormalizeOperatorCase => normalize_operator_case(text),
            FixAction::RemoveDuplicateOperators => remove_duplicate_operators(text),
            FixAction::CollapseWhitespace => collapse_whitespace(text),
            FixAction::BalanceQuotes { line } => map_query_lines(text, |n, l| {
                if n == line {
                    balance_quotes_line(l)
                } else {
                    l.to_string()
                }
            }),
            FixAction::BalanceParentheses => fix_unbalanced_parentheses(text),
            FixAction::ClampProximity { max } => clamp_proximity_ranges(text, max),
            FixAction::Advisory => text.to_string(),
        }
    }
}

static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid whitespace regex"));

static GLUED_PROXIMITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(w|pre)(\d+)\b").expect("valid glued proximity regex"));

static NESTED_WILDCARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+\*\w+\*").expect("valid nested wildcard regex"));

/// Append missing `)` to the last query line, or drop the last surplus `)`
/// characters. Blank and `//` comment lines are neither counted nor edited.
pub fn fix_unbalanced_parentheses(text: &str) -> String {
    let balance = query_paren_balance(text);
    if balance == 0 {
        return text.to_string();
    }

    if balance > 0 {
        let last = lines_with_offsets(text)
            .filter(|line| line.is_query())
            .last()
            .map(|line| line.number);
        return map_lines(text, |n, line| {
            if Some(n) == last {
                let mut out = String::with_capacity(line.len() + balance as usize);
                out.push_str(line);
                out.extend(std::iter::repeat_n(')', balance as usize));
                out
            } else {
                line.to_string()
            }
        });
    }

    // Surplus `)` offsets per line, taken from the end of the text
    let mut surplus = balance.unsigned_abs() as usize;
    let mut drops: FxHashMap<usize, FxHashSet<usize>> = FxHashMap::default();
    let query_lines: Vec<_> = lines_with_offsets(text).filter(|l| l.is_query()).collect();
    for line in query_lines.iter().rev() {
        if surplus == 0 {
            break;
        }
        let found: FxHashSet<usize> = memrchr_iter(b')', line.text.as_bytes()).take(surplus).collect();
        surplus -= found.len();
        if !found.is_empty() {
            drops.insert(line.number, found);
        }
    }

    map_lines(text, |n, line| match drops.get(&n) {
        Some(drop) => line
            .char_indices()
            .filter(|(i, _)| !drop.contains(i))
            .map(|(_, ch)| ch)
            .collect::<String>()
            .trim()
            .to_string(),
        None => line.to_string(),
    })
}

/// Close the open phrase on every line with an odd number of quotes
pub fn fix_unbalanced_quotes(text: &str) -> String {
    map_query_lines(text, |_, line| balance_quotes_line(line))
}

/// Close the phrase before the next connective after the unmatched quote, or
/// at the end of the line when there is none
fn balance_quotes_line(line: &str) -> String {
    if quote_count(line) % 2 == 0 {
        return line.to_string();
    }
    let Some(quote) = unmatched_quote(line) else {
        return line.to_string();
    };

    let after = &line[quote + 1..];
    let insert_at = tokenize(after, 0)
        .iter()
        .find(|t| t.connective().is_some())
        .map(|t| after[..t.start].trim_end().len())
        .filter(|&len| len > 0)
        .map(|len| quote + 1 + len);

    match insert_at {
        Some(at) => format!("{}\"{}", &line[..at], &line[at..]),
        None => format!("{}\"", line.trim_end()),
    }
}

/// Collapse `AND AND` style runs of the same connective. `NOT NOT` is kept.
pub fn remove_duplicate_operators(text: &str) -> String {
    map_query_lines(text, |_, line| {
        let tokens = tokenize(line, 0);
        let mut cuts = Vec::new();
        for pair in tokens.windows(2) {
            let (Some(a), Some(b)) = (pair[0].connective(), pair[1].connective()) else {
                continue;
            };
            if a == b && !a.is_not() && line[pair[0].end..pair[1].start].trim().is_empty() {
                cuts.push((pair[0].end, pair[1].end));
            }
        }
        splice(line, cuts.into_iter().map(|(start, end)| (start, end, String::new())))
    })
}

/// Collapse runs of spaces and tabs and trim every query line
pub fn collapse_whitespace(text: &str) -> String {
    map_query_lines(text, |_, line| SPACE_RUN.replace_all(line, " ").trim().to_string())
}

/// `w5` becomes `w/5` and `pre3` becomes `pre/3`, outside phrases
pub fn normalize_proximity_syntax(text: &str) -> String {
    map_query_lines(text, |_, line| {
        let ranges = quoted_ranges(line);
        GLUED_PROXIMITY
            .replace_all(line, |caps: &Captures| {
                let whole = &caps[0];
                let in_phrase = caps.get(0).is_some_and(|m| in_quotes(&ranges, m.start()));
                if in_phrase {
                    whole.to_string()
                } else {
                    format!("{}/{}", &caps[1], &caps[2])
                }
            })
            .into_owned()
    })
}

/// Rewrite operator keywords in their canonical upper-case spelling
pub fn normalize_operator_case(text: &str) -> String {
    map_query_lines(text, |_, line| {
        let edits = tokenize(line, 0).into_iter().filter_map(|t| {
            let canonical = t.operator?.to_string();
            (canonical != t.text).then_some((t.start, t.end, canonical))
        });
        splice(line, edits)
    })
}

/// Clamp `W/n` and `PRE/n` distances above `max` down to `max`
pub fn clamp_proximity_ranges(text: &str, max: u32) -> String {
    map_query_lines(text, |_, line| {
        let edits = tokenize(line, 0).into_iter().filter_map(|t| {
            let distance = t.operator?.distance()?;
            if distance <= max {
                return None;
            }
            let prefix = t.text.split('/').next().unwrap_or("W");
            Some((t.start, t.end, format!("{}/{}", prefix, max)))
        });
        splice(line, edits)
    })
}

/// Replace sorted, non-overlapping byte ranges of `line`
fn splice(line: &str, edits: impl IntoIterator<Item = (usize, usize, String)>) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for (start, end, replacement) in edits {
        out.push_str(&line[last..start]);
        out.push_str(&replacement);
        last = end;
    }
    out.push_str(&line[last..]);
    out
}

/// 1-based number of the first line that differs between `before` and `after`
fn first_changed_line(before: &str, after: &str) -> Option<usize> {
    before
        .split('\n')
        .zip(after.split('\n'))
        .position(|(a, b)| a != b)
        .map(|i| i + 1)
}

/// Suggest fixes with the default configuration
pub fn suggest_fixes(text: &str) -> Vec<Fix> {
    suggest_fixes_with(text, &AnalyzerConfig::default())
}

/// Alias kept for callers that analyze and fix in one step
pub fn analyze_and_suggest_fixes(query: &str) -> Vec<Fix> {
    suggest_fixes(query)
}

/// Suggest fixes in their declared application order
pub fn suggest_fixes_with(text: &str, config: &AnalyzerConfig) -> Vec<Fix> {
    let mut fixes = Vec::new();

    let whole_text: [(&'static str, &str, FixAction, fn(&str) -> String); 4] = [
        (
            "normalize-proximity",
            "Insert the missing '/' in proximity operators (w5 -> w/5)",
            FixAction::NormalizeProximity,
            normalize_proximity_syntax,
        ),
        (
            "normalize-operator-case",
            "Write operators in upper case",
            FixAction::NormalizeOperatorCase,
            normalize_operator_case,
        ),
        (
            "remove-duplicate-operators",
            "Remove repeated operators",
            FixAction::RemoveDuplicateOperators,
            remove_duplicate_operators,
        ),
        (
            "collapse-whitespace",
            "Collapse repeated spaces and trim lines",
            FixAction::CollapseWhitespace,
            collapse_whitespace,
        ),
    ];
    for (code, description, action, transform) in whole_text {
        let fixed = transform(text);
        if fixed != text {
            let line = first_changed_line(text, &fixed);
            fixes.push(Fix::auto(code, description.to_string(), line, action));
        }
    }

    for line in lines_with_offsets(text).filter(|l| l.is_query() && quote_count(l.text) % 2 == 1) {
        fixes.push(Fix::auto(
            "balance-quotes",
            format!("Close the open quote on line {}", line.number),
            Some(line.number),
            FixAction::BalanceQuotes { line: line.number },
        ));
    }

    let balance = query_paren_balance(text);
    if balance != 0 {
        let description = if balance > 0 {
            format!("Add {} missing closing parenthes{}", balance, if balance == 1 { "is" } else { "es" })
        } else {
            format!("Remove {} extra closing parenthes{}", -balance, if balance == -1 { "is" } else { "es" })
        };
        fixes.push(Fix::auto("balance-parentheses", description, None, FixAction::BalanceParentheses));
    }

    let max = config.max_proximity_distance;
    let clamped = clamp_proximity_ranges(text, max);
    if clamped != text {
        fixes.push(Fix::auto(
            "clamp-proximity",
            format!("Reduce proximity ranges wider than {} words to {}", max, max),
            first_changed_line(text, &clamped),
            FixAction::ClampProximity { max },
        ));
    }

    fixes.extend(advisories(text, config));
    debug!(count = fixes.len(), "fix suggestions built");
    fixes
}

fn advisories(text: &str, config: &AnalyzerConfig) -> Vec<Fix> {
    let mut out = Vec::new();

    let mut ambiguous_lines = FxHashSet::default();
    for d in validate_with(text, config) {
        match d.rule {
            RuleCode::AmbiguousProximityComplex | RuleCode::AmbiguousProximityNested
                if ambiguous_lines.insert(d.span.line) =>
            {
                out.push(Fix::advisory(
                    "ambiguous-proximity",
                    "Split the proximity search so each side is a single term or phrase".to_string(),
                    d.span.line,
                ));
            }
            RuleCode::LeadingWildcard => out.push(Fix::advisory(
                "leading-wildcard",
                format!("{}; anchor the wildcard with a leading letter", d.message),
                d.span.line,
            )),
            _ => {}
        }
    }

    for line in lines_with_offsets(text).filter(|l| l.is_query()) {
        for group in or_groups(&tokenize(line.text, 0)) {
            if group.terms > config.max_or_terms {
                out.push(Fix::advisory(
                    "large-or-group",
                    format!(
                        "OR group with {} terms; consider splitting it into several queries",
                        group.terms
                    ),
                    line.number,
                ));
            }
            if group.leading_wildcards > 1 {
                out.push(Fix::advisory(
                    "multiple-leading-wildcards",
                    format!(
                        "{} leading wildcards in one OR group multiply the expansion cost",
                        group.leading_wildcards
                    ),
                    line.number,
                ));
            }
        }

        for m in NESTED_WILDCARD.find_iter(line.text) {
            out.push(Fix::advisory(
                "nested-wildcard",
                format!("'{}' uses several wildcards in one word; simplify it", m.as_str()),
                line.number,
            ));
        }
    }

    out
}

/// Terms and leading wildcards joined by OR at one nesting level
#[derive(Debug, Default)]
struct OrGroup {
    or_count: usize,
    terms: usize,
    leading_wildcards: usize,
}

fn or_groups(tokens: &[Token]) -> Vec<OrGroup> {
    let mut stack = vec![OrGroup::default()];
    let mut done = Vec::new();

    for token in tokens {
        match token.kind {
            TokenKind::GroupStart => stack.push(OrGroup::default()),
            TokenKind::GroupEnd if stack.len() > 1 => {
                if let Some(group) = stack.pop() {
                    done.push(group);
                }
                if let Some(parent) = stack.last_mut() {
                    parent.terms += 1;
                }
            }
            TokenKind::GroupEnd => {}
            TokenKind::Operator => {
                if let Some(group) = stack.last_mut() {
                    group.or_count += usize::from(token.connective().is_some_and(|op| op.is_or()));
                }
            }
            TokenKind::Term | TokenKind::Phrase | TokenKind::Wildcard => {
                if let Some(group) = stack.last_mut() {
                    group.terms += 1;
                    let leading = token.kind == TokenKind::Wildcard
                        && (token.text.starts_with('*') || token.text.starts_with('?'));
                    group.leading_wildcards += usize::from(leading);
                }
            }
        }
    }
    done.extend(stack);
    done.retain(|g| g.or_count > 0);
    done
}

/// Apply `fixes` in order, each to the previous output
pub fn apply_all_fixes(text: &str, fixes: &[Fix]) -> String {
    fixes
        .iter()
        .fold(text.to_string(), |current, fix| fix.apply(&current))
}
