//! Parenthesis and quote balance.
//!
//! These scans work on raw text and do not depend on the lexer.
//!
//! [`paren_balance`] is a plain count: `)(` reports 0 even though the order is
//! wrong. Use [`match_parens`] when the order matters.

use crate::utils::lines::lines_with_offsets;
use memchr::{memchr2_iter, memchr_iter};
use serde::Serialize;
use std::ops::Range;

/// Count of `(` minus count of `)`.
///
/// Positive means missing closing parentheses, negative means extra ones.
pub fn paren_balance(text: &str) -> i64 {
    let bytes = text.as_bytes();
    memchr2_iter(b'(', b')', bytes).fold(0i64, |balance, i| {
        if bytes[i] == b'(' {
            balance + 1
        } else {
            balance - 1
        }
    })
}

/// [`paren_balance`] over query lines only; blank and `//` comment lines
/// are not counted
pub fn query_paren_balance(text: &str) -> i64 {
    lines_with_offsets(text)
        .filter(|line| line.is_query())
        .map(|line| paren_balance(line.text))
        .sum()
}

/// 1 if any line has an odd number of `"`, otherwise 0
pub fn quote_balance(text: &str) -> u8 {
    if text.split('\n').any(|line| quote_count(line) % 2 == 1) {
        1
    } else {
        0
    }
}

/// 1-based numbers of the lines with an odd number of `"`
pub fn unbalanced_quote_lines(text: &str) -> Vec<usize> {
    text.split('\n')
        .enumerate()
        .filter(|(_, line)| quote_count(line) % 2 == 1)
        .map(|(i, _)| i + 1)
        .collect()
}

pub fn quote_count(text: &str) -> usize {
    memchr_iter(b'"', text.as_bytes()).count()
}

/// Byte ranges of matched `"…"` pairs, quotes included. A trailing unpaired
/// quote is not part of any range.
pub fn quoted_ranges(text: &str) -> Vec<Range<usize>> {
    let positions: Vec<usize> = memchr_iter(b'"', text.as_bytes()).collect();
    positions
        .chunks_exact(2)
        .map(|pair| pair[0]..pair[1] + 1)
        .collect()
}

/// Byte offset of the quote left without a partner, if the count is odd
pub fn unmatched_quote(text: &str) -> Option<usize> {
    let positions: Vec<usize> = memchr_iter(b'"', text.as_bytes()).collect();
    if positions.len() % 2 == 1 {
        positions.last().copied()
    } else {
        None
    }
}

/// Whether `offset` falls inside a matched quote pair. `ranges` must be
/// sorted and disjoint, as [`quoted_ranges`] returns them.
pub fn in_quotes(ranges: &[Range<usize>], offset: usize) -> bool {
    let idx = ranges.partition_point(|r| r.end <= offset);
    ranges.get(idx).is_some_and(|r| r.start <= offset)
}

/// Replace the content of matched quote pairs with spaces, keeping byte
/// offsets stable, so structural regexes do not see phrase text.
pub fn mask_quoted(text: &str) -> String {
    let ranges = quoted_ranges(text);
    if ranges.is_empty() {
        return text.to_string();
    }

    let mut pending = ranges.iter().peekable();
    let mut out = String::with_capacity(text.len());
    for (i, ch) in text.char_indices() {
        while pending.next_if(|r| r.end <= i).is_some() {}
        let masked = ch != '"' && pending.peek().is_some_and(|r| r.start <= i);
        if masked {
            out.extend(std::iter::repeat_n(' ', ch.len_utf8()));
        } else {
            out.push(ch);
        }
    }
    out
}

/// A matched parenthesis pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParenPair {
    pub open: usize,
    pub close: usize,
    /// Nesting depth of the pair, 0 for outermost
    pub depth: usize,
}

/// Result of stack-matching parentheses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParenMatches {
    /// Pairs in closing order
    pub pairs: Vec<ParenPair>,
    /// Offsets of parentheses without a partner, in text order
    pub unmatched: Vec<usize>,
}

impl ParenMatches {
    pub fn is_well_formed(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// Match parentheses with a stack
pub fn match_parens(text: &str) -> ParenMatches {
    let bytes = text.as_bytes();
    let mut stack: Vec<usize> = Vec::new();
    let mut matches = ParenMatches::default();

    for i in memchr2_iter(b'(', b')', bytes) {
        if bytes[i] == b'(' {
            stack.push(i);
        } else if let Some(open) = stack.pop() {
            matches.pairs.push(ParenPair {
                open,
                close: i,
                depth: stack.len(),
            });
        } else {
            matches.unmatched.push(i);
        }
    }

    matches.unmatched.extend(stack);
    matches.unmatched.sort_unstable();
    matches
}
