//! OR-group expansion.
//!
//! A top-level parenthesized group whose own level is joined by OR is an
//! expansion group. [`split_or_query`] substitutes every term of every group
//! into the query template and returns the Cartesian product.
//!
//! Only one level is flattened: an OR-group nested inside a term of an outer
//! group is kept verbatim as part of that term.

use crate::query::balance::{mask_quoted, match_parens};
use crate::query::lexer::{tokenize, TokenKind};
use tracing::debug;

/// A top-level group and the terms it expands to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrGroup {
    /// Byte offset of `(`
    pub open: usize,
    /// Byte offset of `)`
    pub close: usize,
    pub terms: Vec<String>,
}

/// Top-level groups with at least two OR-joined terms, in text order
pub fn find_or_groups(query: &str) -> Vec<OrGroup> {
    let masked = mask_quoted(query);
    let mut pairs: Vec<_> = match_parens(&masked)
        .pairs
        .into_iter()
        .filter(|p| p.depth == 0)
        .collect();
    pairs.sort_by_key(|p| p.open);

    pairs
        .into_iter()
        .filter_map(|pair| {
            let terms = split_on_or(&query[pair.open + 1..pair.close]);
            (terms.len() >= 2).then_some(OrGroup {
                open: pair.open,
                close: pair.close,
                terms,
            })
        })
        .collect()
}

/// Split group content on OR at its own nesting level
fn split_on_or(content: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for token in tokenize(content, 0) {
        match token.kind {
            TokenKind::GroupStart => depth += 1,
            TokenKind::GroupEnd => depth = depth.saturating_sub(1),
            TokenKind::Operator if depth == 0 && token.operator.is_some_and(|op| op.is_or()) => {
                terms.push(content[start..token.start].trim().to_string());
                start = token.end;
            }
            _ => {}
        }
    }
    if terms.is_empty() {
        return Vec::new();
    }
    terms.push(content[start..].trim().to_string());
    terms.retain(|t| !t.is_empty());
    terms
}

/// Expand every top-level OR-group into separate queries.
///
/// Returns `[query]` when there is no group to expand. The first group varies
/// slowest in the output.
pub fn split_or_query(query: &str) -> Vec<String> {
    let groups = find_or_groups(query);
    if groups.is_empty() {
        return vec![query.to_string()];
    }

    // Right to left, so the offsets of earlier groups stay valid
    let mut results = vec![query.to_string()];
    for group in groups.iter().rev() {
        results = group
            .terms
            .iter()
            .flat_map(|term| {
                results.iter().map(move |r| {
                    format!("{}{}{}", &r[..group.open], term, &r[group.close + 1..])
                })
            })
            .collect();
    }

    let expanded: Vec<String> = results
        .iter()
        .map(|r| r.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|r| !r.is_empty())
        .collect();
    debug!(groups = groups.len(), queries = expanded.len(), "expanded OR groups");
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cartesian_product() {
        let result = split_or_query("(apple OR orange) AND (red OR blue)");
        assert_eq!(
            result,
            vec![
                "apple AND red",
                "apple AND blue",
                "orange AND red",
                "orange AND blue",
            ]
        );
    }

    #[test]
    fn test_no_groups() {
        assert_eq!(split_or_query("apple AND  pear"), vec!["apple AND  pear"]);
        assert_eq!(split_or_query("(apple AND pear)"), vec!["(apple AND pear)"]);
        assert_eq!(split_or_query(""), vec![""]);
    }

    #[test]
    fn test_case_insensitive_or() {
        assert_eq!(split_or_query("x (a or b or c)").len(), 3);
    }

    #[test]
    fn test_product_size() {
        let result = split_or_query("(a OR b OR c) W/5 (d OR e) AND (f OR g)");
        assert_eq!(result.len(), 12);
        assert_eq!(result[0], "a W/5 d AND f");
        assert_eq!(result[11], "c W/5 e AND g");
    }

    #[test]
    fn test_nested_group_kept_verbatim() {
        let result = split_or_query("((a OR b) AND c OR d) AND e");
        assert_eq!(result, vec!["(a OR b) AND c AND e", "d AND e"]);
    }

    #[test]
    fn test_or_inside_phrase_is_text() {
        assert_eq!(
            split_or_query("(\"salt OR pepper\" OR herbs)"),
            vec!["\"salt OR pepper\"", "herbs"]
        );
        assert!(find_or_groups("\"(a OR b)\"").is_empty());
    }

    #[test]
    fn test_empty_terms_dropped() {
        assert_eq!(find_or_groups("(a OR OR b)")[0].terms, vec!["a", "b"]);
        assert!(find_or_groups("(a OR)").is_empty());
    }
}
