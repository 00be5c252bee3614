//! Property tests for the query analysis engine.

use dtsyntax::query::expand::find_or_groups;
use dtsyntax::query::fixes::fix_unbalanced_parentheses;
use dtsyntax::query::{
    build_query_trees, cleanup, paren_balance, split_or_query, suggest_fixes, tokenize, validate,
    QueryNode,
};
use proptest::prelude::*;

/// Words and symbols that make up realistic queries
fn query_piece() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("AND".to_string()),
        Just("or".to_string()),
        Just("NOT".to_string()),
        Just("W/5".to_string()),
        Just("pre/200".to_string()),
        Just("w5".to_string()),
        Just("NEAR".to_string()),
        Just("(".to_string()),
        Just(")".to_string()),
        Just("\"".to_string()),
        Just("'".to_string()),
        Just("date(2023)".to_string()),
        Just("*ing".to_string()),
        "[a-zA-Zé]{1,8}\\*?",
    ]
}

fn query() -> impl Strategy<Value = String> {
    prop::collection::vec((query_piece(), prop_oneof![Just(" "), Just("  "), Just("")]), 0..16)
        .prop_map(|pieces| pieces.into_iter().map(|(p, sep)| p + sep).collect())
}

fn multi_line_query() -> impl Strategy<Value = String> {
    prop::collection::vec(query(), 1..4).prop_map(|lines| lines.join("\n"))
}

fn assert_spans_nested(node: &QueryNode) {
    let mut stack = vec![node];
    while let Some(parent) = stack.pop() {
        for child in parent.children() {
            assert!(parent.span().contains(&child.span()));
            stack.push(child);
        }
    }
}

proptest! {
    #[test]
    fn prop_tokenize_is_total(text in "\\PC{0,60}") {
        for token in tokenize(&text, 3) {
            prop_assert!(token.start <= token.end);
            prop_assert!(token.end <= text.len() + 3);
            prop_assert_eq!(&text[token.start - 3..token.end - 3], token.text.as_str());
        }
    }

    #[test]
    fn prop_balanced_text_is_unchanged(text in query()) {
        let fixed = fix_unbalanced_parentheses(&text);
        prop_assert_eq!(paren_balance(&text) == 0, fixed == text);
    }

    #[test]
    fn prop_missing_parens_are_appended(text in query()) {
        let balance = paren_balance(&text);
        if balance > 0 {
            let expected = format!("{}{}", text, ")".repeat(balance as usize));
            prop_assert_eq!(fix_unbalanced_parentheses(&text), expected);
        }
        prop_assert_eq!(paren_balance(&fix_unbalanced_parentheses(&text)), 0);
    }

    #[test]
    fn prop_split_size_is_product(text in query()) {
        let groups = find_or_groups(&text);
        let result = split_or_query(&text);
        if groups.is_empty() {
            prop_assert_eq!(result, vec![text.clone()]);
        } else {
            let product: usize = groups.iter().map(|g| g.terms.len()).product();
            prop_assert_eq!(result.len(), product);
        }
    }

    #[test]
    fn prop_cleanup_is_idempotent(text in multi_line_query()) {
        let once = cleanup(&text);
        prop_assert_eq!(cleanup(&once), once);
    }

    #[test]
    fn prop_tree_spans_nest(text in multi_line_query()) {
        for root in build_query_trees(&text) {
            prop_assert!(root.span().end <= text.len());
            assert_spans_nested(&root);
        }
    }

    #[test]
    fn prop_diagnostics_stay_on_their_line(text in multi_line_query()) {
        let lines: Vec<&str> = text.split('\n').collect();
        for d in validate(&text) {
            let line = lines[d.span.line - 1];
            prop_assert!(d.span.start_col <= d.span.end_col);
            prop_assert!(d.span.end_col <= line.len());
        }
    }

    #[test]
    fn prop_fixes_are_idempotent(text in multi_line_query()) {
        for fix in suggest_fixes(&text) {
            let once = fix.apply(&text);
            prop_assert_eq!(fix.apply(&once), once.clone(), "fix {} not idempotent", fix.code);
            if !fix.auto_fixable {
                prop_assert_eq!(&once, &text);
            }
        }
    }
}
