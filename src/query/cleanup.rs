//! Query cleanup: operators upper case, other words lower case, single quotes
//! become double quotes.

use crate::query::balance::{match_parens, quote_count};
use crate::query::vocabulary::{Operator, SpecialFunction};
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

/// A proximity operator or a plain word
pub(crate) static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:W|PRE)/\d+\b|\w+").expect("valid cleanup word regex")
});

/// Normalize the case of every word and convert `'` to `"`
pub fn cleanup(text: &str) -> String {
    WORD.replace_all(text, |caps: &Captures| fold_case(&caps[0]))
        .replace('\'', "\"")
}

fn fold_case(word: &str) -> String {
    if Operator::parse(word).is_some() {
        return word.to_uppercase();
    }
    match SpecialFunction::parse(word) {
        Some(func) if func.is_uppercase_keyword() => word.to_uppercase(),
        Some(_) => word.to_string(),
        None => word.to_lowercase(),
    }
}

/// Cleaned text together with its balance status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub text: String,
    /// Every parenthesis has a partner in the right order
    pub parens_balanced: bool,
    pub quotes_balanced: bool,
    /// More than one word, so the result deserves a review
    pub multi_word: bool,
}

impl CleanupReport {
    pub fn is_balanced(&self) -> bool {
        self.parens_balanced && self.quotes_balanced
    }

    /// Status line for the user
    pub fn message(&self) -> String {
        if self.is_balanced() {
            if self.multi_word {
                "Query cleaned up and balanced, please review for accuracy.".to_string()
            } else {
                "Query cleaned up and balanced.".to_string()
            }
        } else {
            let mut msg = String::from("Query cleaned up but unbalanced:");
            if !self.parens_balanced {
                msg.push_str(" parentheses");
            }
            if !self.quotes_balanced {
                msg.push_str(" quotes");
            }
            msg.push_str(", please check your query.");
            msg
        }
    }
}

pub fn cleanup_with_report(text: &str) -> CleanupReport {
    let cleaned = cleanup(text);
    CleanupReport {
        parens_balanced: match_parens(&cleaned).is_well_formed(),
        quotes_balanced: quote_count(&cleaned) % 2 == 0,
        multi_word: cleaned.split_whitespace().nth(1).is_some(),
        text: cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_case() {
        assert_eq!(
            cleanup("Apple and Orange w/5 Pear pre/2 PLUM not Fig"),
            "apple AND orange W/5 pear PRE/2 plum NOT fig"
        );
    }

    #[test]
    fn test_cleanup_keeps_function_case() {
        assert_eq!(cleanup("stem Running AND creditCard()"), "STEM running AND creditCard()");
        assert_eq!(cleanup("Date(2023)"), "Date(2023)");
    }

    #[test]
    fn test_cleanup_quotes() {
        assert_eq!(cleanup("'Red Apple' OR pear"), "\"red apple\" OR pear");
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        for text in ["A and B", "w/5x Foo", "'x' OR Y", "Café NEAR Naïve", ""] {
            let once = cleanup(text);
            assert_eq!(cleanup(&once), once);
        }
    }

    #[test]
    fn test_report_messages() {
        let report = cleanup_with_report("Apple AND Pear");
        assert!(report.is_balanced());
        assert_eq!(report.message(), "Query cleaned up and balanced, please review for accuracy.");

        assert_eq!(cleanup_with_report("apple").message(), "Query cleaned up and balanced.");

        let report = cleanup_with_report(")a( AND 'b");
        assert!(!report.parens_balanced);
        assert_eq!(
            report.message(),
            "Query cleaned up but unbalanced: parentheses quotes, please check your query."
        );
    }
}
