//! Highlight classification.
//!
//! Produces byte ranges tagged with a highlight class. Rendering them (colours,
//! decorations, terminals) is left to the caller.

use crate::query::balance::{match_parens, quote_count};
use crate::query::cleanup::WORD;
use crate::query::vocabulary::{is_noise_word, Operator, SpecialFunction};
use crate::utils::app_data::AnalyzerConfig;
use crate::utils::lines::lines_with_offsets;
use memchr::memchr_iter;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Distinct colours cycled through by matched parenthesis pairs
pub const PAREN_COLOR_LEVELS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HighlightClass {
    Operator,
    SpecialFunction,
    /// `~ % # = ? *`, `n~~m` and `##`
    SpecialOperator,
    SearchTerm,
    NoiseWord,
    Paren { depth: usize },
    UnmatchedParen,
    Quote,
    UnmatchedQuote,
}

impl HighlightClass {
    /// Colour slot for matched parentheses
    pub fn paren_slot(&self) -> Option<usize> {
        match self {
            HighlightClass::Paren { depth } => Some(depth % PAREN_COLOR_LEVELS),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, HighlightClass::UnmatchedParen | HighlightClass::UnmatchedQuote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub class: HighlightClass,
}

static SPECIAL_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+~~\d+|##|[~%#=?*]").expect("valid special operator regex"));

/// Classify every highlighted range of `text`, ordered by start offset
pub fn highlight(text: &str, config: &AnalyzerConfig) -> Vec<HighlightSpan> {
    let mut spans = Vec::new();
    let mut push = |start: usize, end: usize, class: HighlightClass| {
        spans.push(HighlightSpan { start, end, class });
    };

    for m in WORD.find_iter(text) {
        let word = m.as_str();
        let class = if Operator::parse(word).is_some() {
            HighlightClass::Operator
        } else if SpecialFunction::parse(word).is_some() {
            HighlightClass::SpecialFunction
        } else if config.highlight_noise_words && is_noise_word(word) {
            HighlightClass::NoiseWord
        } else {
            HighlightClass::SearchTerm
        };
        push(m.start(), m.end(), class);
    }

    for m in SPECIAL_OPERATOR.find_iter(text) {
        push(m.start(), m.end(), HighlightClass::SpecialOperator);
    }

    let parens = match_parens(text);
    for pair in &parens.pairs {
        let class = HighlightClass::Paren { depth: pair.depth };
        push(pair.open, pair.open + 1, class);
        push(pair.close, pair.close + 1, class);
    }
    if config.show_balance_errors {
        for &offset in &parens.unmatched {
            push(offset, offset + 1, HighlightClass::UnmatchedParen);
        }
    }

    for line in lines_with_offsets(text) {
        let odd = quote_count(line.text) % 2 == 1;
        let positions: Vec<usize> = memchr_iter(b'"', line.text.as_bytes()).collect();
        for (i, &pos) in positions.iter().enumerate() {
            let offset = line.start + pos;
            if odd && i == positions.len() - 1 {
                if config.show_balance_errors {
                    push(offset, offset + 1, HighlightClass::UnmatchedQuote);
                }
            } else {
                push(offset, offset + 1, HighlightClass::Quote);
            }
        }
    }

    spans.sort_by_key(|s| (s.start, s.end));
    spans
}

/// Hover text for a noise word
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoiseWordInfo {
    pub word: String,
    pub markdown: String,
}

pub fn noise_word_info(word: &str) -> Option<NoiseWordInfo> {
    let word = word.to_lowercase();
    if !is_noise_word(&word) {
        return None;
    }
    let markdown = format!(
        "**Noise Word:** `{w}`\n\n\
         This word is typically **ignored** by the search engine. \
         Common words like \"{w}\" are filtered out to improve search performance and relevance.\n\n\
         **Tip:** Use quotes around phrases if you need to search for noise words: `\"the {w}\"`",
        w = word
    );
    Some(NoiseWordInfo { word, markdown })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(text: &str) -> Vec<(usize, HighlightClass)> {
        highlight(text, &AnalyzerConfig::default())
            .into_iter()
            .map(|s| (s.start, s.class))
            .collect()
    }

    #[test]
    fn test_words() {
        assert_eq!(
            classes("apple and W/5 the date"),
            vec![
                (0, HighlightClass::SearchTerm),
                (6, HighlightClass::Operator),
                (10, HighlightClass::Operator),
                (14, HighlightClass::NoiseWord),
                (18, HighlightClass::SpecialFunction),
            ]
        );
    }

    #[test]
    fn test_noise_words_can_be_disabled() {
        let config = AnalyzerConfig {
            highlight_noise_words: false,
            ..AnalyzerConfig::default()
        };
        let spans = highlight("the", &config);
        assert_eq!(spans[0].class, HighlightClass::SearchTerm);
    }

    #[test]
    fn test_special_operators() {
        let found: Vec<_> = highlight("app* 5~~10 ##x", &AnalyzerConfig::default())
            .into_iter()
            .filter(|s| s.class == HighlightClass::SpecialOperator)
            .map(|s| (s.start, s.end))
            .collect();
        assert_eq!(found, vec![(3, 4), (5, 10), (11, 13)]);
    }

    #[test]
    fn test_paren_depths() {
        let spans: Vec<_> = classes("((a))")
            .into_iter()
            .filter(|(_, c)| c.paren_slot().is_some())
            .collect();
        assert_eq!(
            spans,
            vec![
                (0, HighlightClass::Paren { depth: 0 }),
                (1, HighlightClass::Paren { depth: 1 }),
                (3, HighlightClass::Paren { depth: 1 }),
                (4, HighlightClass::Paren { depth: 0 }),
            ]
        );
        assert_eq!(HighlightClass::Paren { depth: 7 }.paren_slot(), Some(1));
    }

    #[test]
    fn test_balance_errors() {
        let found = classes("(a \"b");
        assert!(found.contains(&(0, HighlightClass::UnmatchedParen)));
        assert!(found.contains(&(3, HighlightClass::UnmatchedQuote)));

        let config = AnalyzerConfig {
            show_balance_errors: false,
            ..AnalyzerConfig::default()
        };
        assert!(highlight("(a \"b", &config).iter().all(|s| !s.class.is_error()));
    }

    #[test]
    fn test_quotes_per_line() {
        let found = classes("\"a\"\n\"b");
        assert_eq!(found[0], (0, HighlightClass::Quote));
        assert!(found.contains(&(2, HighlightClass::Quote)));
        assert!(found.contains(&(4, HighlightClass::UnmatchedQuote)));
    }

    #[test]
    fn test_noise_word_info() {
        let info = noise_word_info("The").unwrap();
        assert_eq!(info.word, "the");
        assert!(info.markdown.contains("`\"the the\"`"));
        assert!(noise_word_info("apple").is_none());
    }
}
