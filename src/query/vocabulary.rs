//! Operator, field-function and noise-word vocabulary.
//!
//! Every component that needs to know whether a word is an operator goes
//! through [`Operator::parse`] or [`SpecialFunction::parse`], so the lexer,
//! the cleanup normalizer and the rule engines can never disagree.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Boolean connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanOp {
    And,
    Or,
    Not,
    AndAny,
}

/// Proximity and scope operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProximityOp {
    Near,
    Within,
    /// `W/n`: within n words
    W(u32),
    /// `PRE/n`: precedes by at most n words
    Pre(u32),
    Sentence,
    Paragraph,
    Document,
}

/// A boolean or proximity operator keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Boolean(BooleanOp),
    Proximity(ProximityOp),
}

impl Operator {
    /// Parse a word as an operator keyword (case-insensitive).
    ///
    /// `W/n` and `PRE/n` require at least one digit after the slash and a
    /// distance that fits in a `u32`.
    pub fn parse(word: &str) -> Option<Operator> {
        let upper = word.to_ascii_uppercase();
        let op = match upper.as_str() {
            "AND" => Operator::Boolean(BooleanOp::And),
            "OR" => Operator::Boolean(BooleanOp::Or),
            "NOT" => Operator::Boolean(BooleanOp::Not),
            "ANDANY" => Operator::Boolean(BooleanOp::AndAny),
            "NEAR" => Operator::Proximity(ProximityOp::Near),
            "WITHIN" => Operator::Proximity(ProximityOp::Within),
            "SENTENCE" => Operator::Proximity(ProximityOp::Sentence),
            "PARAGRAPH" => Operator::Proximity(ProximityOp::Paragraph),
            "DOCUMENT" => Operator::Proximity(ProximityOp::Document),
            _ => {
                if let Some(n) = upper.strip_prefix("W/").and_then(parse_distance) {
                    Operator::Proximity(ProximityOp::W(n))
                } else if let Some(n) = upper.strip_prefix("PRE/").and_then(parse_distance) {
                    Operator::Proximity(ProximityOp::Pre(n))
                } else {
                    return None;
                }
            }
        };
        Some(op)
    }

    /// Precedence class: NOT=4, proximity=3, AND/ANDANY=2, OR=1
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Boolean(BooleanOp::Not) => 4,
            Operator::Proximity(_) => 3,
            Operator::Boolean(BooleanOp::And) | Operator::Boolean(BooleanOp::AndAny) => 2,
            Operator::Boolean(BooleanOp::Or) => 1,
        }
    }

    /// Operators that join terms. The scope words SENTENCE, PARAGRAPH and
    /// DOCUMENT only qualify another operator.
    pub fn is_connective(&self) -> bool {
        !matches!(
            self,
            Operator::Proximity(ProximityOp::Sentence)
                | Operator::Proximity(ProximityOp::Paragraph)
                | Operator::Proximity(ProximityOp::Document)
        )
    }

    pub fn is_proximity(&self) -> bool {
        matches!(self, Operator::Proximity(_))
    }

    /// Proximity connectives: NEAR, WITHIN, W/n, PRE/n
    pub fn is_proximity_connective(&self) -> bool {
        self.is_proximity() && self.is_connective()
    }

    pub fn is_and(&self) -> bool {
        matches!(self, Operator::Boolean(BooleanOp::And))
    }

    pub fn is_or(&self) -> bool {
        matches!(self, Operator::Boolean(BooleanOp::Or))
    }

    pub fn is_not(&self) -> bool {
        matches!(self, Operator::Boolean(BooleanOp::Not))
    }

    /// Word distance carried by `W/n` and `PRE/n`
    pub fn distance(&self) -> Option<u32> {
        match self {
            Operator::Proximity(ProximityOp::W(n)) | Operator::Proximity(ProximityOp::Pre(n)) => {
                Some(*n)
            }
            _ => None,
        }
    }

    /// Human-readable description shown next to operator nodes
    pub fn description(&self) -> String {
        match self {
            Operator::Boolean(BooleanOp::And) => "All terms must match".to_string(),
            Operator::Boolean(BooleanOp::Or) => "Any term may match".to_string(),
            Operator::Boolean(BooleanOp::Not) => "Exclude documents matching the term".to_string(),
            Operator::Boolean(BooleanOp::AndAny) => {
                "Left side must match, right side terms add relevance".to_string()
            }
            Operator::Proximity(ProximityOp::Near) => "Terms must appear near each other".to_string(),
            Operator::Proximity(ProximityOp::Within) => {
                "Terms must appear within the given scope".to_string()
            }
            Operator::Proximity(ProximityOp::W(n)) => {
                format!("Terms must appear within {} words of each other", n)
            }
            Operator::Proximity(ProximityOp::Pre(n)) => {
                format!("First term must precede the second by at most {} words", n)
            }
            Operator::Proximity(ProximityOp::Sentence) => "Scope: same sentence".to_string(),
            Operator::Proximity(ProximityOp::Paragraph) => "Scope: same paragraph".to_string(),
            Operator::Proximity(ProximityOp::Document) => "Scope: same document".to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Boolean(BooleanOp::And) => write!(f, "AND"),
            Operator::Boolean(BooleanOp::Or) => write!(f, "OR"),
            Operator::Boolean(BooleanOp::Not) => write!(f, "NOT"),
            Operator::Boolean(BooleanOp::AndAny) => write!(f, "ANDANY"),
            Operator::Proximity(ProximityOp::Near) => write!(f, "NEAR"),
            Operator::Proximity(ProximityOp::Within) => write!(f, "WITHIN"),
            Operator::Proximity(ProximityOp::W(n)) => write!(f, "W/{}", n),
            Operator::Proximity(ProximityOp::Pre(n)) => write!(f, "PRE/{}", n),
            Operator::Proximity(ProximityOp::Sentence) => write!(f, "SENTENCE"),
            Operator::Proximity(ProximityOp::Paragraph) => write!(f, "PARAGRAPH"),
            Operator::Proximity(ProximityOp::Document) => write!(f, "DOCUMENT"),
        }
    }
}

fn parse_distance(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Field and search-modifier functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialFunction {
    Caps,
    Stem,
    Soundex,
    Numeric,
    Alphanumeric,
    XFirstWord,
    XLastWord,
    Date,
    Mail,
    CreditCard,
    Contains,
    Field,
}

impl SpecialFunction {
    pub fn parse(word: &str) -> Option<SpecialFunction> {
        let func = match word.to_ascii_lowercase().as_str() {
            "caps" => SpecialFunction::Caps,
            "stem" => SpecialFunction::Stem,
            "soundex" => SpecialFunction::Soundex,
            "numeric" => SpecialFunction::Numeric,
            "alphanumeric" => SpecialFunction::Alphanumeric,
            "xfirstword" => SpecialFunction::XFirstWord,
            "xlastword" => SpecialFunction::XLastWord,
            "date" => SpecialFunction::Date,
            "mail" => SpecialFunction::Mail,
            "creditcard" => SpecialFunction::CreditCard,
            "contains" => SpecialFunction::Contains,
            "field" => SpecialFunction::Field,
            _ => return None,
        };
        Some(func)
    }

    /// Modifiers written in upper case; cleanup folds these like operators.
    /// The remaining functions keep whatever case the author used.
    pub fn is_uppercase_keyword(&self) -> bool {
        matches!(
            self,
            SpecialFunction::Caps
                | SpecialFunction::Stem
                | SpecialFunction::Soundex
                | SpecialFunction::Numeric
                | SpecialFunction::Alphanumeric
        )
    }

    /// Functions invoked with a parenthesized argument, e.g. `date(2023)`
    pub fn takes_arguments(&self) -> bool {
        matches!(
            self,
            SpecialFunction::Date
                | SpecialFunction::Mail
                | SpecialFunction::CreditCard
                | SpecialFunction::Contains
                | SpecialFunction::Field
        )
    }
}

/// Common words the search engine ignores at match time
pub const NOISE_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "another", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "between", "both", "but", "by",
    "came", "can", "come", "could",
    "did", "do",
    "each", "even",
    "for", "from", "further", "furthermore",
    "get", "got",
    "had", "has", "have", "he", "her", "here", "hi", "him", "himself", "his", "how", "however",
    "i", "if", "in", "indeed", "into", "is", "it", "its",
    "just",
    "like",
    "made", "many", "me", "might", "more", "moreover", "most", "much", "must", "my",
    "never", "not", "now",
    "of", "on", "only", "or", "other", "our", "out", "over",
    "said", "same", "see", "she", "should", "since", "some", "still", "such",
    "take", "than", "that", "the", "their", "them", "then", "there", "therefore", "these",
    "they", "this", "those", "through", "thus", "to", "too",
    "under", "up",
    "very",
    "was", "way", "we", "well", "were", "what", "when", "where", "which", "while", "who",
    "will", "with", "would",
    "you", "your",
];

static NOISE_WORD_SET: LazyLock<FxHashSet<&'static str>> =
    LazyLock::new(|| NOISE_WORDS.iter().copied().collect());

/// Check whether a word is a noise word (case-insensitive)
pub fn is_noise_word(word: &str) -> bool {
    if word.bytes().any(|b| b.is_ascii_uppercase()) {
        NOISE_WORD_SET.contains(word.to_ascii_lowercase().as_str())
    } else {
        NOISE_WORD_SET.contains(word)
    }
}
