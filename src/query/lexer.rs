//! Query tokenizer.
//!
//! Turns raw query text into a flat list of typed tokens with absolute byte
//! offsets. The scan never fails: unterminated phrases run to the end of the
//! text and unknown punctuation is skipped.

use crate::query::vocabulary::Operator;
use serde::Serialize;

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Term,
    Operator,
    Phrase,
    Wildcard,
    GroupStart,
    GroupEnd,
}

/// A lexed token. Offsets are byte offsets into the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Precedence class (see [`Operator::precedence`]); 0 for non-operators
    pub precedence: u8,
    pub operator: Option<Operator>,
}

impl Token {
    pub fn is_operator(&self) -> bool {
        self.kind == TokenKind::Operator
    }

    /// Operand tokens: terms, phrases and wildcards
    pub fn is_operand(&self) -> bool {
        matches!(self.kind, TokenKind::Term | TokenKind::Phrase | TokenKind::Wildcard)
    }

    /// The operator when this is a connective operator token
    pub fn connective(&self) -> Option<Operator> {
        self.operator.filter(|op| op.is_connective())
    }

    /// Phrase content without the surrounding quotes
    pub fn phrase_content(&self) -> &str {
        let inner = self.text.strip_prefix('"').unwrap_or(&self.text);
        inner.strip_suffix('"').unwrap_or(inner)
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '*' || ch == '?' || ch == '/'
}

/// Operators only count when bounded by whitespace, a parenthesis or the
/// edge of the text, so `PRE/3x` stays a term.
fn is_operator_boundary(ch: Option<char>) -> bool {
    match ch {
        None => true,
        Some(c) => c.is_whitespace() || c == '(' || c == ')',
    }
}

/// Tokenize `text`, adding `base_offset` to every token offset
pub fn tokenize(text: &str, base_offset: usize) -> Vec<Token> {
    let mut lexer = Lexer::new(text, base_offset);
    lexer.run();
    lexer.tokens
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    base: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str, base: usize) -> Self {
        Self {
            input,
            pos: 0,
            base,
            tokens: Vec::new(),
        }
    }

    fn run(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '(' {
                self.single(TokenKind::GroupStart);
            } else if ch == ')' {
                self.single(TokenKind::GroupEnd);
            } else if ch == '"' {
                self.phrase();
            } else if is_word_char(ch) {
                self.word();
            } else {
                self.advance();
            }
        }
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.advance();
        self.push(kind, start, None);
    }

    fn phrase(&mut self) {
        let start = self.pos;
        self.advance();
        while let Some(ch) = self.peek_char() {
            self.advance();
            if ch == '"' {
                break;
            }
        }
        self.push(TokenKind::Phrase, start, None);
    }

    fn word(&mut self) {
        let start = self.pos;
        while self.peek_char().map(is_word_char).unwrap_or(false) {
            self.advance();
        }
        let word = &self.input[start..self.pos];

        let before = self.input[..start].chars().next_back();
        let after = self.peek_char();
        let operator = if is_operator_boundary(before) && is_operator_boundary(after) {
            Operator::parse(word)
        } else {
            None
        };

        let kind = if operator.is_some() {
            TokenKind::Operator
        } else if word.contains('*') || word.contains('?') {
            TokenKind::Wildcard
        } else {
            TokenKind::Term
        };
        self.push(kind, start, operator);
    }

    fn push(&mut self, kind: TokenKind, start: usize, operator: Option<Operator>) {
        self.tokens.push(Token {
            kind,
            text: self.input[start..self.pos].to_string(),
            start: self.base + start,
            end: self.base + self.pos,
            precedence: operator.map(|op| op.precedence()).unwrap_or(0),
            operator,
        });
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::vocabulary::ProximityOp;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text, 0).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("", 0).is_empty());
        assert!(tokenize("   \t ", 0).is_empty());
    }

    #[test]
    fn test_basic_query() {
        assert_eq!(
            kinds("apple AND (orange OR pear)"),
            vec![
                TokenKind::Term,
                TokenKind::Operator,
                TokenKind::GroupStart,
                TokenKind::Term,
                TokenKind::Operator,
                TokenKind::Term,
                TokenKind::GroupEnd,
            ]
        );
    }

    #[test]
    fn test_proximity_operator() {
        let tokens = tokenize("apple w/5 orange", 0);
        assert_eq!(tokens[1].kind, TokenKind::Operator);
        assert_eq!(tokens[1].precedence, 3);
        assert_eq!(tokens[1].operator, Some(Operator::Proximity(ProximityOp::W(5))));
        assert_eq!(tokens[1].operator.unwrap().to_string(), "W/5");
    }

    #[test]
    fn test_no_operator_inside_word() {
        let tokens = tokenize("applew5orange", 0);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Term);
    }

    #[test]
    fn test_operator_requires_clean_boundary() {
        let tokens = tokenize("PRE/3x apple", 0);
        assert_eq!(tokens[0].kind, TokenKind::Term);

        // `-` is skipped but still breaks boundary purity
        let tokens = tokenize("AND-apple", 0);
        assert_eq!(tokens[0].kind, TokenKind::Term);
        assert_eq!(tokens[0].text, "AND");
    }

    #[test]
    fn test_operator_next_to_parens() {
        let tokens = tokenize("(a)AND(b)", 0);
        assert_eq!(tokens[3].kind, TokenKind::Operator);
    }

    #[test]
    fn test_phrase_offsets() {
        let tokens = tokenize("x \"hello world\" y", 10);
        assert_eq!(tokens[1].kind, TokenKind::Phrase);
        assert_eq!(tokens[1].text, "\"hello world\"");
        assert_eq!(tokens[1].start, 12);
        assert_eq!(tokens[1].end, 25);
        assert_eq!(tokens[1].phrase_content(), "hello world");
    }

    #[test]
    fn test_unterminated_phrase() {
        let tokens = tokenize("apple \"orange AND pear", 0);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::Phrase);
        assert_eq!(tokens[1].end, 22);
        assert_eq!(tokens[1].phrase_content(), "orange AND pear");
    }

    #[test]
    fn test_wildcards() {
        let tokens = tokenize("app* *ing appl?", 0);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Wildcard));
    }

    #[test]
    fn test_punctuation_is_skipped() {
        let tokens = tokenize("apple, orange~", 0);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "apple");
        assert_eq!(tokens[1].text, "orange");
    }

    #[test]
    fn test_unicode_terms() {
        let tokens = tokenize("café AND naïve", 0);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "café");
        assert_eq!(tokens[2].start, "café AND ".len());
    }
}
