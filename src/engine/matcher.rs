//! Pattern compilation.
//!
//! Turns author-facing pattern text into an anchored, case-insensitive regex:
//!
//! ```text
//! source:      "my name is *!"       "a \* b"       "  *  "
//! pieces:      [my name is][*][!]    [a * b]        [*]
//! expression:  ^my name is(.*)!$     ^a \* b$       ^(.*)$
//! ```
//!
//! - A bare `*` becomes a capturing `(.*)` group; `\*` stays a literal asterisk.
//! - Spaces touching a wildcard are folded into it, so `"a * b"` and
//!   `"a *b"` compile identically. Other whitespace (tabs, newlines) stays
//!   literal.
//! - Everything else is escaped and matched literally.
//!
//! The same ignore set used at compile time is stripped from every value
//! before matching.

use crate::error::Result;
use regex::{Regex, RegexBuilder};

/// Characters removed from both pattern text and matched values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    chars: Vec<char>,
}

impl IgnoreSet {
    pub fn new(chars: impl IntoIterator<Item = char>) -> Self {
        let mut chars: Vec<char> = chars.into_iter().collect();
        chars.sort_unstable();
        chars.dedup();
        IgnoreSet { chars }
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn contains(&self, c: char) -> bool {
        self.chars.binary_search(&c).is_ok()
    }

    pub fn strip(&self, text: &str) -> String {
        if self.is_empty() { text.to_string() } else { text.chars().filter(|c| !self.contains(*c)).collect() }
    }
}

#[derive(Debug)]
enum Piece {
    Literal(String),
    Wildcard,
}

fn split_pieces(source: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'*') => {
                chars.next();
                literal.push('*');
            }
            '*' => {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Wildcard);
            }
            _ => literal.push(c),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}

fn build_expression(pieces: &[Piece]) -> String {
    let mut expression = String::from("^");
    for (idx, piece) in pieces.iter().enumerate() {
        match piece {
            Piece::Wildcard => expression.push_str("(.*)"),
            Piece::Literal(text) => {
                let mut text = text.as_str();
                if idx > 0 && matches!(pieces[idx - 1], Piece::Wildcard) {
                    text = text.trim_start_matches(' ');
                }
                if matches!(pieces.get(idx + 1), Some(Piece::Wildcard)) {
                    text = text.trim_end_matches(' ');
                }
                expression.push_str(&regex::escape(text));
            }
        }
    }
    expression.push('$');
    expression
}

/// A compiled `after`/`in` pattern.
#[derive(Debug, Clone)]
pub struct Matcher {
    source: String,
    regex: Regex,
    ignore: IgnoreSet,
    stars: usize,
}

impl Matcher {
    /// Compile pattern text. Ignore characters are stripped before anything
    /// else, so an ignored `*` never becomes a wildcard.
    pub fn compile(text: &str, ignore: &IgnoreSet) -> Result<Self> {
        let stripped = ignore.strip(text);
        let pieces = split_pieces(&stripped);
        let stars = pieces.iter().filter(|p| matches!(p, Piece::Wildcard)).count();
        let expression = build_expression(&pieces);
        let regex = RegexBuilder::new(&expression).case_insensitive(true).build()?;

        Ok(Matcher { source: text.to_string(), regex, ignore: ignore.clone(), stars })
    }

    /// Match `value` against the whole pattern. On success returns the
    /// captured stars, trimmed, in left-to-right order.
    pub fn captures(&self, value: &str) -> Option<Vec<String>> {
        let value = self.ignore.strip(value);
        let caps = self.regex.captures(&value)?;
        Some(caps.iter().skip(1).map(|g| g.map_or("", |m| m.as_str()).trim().to_string()).collect())
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(&self.ignore.strip(value))
    }

    /// Pattern text as written in the rule (after meaning expansion).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The anchored regular expression this pattern compiled to.
    pub fn expression(&self) -> &str {
        self.regex.as_str()
    }

    /// Number of stars a successful match yields.
    pub fn star_count(&self) -> usize {
        self.stars
    }
}
