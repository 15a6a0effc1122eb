use crate::error::{EngineError, Result};
use regex::{NoExpand, Regex};

/// Accented characters folded to their base letter. Upper-case forms are
/// derived from this table, so only lower-case entries are listed.
const ACCENTS: &[(char, char)] = &[
    ('ç', 'c'),
    ('ã', 'a'),
    ('á', 'a'),
    ('à', 'a'),
    ('â', 'a'),
    ('ä', 'a'),
    ('é', 'e'),
    ('è', 'e'),
    ('ê', 'e'),
    ('ë', 'e'),
    ('ó', 'o'),
    ('ò', 'o'),
    ('ô', 'o'),
    ('õ', 'o'),
    ('ö', 'o'),
    ('í', 'i'),
    ('ì', 'i'),
    ('î', 'i'),
    ('ï', 'i'),
    ('ú', 'u'),
    ('ù', 'u'),
    ('û', 'u'),
    ('ü', 'u'),
];

fn fold_char(c: char) -> char {
    if c.is_ascii() {
        return c;
    }
    if let Some(&(_, base)) = ACCENTS.iter().find(|(accented, _)| *accented == c) {
        return base;
    }
    if c.is_uppercase() {
        let mut lower = c.to_lowercase();
        if let (Some(l), None) = (lower.next(), lower.next()) {
            if let Some(&(_, base)) = ACCENTS.iter().find(|(accented, _)| *accented == l) {
                return base.to_ascii_uppercase();
            }
        }
    }
    c
}

/// Replace accented characters with their unaccented base, keeping case.
pub fn fold_accents(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Canonical form of a table key (synonym canonical, meaning name).
pub fn fold_key(key: &str) -> String {
    fold_accents(key).to_lowercase()
}

/// Synonym groups: canonical key -> equivalent phrases.
///
/// Insertion order is kept; substitution walks the groups in that order, so
/// when phrases of different groups overlap the earlier group wins.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    groups: Vec<SynonymGroup>,
}

#[derive(Debug, Clone)]
struct SynonymGroup {
    key: String,
    phrases: Vec<String>,
    patterns: Vec<Regex>,
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-word matcher for `phrase`: each edge must sit next to a non-word
/// character or the end of the text.
///
/// ```text
/// "hi"        -> \bhi\b
/// "hi!"       -> \bhi!\B
/// ```
fn phrase_regex(phrase: &str) -> Result<Regex> {
    let edge = |c: Option<char>| if c.is_some_and(is_word) { r"\b" } else { r"\B" };
    let expression =
        format!("{}{}{}", edge(phrase.chars().next()), regex::escape(phrase), edge(phrase.chars().next_back()));
    Ok(Regex::new(&expression)?)
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group whose first entry is the canonical key and the rest are
    /// phrases normalized to it. Keys and phrases are accent-folded and
    /// lower-cased.
    pub fn insert<S: AsRef<str>>(&mut self, group: &[S]) -> Result<()> {
        if group.len() < 2 {
            return Err(EngineError::invalid("synonyms", "a synonym group needs a key and at least one phrase"));
        }

        let key = fold_key(group[0].as_ref());
        if self.groups.iter().any(|g| g.key == key) {
            return Err(EngineError::DuplicateSynonym { key });
        }

        let phrases: Vec<String> = group[1..].iter().map(|p| fold_key(p.as_ref())).collect();
        if phrases.iter().any(|p| p.trim().is_empty()) {
            return Err(EngineError::invalid("synonyms", format!("synonym '{key}' has an empty phrase")));
        }
        let patterns = phrases.iter().map(|p| phrase_regex(p)).collect::<Result<Vec<_>>>()?;
        self.groups.push(SynonymGroup { key, phrases, patterns });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn phrases(&self, key: &str) -> Option<&[String]> {
        self.groups.iter().find(|g| g.key == key).map(|g| g.phrases.as_slice())
    }

    fn substitute(&self, text: &str) -> String {
        let mut text = text.to_lowercase();
        for group in &self.groups {
            for pattern in &group.patterns {
                text = pattern.replace_all(&text, NoExpand(&group.key)).into_owned();
            }
        }
        text
    }
}

/// Fold accents and, when `synonyms` is non-empty, lower-case the text and
/// substitute whole-word synonym phrases with their canonical key.
///
/// With an empty table the text keeps its case; matching is case-insensitive
/// regardless.
pub fn normalize(text: &str, synonyms: &SynonymTable) -> String {
    let folded = fold_accents(text);
    if synonyms.is_empty() { folded } else { synonyms.substitute(&folded) }
}
