use super::normalize::fold_key;
use crate::error::{EngineError, Result};
use std::collections::HashMap;

/// Named sets of interchangeable phrases, referenced from patterns as
/// `(mean|key)`.
///
/// There is one global table on the environment and an optional local one per
/// rule; local entries shadow global ones with the same key.
#[derive(Debug, Clone, Default)]
pub struct MeaningTable {
    entries: HashMap<String, Vec<String>>,
}

impl MeaningTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` with its phrases. The key is accent-folded and lower-cased;
    /// phrases are stored as given.
    pub fn insert(&mut self, key: &str, phrases: Vec<String>) -> Result<()> {
        if phrases.is_empty() {
            return Err(EngineError::invalid("mean", format!("meaning '{key}' must list at least one phrase")));
        }

        let key = fold_key(key);
        if self.entries.contains_key(&key) {
            return Err(EngineError::DuplicateMeaning { key });
        }
        self.entries.insert(key, phrases);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Expand every `(mean|key)` token in `text` into the Cartesian product of the
/// referenced phrase lists.
///
/// Tokens are substituted positionally, left to right; the product is
/// enumerated with the first token varying slowest. Text without tokens
/// expands to itself.
///
/// ```text
/// "(mean|x)-(mean|y)"   x: [a, b]   y: [1, 2]
///   -> ["a-1", "a-2", "b-1", "b-2"]
/// ```
pub fn expand(text: &str, global: &MeaningTable, local: Option<&MeaningTable>) -> Result<Vec<String>> {
    let token = crate::regex!(r"\(mean\|([^)]*)\)");

    let mut literals: Vec<&str> = Vec::new();
    let mut choices: Vec<&[String]> = Vec::new();
    let mut last = 0;

    for caps in token.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let key = fold_key(name.as_str());
        let phrases = local
            .and_then(|table| table.get(&key))
            .or_else(|| global.get(&key))
            .ok_or(EngineError::InvalidMeaningKey { key })?;

        literals.push(&text[last..whole.start()]);
        choices.push(phrases);
        last = whole.end();
    }

    if choices.is_empty() {
        return Ok(vec![text.to_string()]);
    }
    literals.push(&text[last..]);

    let mut expanded = Vec::new();
    let mut indices = vec![0usize; choices.len()];
    loop {
        let mut value = String::from(literals[0]);
        for (slot, phrases) in choices.iter().enumerate() {
            value.push_str(&phrases[indices[slot]]);
            value.push_str(literals[slot + 1]);
        }
        expanded.push(value);

        // odometer: the last slot turns fastest
        let mut slot = choices.len();
        loop {
            if slot == 0 {
                return Ok(expanded);
            }
            slot -= 1;
            indices[slot] += 1;
            if indices[slot] < choices[slot].len() {
                break;
            }
            indices[slot] = 0;
        }
    }
}
