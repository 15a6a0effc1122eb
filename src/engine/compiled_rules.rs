//! Rule compilation.
//!
//! This module holds the *static* side of the engine: turning declarative
//! rule data (`RuleSpec`, usually deserialized from YAML) into a `Rule` whose
//! patterns are compiled regexes and whose `when`/`post` entries are bound to
//! concrete directives.
//!
//! ```text
//! RuleSpec.in: "(mean|greet) *"
//!    │ expand (local meanings shadow global)     text/expand.rs
//!    ├── "hello *"  ── normalize ── Matcher::compile(ignore)
//!    └── "hi *"     ── normalize ── Matcher::compile(ignore)
//! ```
//!
//! Compilation happens once, against the environment as it is at that moment.
//! Synonyms, meanings and directives registered later do not affect rules that
//! are already compiled.
//!
//! ## Invariants
//!
//! - Every error is raised here, at load time: malformed tags, unknown
//!   directives, arity mismatches and undefined meaning keys never reach a
//!   turn.
//! - A field that is present but `null` or empty is an error; an absent field
//!   skips its stage.
//! - `out` is required and non-empty, so choosing an output never fails.

use super::matcher::{IgnoreSet, Matcher};
use crate::error::{EngineError, Result};
use crate::session::Environment;
use crate::text::{MeaningTable, expand, normalize};
use crate::{Action, Rule, Template};
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};

bitflags::bitflags! {
    /// Which stages a compiled rule declares.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StageMask: u8 {
        const AFTER = 1 << 0;
        const IN    = 1 << 1;
        const WHEN  = 1 << 2;
        const POST  = 1 << 3;
    }
}

/// Declarative rule data.
///
/// Each field holds the raw tag value; shapes are checked by
/// [`Rule::compile`]. The builder methods append to list-valued tags:
///
/// ```
/// use colloquy::RuleSpec;
///
/// let spec = RuleSpec::new()
///     .input("my name is *")
///     .out("Nice to meet you, <star>!")
///     .post("define", ["name", "<star>"]);
/// assert!(spec.when.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    #[serde(default, deserialize_with = "present")]
    pub mean: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub ignore: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub after: Option<Value>,
    #[serde(rename = "in", default, deserialize_with = "present")]
    pub input: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub when: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub out: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub post: Option<Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it can be told apart
/// from a missing field.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn push_item(slot: &mut Option<Value>, item: Value) {
    match slot {
        Some(Value::Sequence(items)) => items.push(item),
        Some(existing) => {
            let first = std::mem::replace(existing, Value::Null);
            *existing = Value::Sequence(vec![first, item]);
        }
        None => *slot = Some(Value::Sequence(vec![item])),
    }
}

fn invocation<I, S>(directive: &str, params: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let params = params.into_iter().map(|p| Value::String(p.into())).collect();
    let mut map = Mapping::new();
    map.insert(Value::String(directive.to_string()), Value::Sequence(params));
    Value::Mapping(map)
}

impl RuleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn after(mut self, pattern: impl Into<String>) -> Self {
        push_item(&mut self.after, Value::String(pattern.into()));
        self
    }

    pub fn input(mut self, pattern: impl Into<String>) -> Self {
        push_item(&mut self.input, Value::String(pattern.into()));
        self
    }

    pub fn out(mut self, template: impl Into<String>) -> Self {
        push_item(&mut self.out, Value::String(template.into()));
        self
    }

    pub fn when<I, S>(mut self, directive: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_item(&mut self.when, invocation(directive, params));
        self
    }

    pub fn post<I, S>(mut self, directive: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_item(&mut self.post, invocation(directive, params));
        self
    }

    /// Characters stripped from patterns and matched values.
    pub fn ignore(mut self, chars: &str) -> Self {
        for c in chars.chars() {
            push_item(&mut self.ignore, Value::String(c.to_string()));
        }
        self
    }

    /// Declare a rule-local meaning.
    pub fn mean<I, S>(mut self, key: &str, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases = phrases.into_iter().map(|p| Value::String(p.into())).collect();
        let table = self.mean.get_or_insert_with(|| Value::Mapping(Mapping::new()));
        if let Value::Mapping(map) = table {
            map.insert(Value::String(key.to_string()), Value::Sequence(phrases));
        }
        self
    }
}

// --- Tag value helpers ----------------------------------------------------------

/// Render a YAML scalar as text. Empty strings are allowed here; callers that
/// need non-empty values check separately.
pub(crate) fn scalar(tag: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(EngineError::invalid(tag, "value is null")),
        Value::Sequence(_) | Value::Mapping(_) => Err(EngineError::invalid(tag, "expected a scalar value")),
        Value::Tagged(tagged) => scalar(tag, &tagged.value),
    }
}

/// A single scalar or a list of scalars, as a non-empty list of non-empty
/// strings.
fn text_list(tag: &str, value: &Value) -> Result<Vec<String>> {
    let items = match value {
        Value::Sequence(items) => items.iter().map(|v| scalar(tag, v)).collect::<Result<Vec<_>>>()?,
        other => vec![scalar(tag, other)?],
    };
    if items.is_empty() {
        return Err(EngineError::invalid(tag, "list is empty"));
    }
    if items.iter().any(String::is_empty) {
        return Err(EngineError::invalid(tag, "value is empty"));
    }
    Ok(items)
}

fn local_meanings(value: &Value, env: &Environment) -> Result<MeaningTable> {
    let Value::Mapping(map) = value else {
        return Err(EngineError::invalid("mean", "expected a mapping of key -> phrases"));
    };
    if map.is_empty() {
        return Err(EngineError::invalid("mean", "mapping is empty"));
    }

    let mut table = MeaningTable::new();
    for (key, phrases) in map {
        let key = scalar("mean", key)?;
        let phrases = text_list("mean", phrases)?
            .iter()
            .map(|p| normalize(p, env.synonyms()).to_lowercase())
            .collect();
        table.insert(&key, phrases)?;
    }
    Ok(table)
}

fn ignore_set(value: &Value) -> Result<IgnoreSet> {
    let mut chars = Vec::new();
    for entry in text_list("ignore", value)? {
        let mut it = entry.chars();
        match (it.next(), it.next()) {
            (Some(c), None) => chars.push(c),
            _ => return Err(EngineError::invalid("ignore", format!("'{entry}' is not a single character"))),
        }
    }
    Ok(IgnoreSet::new(chars))
}

fn matchers(
    tag: &str,
    value: &Value,
    env: &Environment,
    local: Option<&MeaningTable>,
    ignore: &IgnoreSet,
) -> Result<Vec<Matcher>> {
    let mut out = Vec::new();
    for pattern in text_list(tag, value)? {
        for expanded in expand(&pattern, env.meanings(), local)? {
            out.push(Matcher::compile(&normalize(&expanded, env.synonyms()), ignore)?);
        }
    }
    Ok(out)
}

fn params(tag: &str, value: &Value) -> Result<Vec<Template>> {
    let values = match value {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items.iter().map(|v| scalar(tag, v)).collect::<Result<Vec<_>>>()?,
        Value::Mapping(_) => return Err(EngineError::invalid(tag, "directive parameters must be scalars")),
        other => vec![scalar(tag, other)?],
    };
    Ok(values.into_iter().map(Template::new).collect())
}

fn actions(tag: &str, value: &Value, env: &Environment) -> Result<Vec<Action>> {
    let maps: Vec<&Mapping> = match value {
        Value::Mapping(map) => vec![map],
        Value::Sequence(items) if !items.is_empty() => items
            .iter()
            .map(|item| match item {
                Value::Mapping(map) => Ok(map),
                _ => Err(EngineError::invalid(tag, "each entry must be a directive mapping")),
            })
            .collect::<Result<_>>()?,
        _ => return Err(EngineError::invalid(tag, "expected a directive mapping or a list of them")),
    };

    let mut out = Vec::new();
    for map in maps {
        if map.is_empty() {
            return Err(EngineError::invalid(tag, "directive mapping is empty"));
        }
        for (name, value) in map {
            let name = scalar(tag, name)?;
            let directive = env
                .directives()
                .get(&name)
                .ok_or_else(|| EngineError::DirectiveNotFound { name: name.clone() })?;
            let params = params(tag, value)?;
            if let Some(expected) = directive.arity() {
                if expected != params.len() {
                    return Err(EngineError::DirectiveArity { name, expected, got: params.len() });
                }
            }
            out.push(Action::new(&name, directive.clone(), params));
        }
    }
    Ok(out)
}

impl Rule {
    /// Compile `spec` against the tables and directives currently in `env`.
    pub fn compile(spec: &RuleSpec, env: &Environment) -> Result<Rule> {
        let meanings = spec.mean.as_ref().map(|v| local_meanings(v, env)).transpose()?;
        let ignore = spec.ignore.as_ref().map(ignore_set).transpose()?.unwrap_or_default();

        let mut stages = StageMask::empty();
        let mut compile_stage = |tag: &str, flag: StageMask, value: Option<&Value>| -> Result<Vec<Matcher>> {
            let Some(value) = value else {
                return Ok(Vec::new());
            };
            stages |= flag;
            matchers(tag, value, env, meanings.as_ref(), &ignore)
        };
        let after = compile_stage("after", StageMask::AFTER, spec.after.as_ref())?;
        let input = compile_stage("in", StageMask::IN, spec.input.as_ref())?;

        let when = match &spec.when {
            Some(value) => {
                stages |= StageMask::WHEN;
                actions("when", value, env)?
            }
            None => Vec::new(),
        };
        let post = match &spec.post {
            Some(value) => {
                stages |= StageMask::POST;
                actions("post", value, env)?
            }
            None => Vec::new(),
        };

        let out = spec.out.as_ref().ok_or_else(|| EngineError::MissingTag { tag: "out".to_string() })?;
        let out = text_list("out", out)?.into_iter().map(Template::new).collect();

        Ok(Rule { after, input, when, out, post, meanings, ignore, stages })
    }
}
