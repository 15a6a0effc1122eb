//! YAML configuration loading.
//!
//! ```text
//! config.yml
//!   conversations: [talk.yml, ...]   required, rule files
//!   synonyms: [synonyms.yml, ...]    optional, list of lists
//!   meanings: [meanings.yml, ...]    optional, key -> phrases
//!   botname: Zed                     any other scalar becomes a global
//! ```
//!
//! Relative paths are resolved against the directory of the config file.
//! Tables load before rules (synonyms, then meanings, then conversations) so
//! every rule compiles against the complete tables.
//!
//! Loads are staged: everything is read and compiled against a copy of the
//! environment, and the kernel only changes once the whole load succeeded.

use crate::api::{Kernel, Options, add_meaning};
use crate::engine::{RuleSpec, scalar};
use crate::error::LoadError;
use crate::session::Environment;
use crate::Rule;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    conversations: Option<Vec<PathBuf>>,
    #[serde(default)]
    synonyms: Vec<PathBuf>,
    #[serde(default)]
    meanings: Vec<PathBuf>,
    #[serde(flatten)]
    globals: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ConversationFile {
    #[serde(default)]
    patterns: Option<Vec<RuleSpec>>,
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })
}

fn yaml<'a, T: Deserialize<'a>>(text: &'a str, path: &Path) -> Result<T, LoadError> {
    serde_yaml::from_str(text).map_err(|source| LoadError::Yaml { path: path.to_path_buf(), source })
}

/// Parse a conversation file: a mapping with a `patterns:` list of rules.
pub fn parse_conversation(text: &str, path: &Path) -> Result<Vec<RuleSpec>, LoadError> {
    let file: ConversationFile = yaml(text, path)?;
    file.patterns.ok_or_else(|| LoadError::MissingTag { tag: "patterns", path: path.to_path_buf() })
}

/// Parse a synonym file: a list of groups, each a list of at least two
/// scalars whose first entry is the canonical key.
pub fn parse_synonyms(text: &str, path: &Path) -> Result<Vec<Vec<String>>, LoadError> {
    let groups: Vec<Vec<Value>> = yaml(text, path)?;
    let groups = groups
        .iter()
        .map(|group| group.iter().map(|v| scalar("synonyms", v)).collect::<crate::Result<Vec<_>>>())
        .collect::<crate::Result<Vec<_>>>()?;
    Ok(groups)
}

/// Parse a meaning file: a mapping from key to a list of phrases. File order
/// is kept.
pub fn parse_meanings(text: &str, path: &Path) -> Result<Vec<(String, Vec<String>)>, LoadError> {
    let table: Mapping = yaml(text, path)?;
    let mut meanings = Vec::with_capacity(table.len());
    for (key, phrases) in &table {
        let key = scalar("meanings", key)?;
        let phrases = match phrases {
            Value::Sequence(items) => items.iter().map(|v| scalar("meanings", v)).collect::<crate::Result<Vec<_>>>()?,
            other => vec![scalar("meanings", other)?],
        };
        meanings.push((key, phrases));
    }
    Ok(meanings)
}

fn apply_synonyms(env: &mut Environment, path: &Path) -> Result<(), LoadError> {
    for group in parse_synonyms(&read(path)?, path)? {
        env.synonyms_mut().insert(&group)?;
    }
    Ok(())
}

fn apply_meanings(env: &mut Environment, path: &Path) -> Result<(), LoadError> {
    for (key, phrases) in parse_meanings(&read(path)?, path)? {
        add_meaning(env, &key, &phrases)?;
    }
    Ok(())
}

fn compile_conversation(env: &Environment, path: &Path) -> Result<Vec<Rule>, LoadError> {
    let specs = parse_conversation(&read(path)?, path)?;
    let rules = specs.iter().map(|spec| Rule::compile(spec, env)).collect::<crate::Result<Vec<_>>>()?;
    tracing::debug!(path = %path.display(), rules = rules.len(), "conversation compiled");
    Ok(rules)
}

impl Kernel {
    /// Build a kernel and load `path` into it.
    pub fn from_config(path: impl AsRef<Path>, options: Options) -> Result<Kernel, LoadError> {
        let mut kernel = Kernel::new(options);
        kernel.load_config(path)?;
        Ok(kernel)
    }

    /// Load a config file with its synonym, meaning and conversation files,
    /// appending to what the kernel already holds.
    pub fn load_config(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        let config: ConfigFile = yaml(&read(path)?, path)?;
        let conversations =
            config.conversations.ok_or_else(|| LoadError::MissingTag { tag: "conversations", path: path.to_path_buf() })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let mut staged = self.env.clone();
        for (name, value) in &config.globals {
            match value {
                Value::Null | Value::Sequence(_) | Value::Mapping(_) => {
                    tracing::debug!(name = %name, "ignoring non-scalar config entry");
                }
                other => staged.set_global(name.clone(), scalar(name, other)?),
            }
        }
        for file in &config.synonyms {
            apply_synonyms(&mut staged, &base.join(file))?;
        }
        for file in &config.meanings {
            apply_meanings(&mut staged, &base.join(file))?;
        }
        let mut rules = Vec::new();
        for file in &conversations {
            rules.extend(compile_conversation(&staged, &base.join(file))?);
        }

        tracing::info!(
            path = %path.display(),
            synonyms = staged.synonyms().len(),
            meanings = staged.meanings().len(),
            rules = rules.len(),
            "config loaded"
        );
        self.env = staged;
        self.rules.extend(rules);
        Ok(())
    }

    /// Add every group of a synonym file.
    pub fn load_synonyms(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let mut staged = self.env.synonyms().clone();
        let path = path.as_ref();
        for group in parse_synonyms(&read(path)?, path)? {
            staged.insert(&group)?;
        }
        *self.env.synonyms_mut() = staged;
        Ok(())
    }

    /// Add every entry of a meaning file, normalizing phrases with the
    /// current synonyms.
    pub fn load_meanings(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let mut staged = self.env.clone();
        apply_meanings(&mut staged, path.as_ref())?;
        *self.env.meanings_mut() = staged.meanings().clone();
        Ok(())
    }

    /// Compile a conversation file and append its rules.
    pub fn load_conversation(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let rules = compile_conversation(&self.env, path.as_ref())?;
        tracing::info!(added = rules.len(), total = self.rules.len() + rules.len(), "rules loaded");
        self.rules.extend(rules);
        Ok(())
    }
}
