//! Error types.
//!
//! `EngineError` covers everything the core can raise: compile-time problems
//! with rule data (surfaced while loading, never deferred), and per-turn
//! failures that propagate out of `Kernel::respond`. A turn either succeeds
//! (possibly with no rule matching) or returns one of these.
//!
//! `LoadError` belongs to the YAML loader and wraps `EngineError` for failures
//! that happen while compiling what was read.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid value for tag '{tag}': {reason}")]
    InvalidTagValue { tag: String, reason: String },

    #[error("required tag '{tag}' is missing")]
    MissingTag { tag: String },

    #[error("directive '{name}' is not registered")]
    DirectiveNotFound { name: String },

    #[error("directive '{name}' takes {expected} parameter(s), got {got}")]
    DirectiveArity { name: String, expected: usize, got: usize },

    #[error("duplicated synonym '{key}'")]
    DuplicateSynonym { key: String },

    #[error("duplicated meaning '{key}'")]
    DuplicateMeaning { key: String },

    #[error("duplicated directive '{name}'")]
    DuplicateDirective { name: String },

    #[error("meaning '{key}' is not defined locally or globally")]
    InvalidMeaningKey { key: String },

    #[error("user '{id}' is not in session")]
    UnknownUser { id: String },

    #[error("user '{id}' is already in session")]
    DuplicateUser { id: String },

    #[error("no active user in session")]
    NoActiveSession,

    #[error("initialization required: {reason}")]
    Uninitialized { reason: &'static str },

    #[error("star index {index} out of range ({len} captured)")]
    StarIndex { index: usize, len: usize },

    #[error("recursive expansion exceeded depth limit of {limit}")]
    RecursionLimit { limit: usize },

    #[error("directive '{name}' failed: {message}")]
    Directive { name: String, message: String },

    #[error("pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}

impl EngineError {
    pub(crate) fn invalid(tag: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidTagValue { tag: tag.to_string(), reason: reason.into() }
    }
}

/// Errors raised while reading configuration, conversation, synonym and
/// meaning files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{}': {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("tag '{tag}' not found in '{}'", path.display())]
    MissingTag { tag: &'static str, path: PathBuf },

    #[error(transparent)]
    Engine(#[from] EngineError),
}
