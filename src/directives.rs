//! Directives: named predicates and actions invoked from rule `when`/`post`
//! tags.
//!
//! A directive is one of two shapes:
//!
//! - [`Directive::Predicate`]: reads the environment and answers yes/no.
//! - [`Directive::Action`]: mutates the environment (session locals, globals).
//!
//! The declaration context decides how the result is used. In `when`, a
//! predicate's answer gates the rule and an action counts as passing once it
//! has run. In `post`, both are simply executed and any answer is dropped.
//!
//! Parameters arrive already rendered (variables substituted) and in declared
//! order. A directive built with [`Directive::by_name`] instead receives a
//! bare `<variable>` parameter as the variable's name. Rules bind the `Directive` value itself at compile time, so the
//! registry is only consulted while compiling.
//!
//! Built-ins live in `directives/builtin.rs`.

#[path = "directives/builtin.rs"]
mod builtin;

use crate::error::{EngineError, Result};
use crate::session::Environment;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type PredicateFn = dyn Fn(&[String], &Environment) -> Result<bool> + Send + Sync;
pub type ActionFn = dyn Fn(&[String], &mut Environment) -> Result<()> + Send + Sync;

#[derive(Clone)]
pub enum Directive {
    Predicate { call: Arc<PredicateFn>, arity: Option<usize>, by_name: bool },
    Action { call: Arc<ActionFn>, arity: Option<usize>, by_name: bool },
}

impl Directive {
    /// Wrap a predicate taking any number of parameters.
    pub fn predicate<F>(call: F) -> Self
    where
        F: Fn(&[String], &Environment) -> Result<bool> + Send + Sync + 'static,
    {
        Directive::Predicate { call: Arc::new(call), arity: None, by_name: false }
    }

    /// Wrap an action taking any number of parameters.
    pub fn action<F>(call: F) -> Self
    where
        F: Fn(&[String], &mut Environment) -> Result<()> + Send + Sync + 'static,
    {
        Directive::Action { call: Arc::new(call), arity: None, by_name: false }
    }

    /// Require exactly `n` parameters. Checked when a rule is compiled.
    pub fn with_arity(mut self, n: usize) -> Self {
        match &mut self {
            Directive::Predicate { arity, .. } | Directive::Action { arity, .. } => *arity = Some(n),
        }
        self
    }

    /// Take variable names: a parameter written as exactly `<name>` arrives
    /// as `name` rather than its value. Stars are still rendered.
    pub fn by_name(mut self) -> Self {
        match &mut self {
            Directive::Predicate { by_name, .. } | Directive::Action { by_name, .. } => *by_name = true,
        }
        self
    }

    pub fn takes_names(&self) -> bool {
        match self {
            Directive::Predicate { by_name, .. } | Directive::Action { by_name, .. } => *by_name,
        }
    }

    pub fn arity(&self) -> Option<usize> {
        match self {
            Directive::Predicate { arity, .. } | Directive::Action { arity, .. } => *arity,
        }
    }

    pub fn is_predicate(&self) -> bool {
        matches!(self, Directive::Predicate { .. })
    }

    /// Gate semantics, used by `when`.
    pub fn evaluate(&self, params: &[String], env: &mut Environment) -> Result<bool> {
        match self {
            Directive::Predicate { call, .. } => call(params, env),
            Directive::Action { call, .. } => call(params, env).map(|()| true),
        }
    }

    /// Side-effect semantics, used by `post`.
    pub fn execute(&self, params: &[String], env: &mut Environment) -> Result<()> {
        match self {
            Directive::Predicate { call, .. } => call(params, env).map(|_| ()),
            Directive::Action { call, .. } => call(params, env),
        }
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_predicate() { "Predicate" } else { "Action" };
        f.debug_struct(kind)
            .field("call", &"<function>")
            .field("arity", &self.arity())
            .field("by_name", &self.takes_names())
            .finish()
    }
}

/// Name -> directive lookup used while compiling rules.
#[derive(Debug, Clone, Default)]
pub struct DirectiveRegistry {
    entries: HashMap<String, Directive>,
}

impl DirectiveRegistry {
    /// An empty registry, without built-ins.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding the built-in directives.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for (name, directive) in builtin::all() {
            registry.entries.insert(name.to_string(), directive);
        }
        registry
    }

    pub fn register(&mut self, name: &str, directive: Directive) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(EngineError::DuplicateDirective { name: name.to_string() });
        }
        self.entries.insert(name.to_string(), directive);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Directive> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
