#[macro_use]
mod macros;
mod api;
mod directives;
mod engine;
mod error;
mod loader;
mod session;
mod text;

pub use api::{Kernel, Options, TurnDetails};
pub use directives::{ActionFn, Directive, DirectiveRegistry, PredicateFn};
pub use engine::{IgnoreSet, Matcher, RuleSpec, StageMask, SubTurn, TurnMetrics, render};
pub use error::{EngineError, LoadError, Result};
pub use loader::{parse_conversation, parse_meanings, parse_synonyms};
pub use session::{Environment, Session};
pub use text::{MeaningTable, SynonymTable, expand, fold_accents, fold_key, normalize};

// --- Compiled rule parts ------------------------------------------------------

/// Text with `<variable>` references, rendered against the environment each
/// time it is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(String);

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Template(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn render(&self, env: &Environment) -> Result<String> {
        engine::render(&self.0, env)
    }
}

/// A directive bound to its parameter templates.
///
/// Parameters are rendered right before each call, never cached, so a gate can
/// see stars captured by the same rule's `after`/`in` match.
#[derive(Debug, Clone)]
pub struct Action {
    name: String,
    directive: Directive,
    params: Vec<Template>,
}

impl Action {
    pub(crate) fn new(name: &str, directive: Directive, params: Vec<Template>) -> Self {
        Action { name: name.to_string(), directive, params }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Template] {
        &self.params
    }

    fn rendered_params(&self, env: &Environment) -> Result<Vec<String>> {
        let by_name = self.directive.takes_names();
        self.params
            .iter()
            .map(|p| match engine::bare_variable(p.as_str()).filter(|_| by_name) {
                Some(name) => Ok(name.to_string()),
                None => p.render(env),
            })
            .collect()
    }

    /// Run as a `when` gate.
    pub fn check(&self, env: &mut Environment) -> Result<bool> {
        let params = self.rendered_params(env)?;
        self.directive.evaluate(&params, env)
    }

    /// Run as a `post` action.
    pub fn run(&self, env: &mut Environment) -> Result<()> {
        let params = self.rendered_params(env)?;
        self.directive.execute(&params, env)
    }
}

/// A compiled conversation rule.
///
/// Built once from a [`RuleSpec`] by [`Rule::compile`] and never mutated.
/// Stages are evaluated in order `after` -> `in` -> `when`; a rule with no
/// matchers and no gates matches every input.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) after: Vec<Matcher>,
    pub(crate) input: Vec<Matcher>,
    pub(crate) when: Vec<Action>,
    pub(crate) out: Vec<Template>,
    pub(crate) post: Vec<Action>,
    pub(crate) meanings: Option<MeaningTable>,
    pub(crate) ignore: IgnoreSet,
    pub(crate) stages: StageMask,
}

impl Rule {
    pub fn after(&self) -> &[Matcher] {
        &self.after
    }

    pub fn inputs(&self) -> &[Matcher] {
        &self.input
    }

    pub fn when(&self) -> &[Action] {
        &self.when
    }

    pub fn outputs(&self) -> &[Template] {
        &self.out
    }

    pub fn post(&self) -> &[Action] {
        &self.post
    }

    pub fn local_meanings(&self) -> Option<&MeaningTable> {
        self.meanings.as_ref()
    }

    pub fn ignore(&self) -> &IgnoreSet {
        &self.ignore
    }

    pub fn stages(&self) -> StageMask {
        self.stages
    }
}
