use crate::directives::Directive;
use crate::engine::{RuleSpec, SubTurn, Turn};
use crate::error::{EngineError, Result};
use crate::session::{Environment, Session};
use crate::text::normalize;
use crate::Rule;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt;
use std::time::Duration;

/// Runtime knobs for a [`Kernel`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Deepest allowed `(rec|...)` nesting. `None` removes the limit, in which
    /// case a rule set that recurses forever exhausts the stack.
    pub max_recursion_depth: Option<usize>,
    /// User created on startup and used when no user is active.
    pub default_user: String,
    /// Whether turns append to session history.
    pub record_history: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { max_recursion_depth: Some(32), default_user: "default".to_string(), record_history: true }
    }
}

/// Everything [`Kernel::respond_verbose`] knows about a turn.
#[derive(Debug, Clone)]
pub struct TurnDetails {
    /// The input as given.
    pub input: String,
    pub normalized_input: String,
    pub output: Option<String>,
    /// Index (in load order) of the rule that answered.
    pub matched_rule: Option<usize>,
    pub rules_tried: usize,
    pub recursion: Vec<SubTurn>,
    pub elapsed: Duration,
}

/// The conversation engine: compiled rules plus the environment they run in.
///
/// # Example
/// ```
/// use colloquy::{Kernel, Options, RuleSpec};
///
/// let mut kernel = Kernel::new(Options::default());
/// kernel.load_rules(&[RuleSpec::new().input("Knock knock *").out("Hi <star>!")]).unwrap();
///
/// let reply = kernel.respond("Knock knock World", None).unwrap();
/// assert_eq!(reply.as_deref(), Some("Hi World!"));
/// ```
pub struct Kernel {
    pub(crate) env: Environment,
    pub(crate) rules: Vec<Rule>,
    options: Options,
    rng: Box<dyn RngCore + Send>,
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("env", &self.env)
            .field("rules", &self.rules.len())
            .field("options", &self.options)
            .field("rng", &"<rng>")
            .finish()
    }
}

impl Kernel {
    /// A kernel with built-in directives, no rules, and the default user
    /// registered and active.
    pub fn new(options: Options) -> Self {
        Self::with_rng(options, StdRng::from_entropy())
    }

    /// Like [`Kernel::new`] with an explicit source of randomness for output
    /// selection.
    pub fn with_rng(options: Options, rng: impl RngCore + Send + 'static) -> Self {
        let mut env = Environment::new();
        env.open_session(&options.default_user);
        Kernel { env, rules: Vec::new(), options, rng: Box::new(rng) }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    // --- Tables and directives --------------------------------------------------
    //
    // Rules compile against the tables as they are when `load_rules` runs, so
    // these must be called first.

    pub fn add_directive(&mut self, name: &str, directive: Directive) -> Result<()> {
        self.env.register_directive(name, directive)
    }

    pub fn add_synonyms<S: AsRef<str>>(&mut self, group: &[S]) -> Result<()> {
        self.env.synonyms_mut().insert(group)
    }

    /// Add a global meaning. Phrases are normalized with the current synonyms.
    pub fn add_meaning<S: AsRef<str>>(&mut self, key: &str, phrases: &[S]) -> Result<()> {
        add_meaning(&mut self.env, key, phrases)
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.set_global(name, value);
    }

    /// Compile `specs` and append them after the rules already loaded.
    ///
    /// Either every spec compiles and all are appended, or none are.
    pub fn load_rules(&mut self, specs: &[RuleSpec]) -> Result<()> {
        let compiled = specs.iter().map(|spec| Rule::compile(spec, &self.env)).collect::<Result<Vec<_>>>()?;
        tracing::info!(added = compiled.len(), total = self.rules.len() + compiled.len(), "rules loaded");
        self.rules.extend(compiled);
        Ok(())
    }

    // --- Sessions -----------------------------------------------------------------

    pub fn add_user(&mut self, id: &str) -> Result<()> {
        self.env.add_user(id)
    }

    pub fn remove_user(&mut self, id: &str) -> Result<Session> {
        self.env.remove_user(id)
    }

    pub fn set_active_user(&mut self, id: &str) -> Result<()> {
        self.env.set_active_user(id)
    }

    pub fn active_user(&self) -> Option<&str> {
        self.env.active_user()
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.env.session(id)
    }

    /// Pick the session for this turn: the explicit user, else the active
    /// one, else the default user. Fails without touching any state.
    fn select_user(&mut self, user: Option<&str>) -> Result<()> {
        if let Some(id) = user {
            return self.env.set_active_user(id);
        }
        if self.env.active_user().is_some_and(|id| self.env.has_user(id)) {
            return Ok(());
        }
        if self.env.has_user(&self.options.default_user) {
            return self.env.set_active_user(&self.options.default_user);
        }
        if self.env.user_count() == 0 {
            return Err(EngineError::Uninitialized { reason: "no user session exists" });
        }
        Err(EngineError::NoActiveSession)
    }

    // --- Turns --------------------------------------------------------------------

    /// Answer `input` for `user` (or the active/default user).
    ///
    /// `Ok(None)` means no rule matched; that is a normal outcome, not an
    /// error.
    pub fn respond(&mut self, input: &str, user: Option<&str>) -> Result<Option<String>> {
        Ok(self.respond_verbose(input, user)?.output)
    }

    /// Answer `input` and report which rule answered, how many were tried,
    /// the sub-turns spawned by `(rec|...)` tokens, and timing.
    pub fn respond_verbose(&mut self, input: &str, user: Option<&str>) -> Result<TurnDetails> {
        if self.rules.is_empty() {
            return Err(EngineError::Uninitialized { reason: "no rules loaded" });
        }
        self.select_user(user)?;

        let mut turn = Turn::new(&self.rules, &mut self.env, self.rng.as_mut(), self.options.max_recursion_depth);
        let output = turn.run(input, self.options.record_history)?;
        let metrics = turn.metrics;

        Ok(TurnDetails {
            input: input.to_string(),
            normalized_input: metrics.normalized_input,
            output,
            matched_rule: metrics.matched_rule,
            rules_tried: metrics.rules_tried,
            recursion: metrics.recursion,
            elapsed: metrics.elapsed,
        })
    }
}

pub(crate) fn add_meaning<S: AsRef<str>>(env: &mut Environment, key: &str, phrases: &[S]) -> Result<()> {
    let phrases = phrases.iter().map(|p| normalize(p.as_ref(), env.synonyms()).to_lowercase()).collect();
    env.meanings_mut().insert(key, phrases)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel() -> Kernel {
        let mut kernel = Kernel::with_rng(Options::default(), StdRng::seed_from_u64(7));
        kernel.load_rules(&[RuleSpec::new().input("hello").out("hi")]).unwrap();
        kernel
    }

    #[test]
    fn starts_with_default_user_active() {
        let kernel = Kernel::new(Options::default());
        assert_eq!(kernel.active_user(), Some("default"));
        assert!(kernel.session("default").is_some());
    }

    #[test]
    fn custom_default_user_is_opened() {
        let options = Options { default_user: "guest".to_string(), ..Options::default() };
        let kernel = Kernel::with_rng(options, StdRng::seed_from_u64(1));
        assert_eq!(kernel.active_user(), Some("guest"));
        assert_eq!(kernel.environment().user_count(), 1);
    }

    #[test]
    fn respond_requires_rules() {
        let mut kernel = Kernel::new(Options::default());
        assert!(matches!(kernel.respond("hello", None), Err(EngineError::Uninitialized { .. })));
    }

    #[test]
    fn respond_requires_a_session() {
        let mut kernel = kernel();
        kernel.remove_user("default").unwrap();
        assert!(matches!(kernel.respond("hello", None), Err(EngineError::Uninitialized { .. })));

        kernel.add_user("ana").unwrap();
        assert!(matches!(kernel.respond("hello", None), Err(EngineError::NoActiveSession)));
        assert_eq!(kernel.respond("hello", Some("ana")).unwrap().as_deref(), Some("hi"));
    }

    #[test]
    fn falls_back_to_default_user_after_active_is_removed() {
        let mut kernel = kernel();
        kernel.add_user("ana").unwrap();
        kernel.respond("hello", Some("ana")).unwrap();
        kernel.remove_user("ana").unwrap();

        kernel.respond("hello", None).unwrap();
        assert_eq!(kernel.active_user(), Some("default"));
        assert_eq!(kernel.session("default").unwrap().inputs().len(), 1);
    }

    #[test]
    fn load_rules_is_all_or_nothing() {
        let mut kernel = kernel();
        let err = kernel.load_rules(&[RuleSpec::new().input("a").out("b"), RuleSpec::new().input("c")]).unwrap_err();
        assert!(matches!(err, EngineError::MissingTag { .. }));
        assert_eq!(kernel.rule_count(), 1);
    }

    #[test]
    fn history_can_be_disabled() {
        let options = Options { record_history: false, ..Options::default() };
        let mut kernel = Kernel::with_rng(options, StdRng::seed_from_u64(1));
        kernel.load_rules(&[RuleSpec::new().out("ok")]).unwrap();
        kernel.respond("anything", None).unwrap();
        assert!(kernel.session("default").unwrap().inputs().is_empty());
    }

    #[test]
    fn add_meaning_normalizes_phrases() {
        let mut kernel = kernel();
        kernel.add_synonyms(&["hello", "hi"]).unwrap();
        kernel.add_meaning("Greeting", &["Hi", "Olá"]).unwrap();
        assert_eq!(
            kernel.environment().meanings().get("greeting"),
            Some(&["hello".to_string(), "ola".to_string()][..])
        );
    }
}
