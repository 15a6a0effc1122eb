//! Per-user sessions and the environment that owns them.
//!
//! The `Environment` is the only mutable state shared by a turn: global
//! variables, the synonym and meaning tables, the directive registry, and the
//! user id -> `Session` map with the currently active id. It is passed
//! explicitly into matching, rendering and every directive call; nothing is
//! process-global.
//!
//! Variables live at three levels, consulted in this order when rendering:
//! stars (captured by the last successful `after`/`in` match), globals, then
//! the active session's locals.

use crate::directives::{Directive, DirectiveRegistry};
use crate::error::{EngineError, Result};
use crate::text::{MeaningTable, SynonymTable};
use std::collections::HashMap;

/// Conversation state of a single user.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inputs: Vec<String>,
    responses: Vec<String>,
    normalized_responses: Vec<String>,
    stars: Vec<String>,
    locals: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized inputs, oldest first.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Rendered responses as returned to the caller, oldest first.
    pub fn responses(&self) -> &[String] {
        &self.responses
    }

    /// Normalized responses; `after` patterns match the last of these.
    pub fn normalized_responses(&self) -> &[String] {
        &self.normalized_responses
    }

    pub fn last_normalized_response(&self) -> Option<&str> {
        self.normalized_responses.last().map(String::as_str)
    }

    pub fn stars(&self) -> &[String] {
        &self.stars
    }

    pub fn set_stars(&mut self, stars: Vec<String>) {
        self.stars = stars;
    }

    pub fn locals(&self) -> &HashMap<String, String> {
        &self.locals
    }

    pub fn local(&self, name: &str) -> Option<&str> {
        self.locals.get(name).map(String::as_str)
    }

    pub fn set_local(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.locals.insert(name.into(), value.into());
    }

    /// Remove a local variable; a no-op when it is not set.
    pub fn remove_local(&mut self, name: &str) -> Option<String> {
        self.locals.remove(name)
    }

    pub(crate) fn record_input(&mut self, normalized: String) {
        self.inputs.push(normalized);
    }

    pub(crate) fn record_response(&mut self, rendered: String, normalized: String) {
        self.responses.push(rendered);
        self.normalized_responses.push(normalized);
    }
}

#[derive(Debug, Clone)]
pub struct Environment {
    globals: HashMap<String, String>,
    synonyms: SynonymTable,
    meanings: MeaningTable,
    directives: DirectiveRegistry,
    sessions: HashMap<String, Session>,
    active: Option<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Empty tables, built-in directives, no sessions.
    pub fn new() -> Self {
        Environment {
            globals: HashMap::new(),
            synonyms: SynonymTable::new(),
            meanings: MeaningTable::new(),
            directives: DirectiveRegistry::with_builtins(),
            sessions: HashMap::new(),
            active: None,
        }
    }

    // --- Variables and tables ------------------------------------------------

    pub fn globals(&self) -> &HashMap<String, String> {
        &self.globals
    }

    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals.get(name).map(String::as_str)
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.globals.insert(name.into(), value.into());
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn synonyms_mut(&mut self) -> &mut SynonymTable {
        &mut self.synonyms
    }

    pub fn meanings(&self) -> &MeaningTable {
        &self.meanings
    }

    pub fn meanings_mut(&mut self) -> &mut MeaningTable {
        &mut self.meanings
    }

    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    pub fn register_directive(&mut self, name: &str, directive: Directive) -> Result<()> {
        self.directives.register(name, directive)
    }

    // --- Sessions --------------------------------------------------------------

    pub fn add_user(&mut self, id: &str) -> Result<()> {
        if self.sessions.contains_key(id) {
            return Err(EngineError::DuplicateUser { id: id.to_string() });
        }
        self.sessions.insert(id.to_string(), Session::new());
        Ok(())
    }

    /// Make `id` the active user, creating its session if it has none.
    pub(crate) fn open_session(&mut self, id: &str) -> &mut Session {
        self.active = Some(id.to_string());
        self.sessions.entry(id.to_string()).or_insert_with(Session::new)
    }

    /// Drop a user's session. Removing the active user clears the selection.
    pub fn remove_user(&mut self, id: &str) -> Result<Session> {
        let session = self.sessions.remove(id).ok_or_else(|| EngineError::UnknownUser { id: id.to_string() })?;
        if self.active.as_deref() == Some(id) {
            tracing::warn!(user = id, "removed the active user; no user is active now");
            self.active = None;
        }
        Ok(session)
    }

    pub fn set_active_user(&mut self, id: &str) -> Result<()> {
        if !self.sessions.contains_key(id) {
            return Err(EngineError::UnknownUser { id: id.to_string() });
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    pub fn active_user(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn has_user(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn user_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn active_session(&self) -> Result<&Session> {
        let id = self.active.as_deref().ok_or(EngineError::NoActiveSession)?;
        self.sessions.get(id).ok_or_else(|| EngineError::UnknownUser { id: id.to_string() })
    }

    pub fn active_session_mut(&mut self) -> Result<&mut Session> {
        let id = self.active.as_deref().ok_or(EngineError::NoActiveSession)?;
        self.sessions.get_mut(id).ok_or_else(|| EngineError::UnknownUser { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_are_unique() {
        let mut env = Environment::new();
        env.add_user("ana").unwrap();
        assert!(matches!(env.add_user("ana"), Err(EngineError::DuplicateUser { .. })));
        assert_eq!(env.user_count(), 1);
    }

    #[test]
    fn unknown_users_are_session_errors() {
        let mut env = Environment::new();
        assert!(matches!(env.set_active_user("ghost"), Err(EngineError::UnknownUser { .. })));
        assert!(matches!(env.remove_user("ghost"), Err(EngineError::UnknownUser { .. })));
        assert!(matches!(env.active_session(), Err(EngineError::NoActiveSession)));
        assert_eq!(env.active_user(), None);
    }

    #[test]
    fn open_session_creates_once_and_activates() {
        let mut env = Environment::new();
        env.open_session("ana").set_local("mood", "happy");
        assert_eq!(env.active_user(), Some("ana"));

        env.open_session("ana");
        assert_eq!(env.user_count(), 1);
        assert_eq!(env.active_session().unwrap().local("mood"), Some("happy"));
    }

    #[test]
    fn removing_active_user_clears_selection() {
        let mut env = Environment::new();
        env.add_user("ana").unwrap();
        env.add_user("bia").unwrap();
        env.set_active_user("ana").unwrap();
        env.active_session_mut().unwrap().set_local("mood", "happy");

        let removed = env.remove_user("ana").unwrap();
        assert_eq!(removed.local("mood"), Some("happy"));
        assert_eq!(env.active_user(), None);
        assert!(env.has_user("bia"));
    }

    #[test]
    fn sessions_are_independent() {
        let mut env = Environment::new();
        env.add_user("ana").unwrap();
        env.add_user("bia").unwrap();

        env.set_active_user("ana").unwrap();
        env.active_session_mut().unwrap().set_stars(vec!["x".into()]);
        env.active_session_mut().unwrap().set_local("k", "v");

        env.set_active_user("bia").unwrap();
        assert!(env.active_session().unwrap().stars().is_empty());
        assert_eq!(env.active_session().unwrap().local("k"), None);
        assert_eq!(env.session("ana").unwrap().stars(), ["x".to_string()]);
    }

    #[test]
    fn history_tracks_last_normalized_response() {
        let mut session = Session::new();
        assert_eq!(session.last_normalized_response(), None);
        session.record_input("hi".into());
        session.record_response("Hello, Ana!".into(), "hello, ana!".into());
        session.record_response("Bye".into(), "bye".into());
        assert_eq!(session.inputs(), ["hi".to_string()]);
        assert_eq!(session.responses().len(), 2);
        assert_eq!(session.last_normalized_response(), Some("bye"));
    }
}
