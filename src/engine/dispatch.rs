//! The per-turn algorithm.
//!
//! ```text
//! input ── normalize ── scan rules in order ──┬── first Rule::matches ──┐
//!                                             └── none: no output      │
//!                                                                      v
//!                     render a random `out` ── run `post` actions ── record input
//!                                                                      │
//!          record output <── splice (rec|...) sub-turns, depth + 1 <───┘
//! ```
//!
//! Selection is first-match over the whole rule list, never best-match. Inside
//! a rule the first accepting `after` matcher and the first accepting `in`
//! matcher commit their stars to the session; then every `when` gate must
//! pass. There is no backtracking once a stage has committed.
//!
//! Sub-turns re-enter the same environment and the same active session
//! without recording history, so they see (and may change) stars and locals
//! set by the outer turn.

use super::compiled_rules::StageMask;
use super::metrics::{SubTurn, TurnMetrics};
use crate::error::{EngineError, Result};
use crate::session::Environment;
use crate::text::normalize;
use crate::{Rule, Template};
use rand::RngCore;
use rand::seq::SliceRandom;
use std::time::Instant;

impl Rule {
    /// Test this rule against normalized `input`, committing stars to the
    /// active session as the `after` and `in` stages succeed.
    pub fn matches(&self, input: &str, env: &mut Environment) -> Result<bool> {
        if self.stages.contains(StageMask::AFTER) {
            let captured = match env.active_session()?.last_normalized_response() {
                Some(last) => self.after.iter().find_map(|m| m.captures(last)),
                None => None,
            };
            let Some(stars) = captured else {
                tracing::trace!("after: no pattern matched the last response");
                return Ok(false);
            };
            env.active_session_mut()?.set_stars(stars);
        }

        if self.stages.contains(StageMask::IN) {
            let Some(stars) = self.input.iter().find_map(|m| m.captures(input)) else {
                return Ok(false);
            };
            env.active_session_mut()?.set_stars(stars);
        }

        for action in &self.when {
            if !action.check(env)? {
                tracing::trace!(directive = action.name(), "when: gate rejected");
                return Ok(false);
            }
        }

        Ok(true)
    }

    pub(crate) fn choose_output(&self, rng: &mut dyn RngCore) -> Result<&Template> {
        self.out.choose(rng).ok_or_else(|| EngineError::MissingTag { tag: "out".to_string() })
    }

    pub(crate) fn run_post(&self, env: &mut Environment) -> Result<()> {
        for action in &self.post {
            action.run(env)?;
        }
        Ok(())
    }
}

/// One top-level call and all its sub-turns.
pub(crate) struct Turn<'k> {
    pub rules: &'k [Rule],
    pub env: &'k mut Environment,
    pub rng: &'k mut dyn RngCore,
    pub max_depth: Option<usize>,
    pub metrics: TurnMetrics,
}

impl<'k> Turn<'k> {
    pub fn new(
        rules: &'k [Rule],
        env: &'k mut Environment,
        rng: &'k mut dyn RngCore,
        max_depth: Option<usize>,
    ) -> Self {
        Turn { rules, env, rng, max_depth, metrics: TurnMetrics::default() }
    }

    /// Run the turn, timing it into `metrics`.
    pub fn run(&mut self, input: &str, record: bool) -> Result<Option<String>> {
        let started = Instant::now();
        let result = self.respond(input, record, 0);
        self.metrics.elapsed = started.elapsed();
        result
    }

    fn respond(&mut self, input: &str, record: bool, depth: usize) -> Result<Option<String>> {
        let normalized = normalize(input, self.env.synonyms());

        let rules = self.rules;
        let mut answer: Option<(usize, String)> = None;
        let mut tried = 0;
        for (idx, rule) in rules.iter().enumerate() {
            tried += 1;
            if rule.matches(&normalized, self.env)? {
                let rendered = rule.choose_output(self.rng)?.render(self.env)?;
                rule.run_post(self.env)?;
                answer = Some((idx, rendered));
                break;
            }
        }

        let matched = answer.as_ref().map(|(idx, _)| *idx);
        tracing::debug!(input = %normalized, depth, matched_rule = ?matched, tried, "rule scan finished");
        if depth == 0 {
            self.metrics.normalized_input = normalized.clone();
            self.metrics.matched_rule = matched;
            self.metrics.rules_tried = tried;
        } else {
            self.metrics.recursion.push(SubTurn { depth, input: normalized.clone(), matched_rule: matched });
        }

        if record {
            self.env.active_session_mut()?.record_input(normalized);
        }

        let Some((_, rendered)) = answer else {
            return Ok(None);
        };
        let output = self.expand_recursive(&rendered, depth)?;

        if record {
            let normalized_output = normalize(&output, self.env.synonyms());
            self.env.active_session_mut()?.record_response(output.clone(), normalized_output);
        }
        Ok(Some(output))
    }

    /// Replace each `(rec|text)` token with the reply to `text`, or with
    /// nothing when no rule answers it.
    fn expand_recursive(&mut self, output: &str, depth: usize) -> Result<String> {
        let token = crate::regex!(r"\(rec\|([^)]*)\)");
        if !token.is_match(output) {
            return Ok(output.to_string());
        }
        if let Some(limit) = self.max_depth {
            if depth >= limit {
                return Err(EngineError::RecursionLimit { limit });
            }
        }

        let mut expanded = String::with_capacity(output.len());
        let mut last = 0;
        for caps in token.captures_iter(output) {
            let (Some(whole), Some(sub)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            tracing::debug!(depth = depth + 1, input = sub.as_str(), "recursive expansion");
            expanded.push_str(&output[last..whole.start()]);
            expanded.push_str(&self.respond(sub.as_str(), false, depth + 1)?.unwrap_or_default());
            last = whole.end();
        }
        expanded.push_str(&output[last..]);
        Ok(expanded)
    }
}
