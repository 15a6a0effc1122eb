//! Matching and response engine.
//!
//! ## How the parts work together
//!
//! ```text
//! RuleSpec (YAML / builder) ── Rule::compile                (compiled_rules.rs)
//!                                 - expand (mean|key)
//!                                 - normalize pattern text
//!                                 - Matcher::compile        (matcher.rs)
//!                                 - bind when/post directives
//!                                         │
//! input ── Turn::run                       v                (dispatch.rs)
//!            - normalize input
//!            - first Rule::matches wins (after -> in -> when)
//!            - render chosen out        (render.rs)
//!            - run post actions
//!            - splice (rec|...) sub-turns
//!            - record history
//!                    │
//!                    v
//!            Option<String> + TurnMetrics                   (metrics.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `matcher.rs`: wildcard pattern text -> anchored, case-insensitive regex
//!   and star extraction.
//! - `compiled_rules.rs`: `RuleSpec` shape validation and compilation into
//!   `Rule`; all load-time errors come from here.
//! - `render.rs`: `<star>`, `<star N>` and `<name>` substitution.
//! - `dispatch.rs`: rule matching semantics and the turn loop, including
//!   bounded recursive expansion.
//! - `metrics.rs`: what a turn did, for `respond_verbose` and the CLI trace.

#[path = "engine/compiled_rules.rs"]
mod compiled_rules;
#[path = "engine/dispatch.rs"]
mod dispatch;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/render.rs"]
mod render;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use compiled_rules::{RuleSpec, StageMask};
pub(crate) use compiled_rules::scalar;
pub(crate) use dispatch::Turn;
pub use matcher::{IgnoreSet, Matcher};
pub use metrics::{SubTurn, TurnMetrics};
pub use render::render;
pub(crate) use render::bare_variable;
