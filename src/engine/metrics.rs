//! Turn metrics.
//!
//! Collected by every turn and surfaced through `Kernel::respond_verbose`;
//! the plain `respond` path simply drops them.

use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct TurnMetrics {
    /// Input after accent folding and synonym substitution.
    pub normalized_input: String,
    /// Index (in load order) of the rule that answered, if any.
    pub matched_rule: Option<usize>,
    /// Rules attempted by the top-level scan, including the one that matched.
    pub rules_tried: usize,
    /// One entry per `(rec|...)` expansion, in the order they ran.
    pub recursion: Vec<SubTurn>,
    /// Wall time of the whole turn, recursion included.
    pub elapsed: Duration,
}

/// A recursive sub-turn triggered by a `(rec|...)` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubTurn {
    /// 1 for a token in the top-level output, 2 for one inside that, ...
    pub depth: usize,
    pub input: String,
    pub matched_rule: Option<usize>,
}
