//! Text preparation shared by rule compilation and the per-turn loop.
//!
//! - `normalize.rs`: accent folding and synonym substitution (`normalize`),
//!   plus the `SynonymTable` it reads.
//! - `expand.rs`: `(mean|key)` placeholder expansion (`expand`) over global
//!   and rule-local `MeaningTable`s.
//!
//! Both are pure functions over immutable tables. Live user input, recorded
//! history and pattern sources all go through the same `normalize` so that
//! what a rule was compiled from and what it is matched against agree.

#[path = "text/expand.rs"]
mod expand;
#[path = "text/normalize.rs"]
mod normalize;

pub use expand::{MeaningTable, expand};
pub use normalize::{SynonymTable, fold_accents, fold_key, normalize};
