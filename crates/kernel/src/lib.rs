//! Mixture kernel: the reagent solution value type and its algebra.
//!
//! # Invariants
//! - `total_volume` always equals the sum of the contents.
//! - No zero-quantity entries, no duplicate reagent ids.
//! - Composition changes conserve thermal energy; the catalog is always passed
//!   in explicitly, never resolved globally.

pub mod lookup;
pub mod reaction;
pub mod solution;

pub use lookup::{NoReagents, ReagentLookup, ReagentProperties};
pub use reaction::{ReactionHook, ReactionMethod};
pub use solution::{ReagentQuantity, Solution, SolutionError};
