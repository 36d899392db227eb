//! Developer tooling: read-only solution inspection.
//!
//! # Invariants
//! - Tools never mutate the solutions they look at.

pub mod inspector;

pub use inspector::{ReagentInfo, SolutionInspector, SolutionSummary};

pub fn crate_info() -> &'static str {
    "chemix-tools v0.1.0"
}
