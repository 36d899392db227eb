use crate::solution::Solution;
use chemix_common::FixedPoint2;
use serde::{Deserialize, Serialize};

/// How a solution comes into contact with a reaction target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionMethod {
    /// Splashed or poured onto the target.
    Touch,
    Injection,
    Ingestion,
}

/// External reaction resolution invoked per reagent by
/// [`Solution::do_entity_reaction`].
///
/// The hook receives the source solution mutably and may add or remove
/// reagents from it; the solution iterates over a snapshot, so such changes
/// never cause entries to be skipped or visited twice.
pub trait ReactionHook<T: ?Sized> {
    fn react(
        &mut self,
        target: &mut T,
        method: ReactionMethod,
        reagent_id: &str,
        quantity: FixedPoint2,
        source: &mut Solution,
    );
}

impl<T, F> ReactionHook<T> for F
where
    T: ?Sized,
    F: FnMut(&mut T, ReactionMethod, &str, FixedPoint2, &mut Solution),
{
    fn react(
        &mut self,
        target: &mut T,
        method: ReactionMethod,
        reagent_id: &str,
        quantity: FixedPoint2,
        source: &mut Solution,
    ) {
        self(target, method, reagent_id, quantity, source)
    }
}
