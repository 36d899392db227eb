use crate::lookup::ReagentLookup;
use crate::reaction::{ReactionHook, ReactionMethod};
use chemix_common::{Color, FixedPoint2, ROOM_TEMPERATURE};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A reagent id paired with the amount of it present in a solution.
///
/// Identity is the reagent id; [`ReagentQuantity::cmp_by_quantity`] gives the
/// ascending-by-amount order used for display and selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReagentQuantity {
    reagent_id: String,
    quantity: FixedPoint2,
}

impl ReagentQuantity {
    pub fn new(reagent_id: impl Into<String>, quantity: FixedPoint2) -> Self {
        Self {
            reagent_id: reagent_id.into(),
            quantity,
        }
    }

    pub fn reagent_id(&self) -> &str {
        &self.reagent_id
    }

    pub fn quantity(&self) -> FixedPoint2 {
        self.quantity
    }

    pub fn into_parts(self) -> (String, FixedPoint2) {
        (self.reagent_id, self.quantity)
    }

    /// Order by quantity, smallest first.
    pub fn cmp_by_quantity(&self, other: &Self) -> Ordering {
        self.quantity.cmp(&other.quantity)
    }
}

impl fmt::Display for ReagentQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.reagent_id, self.quantity)
    }
}

/// Errors from building a solution out of untrusted parts (e.g. a save file).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolutionError {
    #[error("duplicate reagent {0:?}")]
    DuplicateReagent(String),
    #[error("reagent {reagent_id:?} has non-positive quantity {quantity}")]
    NonPositiveQuantity {
        reagent_id: String,
        quantity: FixedPoint2,
    },
    #[error("invalid temperature {0}")]
    InvalidTemperature(f32),
    #[error("adding reagent {0:?} takes the total volume past {max}", max = FixedPoint2::MAX)]
    QuantityOverflow(String),
}

/// A mixture of reagents with a temperature.
///
/// Contents are kept in insertion order, which is meaningful: color blending
/// walks the contents in order. The cached `total_volume` is updated together
/// with every change to the contents and is never read from storage.
///
/// Operations that need per-reagent data (specific heat, color) take the
/// catalog as an explicit [`ReagentLookup`] argument.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SolutionData")]
pub struct Solution {
    #[serde(rename = "reagents")]
    contents: Vec<ReagentQuantity>,
    #[serde(skip)]
    total_volume: FixedPoint2,
    temperature: f32,
}

/// Wire form of a [`Solution`]: ordered contents plus temperature.
#[derive(Deserialize)]
struct SolutionData {
    reagents: Vec<ReagentQuantity>,
    #[serde(default = "room_temperature")]
    temperature: f32,
}

fn room_temperature() -> f32 {
    ROOM_TEMPERATURE
}

impl TryFrom<SolutionData> for Solution {
    type Error = SolutionError;

    fn try_from(data: SolutionData) -> Result<Self, Self::Error> {
        Self::from_parts(data.reagents, data.temperature)
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Solution {
    /// Deep copy. The total is recomputed from the copied contents rather than
    /// copied from the cache.
    fn clone(&self) -> Self {
        let contents = self.contents.clone();
        let total_volume = contents.iter().map(|r| r.quantity).sum();
        let copy = Self {
            contents,
            total_volume,
            temperature: self.temperature,
        };
        copy.check_invariants();
        copy
    }
}

impl Solution {
    /// An empty solution at room temperature.
    pub fn new() -> Self {
        Self {
            // Most containers hold one or two reagents.
            contents: Vec::with_capacity(2),
            total_volume: FixedPoint2::ZERO,
            temperature: ROOM_TEMPERATURE,
        }
    }

    /// A solution holding a single reagent at room temperature.
    pub fn with_reagent<L: ReagentLookup + ?Sized>(
        lookup: &L,
        reagent_id: &str,
        quantity: FixedPoint2,
    ) -> Self {
        let mut solution = Self::new();
        solution.add_reagent(lookup, reagent_id, quantity, None);
        solution
    }

    /// Rebuild a solution from stored contents, validating every invariant.
    ///
    /// The total volume is recomputed; entries must be positive and unique, and
    /// together may not exceed [`FixedPoint2::MAX`].
    pub fn from_parts(
        contents: Vec<ReagentQuantity>,
        temperature: f32,
    ) -> Result<Self, SolutionError> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(SolutionError::InvalidTemperature(temperature));
        }
        let mut solution = Self {
            contents: Vec::with_capacity(contents.len()),
            total_volume: FixedPoint2::ZERO,
            temperature,
        };
        for entry in contents {
            if !entry.quantity.is_positive() {
                tracing::warn!(reagent = %entry.reagent_id, quantity = %entry.quantity, "rejecting non-positive entry");
                return Err(SolutionError::NonPositiveQuantity {
                    reagent_id: entry.reagent_id,
                    quantity: entry.quantity,
                });
            }
            if solution.contains_reagent(&entry.reagent_id) {
                tracing::warn!(reagent = %entry.reagent_id, "rejecting duplicate entry");
                return Err(SolutionError::DuplicateReagent(entry.reagent_id));
            }
            let Some(total) = solution.total_volume.checked_add(entry.quantity) else {
                tracing::warn!(reagent = %entry.reagent_id, quantity = %entry.quantity, "rejecting entry past capacity");
                return Err(SolutionError::QuantityOverflow(entry.reagent_id));
            };
            solution.total_volume = total;
            solution.contents.push(entry);
        }
        Ok(solution)
    }

    /// Sum of all reagent quantities.
    pub fn total_volume(&self) -> FixedPoint2 {
        self.total_volume
    }

    /// Temperature in kelvin.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = temperature;
    }

    pub fn contents(&self) -> &[ReagentQuantity] {
        &self.contents
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReagentQuantity> {
        self.contents.iter()
    }

    /// Number of distinct reagents.
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn contains_reagent(&self, reagent_id: &str) -> bool {
        self.position(reagent_id).is_some()
    }

    /// Quantity of a reagent, or `None` when it is absent.
    pub fn find_reagent(&self, reagent_id: &str) -> Option<FixedPoint2> {
        self.position(reagent_id).map(|i| self.contents[i].quantity)
    }

    /// Quantity of a reagent; absence is a valid zero quantity.
    pub fn reagent_quantity(&self, reagent_id: &str) -> FixedPoint2 {
        self.find_reagent(reagent_id).unwrap_or(FixedPoint2::ZERO)
    }

    /// Id of the most plentiful reagent. Ties go to the earliest entry.
    ///
    /// `None` for an empty solution, where an id-as-string API would return "".
    pub fn primary_reagent_id(&self) -> Option<&str> {
        let mut primary: Option<&ReagentQuantity> = None;
        for entry in &self.contents {
            if primary.is_none_or(|p| entry.quantity > p.quantity) {
                primary = Some(entry);
            }
        }
        primary.map(|p| p.reagent_id.as_str())
    }

    /// Sum of `quantity * specific_heat` over the contents.
    pub fn heat_capacity<L: ReagentLookup + ?Sized>(&self, lookup: &L) -> f32 {
        self.contents
            .iter()
            .map(|r| r.quantity.to_f32() * lookup.specific_heat(&r.reagent_id))
            .sum()
    }

    pub fn thermal_energy<L: ReagentLookup + ?Sized>(&self, lookup: &L) -> f32 {
        self.temperature * self.heat_capacity(lookup)
    }

    /// Set the temperature so that the solution holds `energy`.
    ///
    /// Without heat capacity there is no temperature to derive and the current
    /// one is kept.
    pub fn set_thermal_energy<L: ReagentLookup + ?Sized>(&mut self, lookup: &L, energy: f32) {
        let heat_capacity = self.heat_capacity(lookup);
        if heat_capacity > 0.0 {
            self.temperature = energy / heat_capacity;
        }
    }

    /// Add `quantity` of a reagent, optionally at its own temperature.
    ///
    /// Non-positive quantities are ignored. Thermal energy is conserved: the new
    /// temperature is the combined energy over the combined heat capacity.
    ///
    /// The total volume is capped at [`FixedPoint2::MAX`]; anything past it is
    /// dropped.
    pub fn add_reagent<L: ReagentLookup + ?Sized>(
        &mut self,
        lookup: &L,
        reagent_id: &str,
        quantity: FixedPoint2,
        temperature: Option<f32>,
    ) {
        if !quantity.is_positive() {
            return;
        }
        let quantity = self.clamp_to_capacity(reagent_id, quantity);
        if !quantity.is_positive() {
            return;
        }
        let temperature = temperature.unwrap_or(self.temperature);
        let old_energy = self.thermal_energy(lookup);
        let added_energy = quantity.to_f32() * lookup.specific_heat(reagent_id) * temperature;

        match self.position(reagent_id) {
            Some(i) => self.contents[i].quantity += quantity,
            None => self
                .contents
                .push(ReagentQuantity::new(reagent_id, quantity)),
        }
        self.total_volume += quantity;
        self.set_thermal_energy(lookup, old_energy + added_energy);
        self.check_invariants();
    }

    /// Remove up to `quantity` of a reagent. Returns the amount removed.
    ///
    /// An entry that would drop to zero or below is removed entirely; removal
    /// swaps the last entry into its slot.
    pub fn remove_reagent(&mut self, reagent_id: &str, quantity: FixedPoint2) -> FixedPoint2 {
        if !quantity.is_positive() {
            return FixedPoint2::ZERO;
        }
        let Some(i) = self.position(reagent_id) else {
            return FixedPoint2::ZERO;
        };

        let current = self.contents[i].quantity;
        let removed = if current <= quantity {
            self.contents.swap_remove(i);
            current
        } else {
            self.contents[i].quantity -= quantity;
            quantity
        };
        self.total_volume -= removed;
        self.check_invariants();
        removed
    }

    /// Multiply every reagent quantity by `factor`.
    pub fn scale_solution<L: ReagentLookup + ?Sized>(&mut self, lookup: &L, factor: f32) {
        if factor == 1.0 || factor.is_nan() {
            return;
        }
        // add/remove mutate the contents, so walk a copy.
        let snapshot = self.contents.clone();
        for entry in &snapshot {
            let scaled = entry.quantity.scale(f64::from(factor));
            if factor > 1.0 {
                self.add_reagent(lookup, &entry.reagent_id, scaled - entry.quantity, None);
            } else {
                self.remove_reagent(&entry.reagent_id, entry.quantity - scaled);
            }
        }
    }

    /// Remove everything. The temperature is left as it was.
    pub fn remove_all_solution(&mut self) {
        self.contents.clear();
        self.total_volume = FixedPoint2::ZERO;
    }

    /// Remove `quantity` spread proportionally over every reagent, discarding it.
    ///
    /// Each entry keeps its truncated share. Returns the amount removed.
    pub fn remove_solution(&mut self, quantity: FixedPoint2) -> FixedPoint2 {
        if !quantity.is_positive() {
            return FixedPoint2::ZERO;
        }
        let total = self.total_volume;
        if quantity >= total {
            self.remove_all_solution();
            return total;
        }

        let kept_total = total - quantity;
        self.contents.retain_mut(|entry| {
            entry.quantity = entry.quantity.mul_div(kept_total, total);
            entry.quantity.is_positive()
        });
        self.total_volume = self.contents.iter().map(|r| r.quantity).sum();
        self.check_invariants();
        total - self.total_volume
    }

    /// Move `quantity` out of this solution into a new one, keeping the
    /// composition ratios of both.
    ///
    /// Entries are visited last to first. Each keeps `quantity * (remaining -
    /// owed) / remaining`, truncated; the rest moves to the extract and is
    /// deducted from the amount still owed. The last entries visited absorb the
    /// rounding, so the extract holds exactly `quantity`. Both halves keep the
    /// original temperature. The extract receives reagents in visiting order,
    /// i.e. reversed.
    pub fn split_solution(&mut self, quantity: FixedPoint2) -> Solution {
        if !quantity.is_positive() {
            return Self::new();
        }
        if quantity >= self.total_volume {
            let extract = self.clone();
            self.remove_all_solution();
            return extract;
        }

        let mut extract = Self {
            contents: Vec::with_capacity(self.contents.len()),
            total_volume: FixedPoint2::ZERO,
            temperature: self.temperature,
        };
        let mut remaining = self.total_volume;
        let mut owed = quantity;

        for i in (0..self.contents.len()).rev() {
            if remaining.is_zero() {
                // Only reachable with a zero-quantity entry present.
                break;
            }
            assert!(
                remaining.is_positive(),
                "negative remaining volume {remaining} during split"
            );

            let current = self.contents[i].quantity;
            let keep = current.mul_div(remaining - owed, remaining);
            let split_out = current - keep;
            remaining -= current;

            let reagent_id = if keep.is_positive() {
                self.contents[i].quantity = keep;
                self.contents[i].reagent_id.clone()
            } else {
                self.contents.remove(i).reagent_id
            };

            if split_out.is_positive() {
                extract.total_volume += split_out;
                extract.contents.push(ReagentQuantity {
                    reagent_id,
                    quantity: split_out,
                });
            }
            owed -= split_out;
        }

        self.total_volume -= extract.total_volume;
        tracing::trace!(
            requested = %quantity,
            extracted = %extract.total_volume,
            remaining = %self.total_volume,
            "split solution"
        );

        self.check_invariants();
        extract.check_invariants();
        extract
    }

    /// Merge `other` into this solution, conserving the thermal energy of both.
    ///
    /// Like [`Solution::add_reagent`], stops at [`FixedPoint2::MAX`]; only the
    /// merged part contributes energy.
    pub fn add_solution<L: ReagentLookup + ?Sized>(&mut self, lookup: &L, other: &Solution) {
        let old_energy = self.thermal_energy(lookup);
        let mut added_heat_capacity = 0.0;
        let mut added = FixedPoint2::ZERO;

        for entry in &other.contents {
            let quantity = self.clamp_to_capacity(&entry.reagent_id, entry.quantity);
            if !quantity.is_positive() {
                break;
            }
            match self.position(&entry.reagent_id) {
                Some(i) => self.contents[i].quantity += quantity,
                None => self
                    .contents
                    .push(ReagentQuantity::new(entry.reagent_id.clone(), quantity)),
            }
            self.total_volume += quantity;
            added += quantity;
            added_heat_capacity += quantity.to_f32() * lookup.specific_heat(&entry.reagent_id);
        }
        self.set_thermal_energy(lookup, old_energy + other.temperature * added_heat_capacity);
        tracing::trace!(
            added = %added,
            total = %self.total_volume,
            temperature = self.temperature,
            "merged solution"
        );
        self.check_invariants();
    }

    /// Blended substance color.
    ///
    /// Walks the contents in order keeping a running total of every entry's
    /// quantity. The first reagent with a known color seeds the mix; each later
    /// one pulls the mix toward its own color by `quantity / running_total`.
    /// Reagents without a known color still count toward the running total.
    pub fn color<L: ReagentLookup + ?Sized>(&self, lookup: &L) -> Color {
        if self.total_volume.is_zero() {
            return Color::TRANSPARENT;
        }

        let mut mix: Option<Color> = None;
        let mut running_total = FixedPoint2::ZERO;
        for entry in &self.contents {
            running_total += entry.quantity;
            let Some(color) = lookup.substance_color(&entry.reagent_id) else {
                continue;
            };
            mix = Some(match mix {
                None => color,
                Some(current) => {
                    assert!(running_total.is_positive());
                    let t = entry.quantity.to_f32() / running_total.to_f32();
                    Color::interpolate_between(current, color, t)
                }
            });
        }
        mix.unwrap_or(Color::TRANSPARENT)
    }

    /// Run an external reaction hook once per reagent against `target`.
    ///
    /// The hook may mutate this solution; iteration follows the contents as
    /// they were before the first call.
    pub fn do_entity_reaction<T, H>(&mut self, hook: &mut H, target: &mut T, method: ReactionMethod)
    where
        T: ?Sized,
        H: ReactionHook<T> + ?Sized,
    {
        let snapshot = self.contents.clone();
        for entry in snapshot {
            hook.react(target, method, &entry.reagent_id, entry.quantity, self);
        }
    }

    /// The part of `quantity` that still fits under [`FixedPoint2::MAX`].
    fn clamp_to_capacity(&self, reagent_id: &str, quantity: FixedPoint2) -> FixedPoint2 {
        let room = FixedPoint2::MAX - self.total_volume;
        if quantity > room {
            tracing::warn!(reagent = %reagent_id, requested = %quantity, accepted = %room, "solution at capacity");
            room
        } else {
            quantity
        }
    }

    fn position(&self, reagent_id: &str) -> Option<usize> {
        self.contents.iter().position(|r| r.reagent_id == reagent_id)
    }

    fn check_invariants(&self) {
        debug_assert!(
            self.contents.iter().all(|r| r.quantity.is_positive()),
            "solution holds a non-positive entry: {self:?}"
        );
        debug_assert!(
            self.total_volume <= FixedPoint2::MAX,
            "total volume past capacity"
        );
        debug_assert_eq!(
            self.total_volume,
            self.contents.iter().map(|r| r.quantity).sum::<FixedPoint2>(),
            "cached total volume is stale"
        );
        debug_assert!(
            self.contents
                .iter()
                .enumerate()
                .all(|(i, r)| self.contents[..i].iter().all(|p| p.reagent_id != r.reagent_id)),
            "solution holds a duplicate reagent: {self:?}"
        );
    }
}

impl<'a> IntoIterator for &'a Solution {
    type Item = &'a ReagentQuantity;
    type IntoIter = std::slice::Iter<'a, ReagentQuantity>;

    fn into_iter(self) -> Self::IntoIter {
        self.contents.iter()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, entry) in self.contents.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{entry}")?;
        }
        write!(f, "] total={} T={:.2}K", self.total_volume, self.temperature)
    }
}
