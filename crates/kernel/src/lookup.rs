use chemix_common::Color;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Static per-reagent data the mixture needs for thermal and color math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReagentProperties {
    /// Heat capacity per unit of quantity.
    pub specific_heat: f32,
    pub substance_color: Color,
}

impl ReagentProperties {
    /// Stand-in for reagents the catalog does not know: no heat, no color.
    pub const PLACEHOLDER: Self = Self {
        specific_heat: 0.0,
        substance_color: Color::TRANSPARENT,
    };

    pub fn new(specific_heat: f32, substance_color: Color) -> Self {
        Self {
            specific_heat,
            substance_color,
        }
    }
}

impl Default for ReagentProperties {
    fn default() -> Self {
        Self::PLACEHOLDER
    }
}

/// Read-only catalog access used by the mixture engine.
///
/// Implementors only answer `properties`; the provided methods apply the
/// placeholder policy so a missing entry never makes a solution unusable.
pub trait ReagentLookup {
    fn properties(&self, reagent_id: &str) -> Option<ReagentProperties>;

    /// Specific heat of a reagent, `0.0` when unknown.
    fn specific_heat(&self, reagent_id: &str) -> f32 {
        self.properties(reagent_id)
            .map_or(ReagentProperties::PLACEHOLDER.specific_heat, |p| {
                p.specific_heat
            })
    }

    /// Substance color, `None` when the reagent is unknown.
    fn substance_color(&self, reagent_id: &str) -> Option<Color> {
        self.properties(reagent_id).map(|p| p.substance_color)
    }
}

impl<L: ReagentLookup + ?Sized> ReagentLookup for &L {
    fn properties(&self, reagent_id: &str) -> Option<ReagentProperties> {
        (**self).properties(reagent_id)
    }
}

impl ReagentLookup for BTreeMap<String, ReagentProperties> {
    fn properties(&self, reagent_id: &str) -> Option<ReagentProperties> {
        self.get(reagent_id).copied()
    }
}

impl ReagentLookup for HashMap<String, ReagentProperties> {
    fn properties(&self, reagent_id: &str) -> Option<ReagentProperties> {
        self.get(reagent_id).copied()
    }
}

/// A lookup that knows no reagents. Every reagent gets the placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReagents;

impl ReagentLookup for NoReagents {
    fn properties(&self, _reagent_id: &str) -> Option<ReagentProperties> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reagent_gets_placeholder() {
        assert_eq!(NoReagents.specific_heat("water"), 0.0);
        assert!(NoReagents.substance_color("water").is_none());
    }

    #[test]
    fn map_lookup() {
        let mut map = BTreeMap::new();
        map.insert(
            "water".to_string(),
            ReagentProperties::new(4.18, Color::rgb(0.0, 0.0, 1.0)),
        );
        assert_eq!(map.specific_heat("water"), 4.18);
        assert_eq!(
            map.substance_color("water"),
            Some(Color::rgb(0.0, 0.0, 1.0))
        );
        assert_eq!(map.specific_heat("iron"), 0.0);

        let by_ref = &map;
        assert_eq!(by_ref.specific_heat("water"), 4.18);
    }
}
