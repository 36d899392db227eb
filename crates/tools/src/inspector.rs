use chemix_common::types::kelvin_to_celsius;
use chemix_common::{Color, FixedPoint2};
use chemix_kernel::{ReagentLookup, Solution};

/// Solution inspector for developer tooling.
///
/// Provides read-only queries against a solution for debugging and CLI output.
pub struct SolutionInspector;

impl SolutionInspector {
    /// Produce a summary of the solution.
    pub fn summary<L: ReagentLookup + ?Sized>(solution: &Solution, lookup: &L) -> SolutionSummary {
        SolutionSummary {
            total_volume: solution.total_volume(),
            temperature: solution.temperature(),
            reagent_count: solution.len(),
            primary_reagent: solution.primary_reagent_id().map(str::to_string),
            heat_capacity: solution.heat_capacity(lookup),
            color: solution.color(lookup),
        }
    }

    /// Per-reagent breakdown, largest quantity first.
    pub fn breakdown<L: ReagentLookup + ?Sized>(solution: &Solution, lookup: &L) -> Vec<ReagentInfo> {
        let mut entries: Vec<_> = solution.iter().collect();
        // stable sort: equal quantities keep their stored order
        entries.sort_by(|a, b| b.cmp_by_quantity(a));

        let total = solution.total_volume().to_f64();
        entries
            .into_iter()
            .map(|entry| ReagentInfo {
                reagent_id: entry.reagent_id().to_string(),
                quantity: entry.quantity(),
                fraction: if total > 0.0 {
                    entry.quantity().to_f64() / total
                } else {
                    0.0
                },
                known: lookup.properties(entry.reagent_id()).is_some(),
            })
            .collect()
    }
}

/// Summary of a solution for the inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionSummary {
    pub total_volume: FixedPoint2,
    pub temperature: f32,
    pub reagent_count: usize,
    pub primary_reagent: Option<String>,
    pub heat_capacity: f32,
    pub color: Color,
}

impl std::fmt::Display for SolutionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Solution: volume={} reagents={} primary={} T={:.2}K ({:.1}C) heat_capacity={:.2} color={}",
            self.total_volume,
            self.reagent_count,
            self.primary_reagent.as_deref().unwrap_or("-"),
            self.temperature,
            kelvin_to_celsius(self.temperature),
            self.heat_capacity,
            self.color,
        )
    }
}

/// One line of a solution breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ReagentInfo {
    pub reagent_id: String,
    pub quantity: FixedPoint2,
    /// Share of the total volume in `[0, 1]`.
    pub fraction: f64,
    /// Whether the catalog has properties for this reagent.
    pub known: bool,
}

impl std::fmt::Display for ReagentInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<16} {:>10} {:>6.1}%{}",
            self.reagent_id,
            self.quantity,
            self.fraction * 100.0,
            if self.known { "" } else { "  (unknown reagent)" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemix_catalog::ReagentCatalog;

    fn sample(catalog: &ReagentCatalog) -> Solution {
        let mut s = Solution::new();
        s.add_reagent(catalog, "iron", FixedPoint2::from_int(5), None);
        s.add_reagent(catalog, "water", FixedPoint2::from_int(10), None);
        s.add_reagent(catalog, "mystery", FixedPoint2::from_int(5), None);
        s
    }

    #[test]
    fn summary_empty_solution() {
        let catalog = ReagentCatalog::with_defaults();
        let summary = SolutionInspector::summary(&Solution::new(), &catalog);
        assert_eq!(summary.total_volume, FixedPoint2::ZERO);
        assert_eq!(summary.reagent_count, 0);
        assert_eq!(summary.primary_reagent, None);
        assert_eq!(summary.color, Color::TRANSPARENT);
    }

    #[test]
    fn summary_with_reagents() {
        let catalog = ReagentCatalog::with_defaults();
        let summary = SolutionInspector::summary(&sample(&catalog), &catalog);
        assert_eq!(summary.total_volume, FixedPoint2::from_int(20));
        assert_eq!(summary.reagent_count, 3);
        assert_eq!(summary.primary_reagent.as_deref(), Some("water"));
        assert!((summary.heat_capacity - (5.0 * 0.45 + 10.0 * 4.18)).abs() < 1e-3);
    }

    #[test]
    fn breakdown_sorted_by_quantity() {
        let catalog = ReagentCatalog::with_defaults();
        let rows = SolutionInspector::breakdown(&sample(&catalog), &catalog);
        let ids: Vec<&str> = rows.iter().map(|r| r.reagent_id.as_str()).collect();
        assert_eq!(ids, ["water", "iron", "mystery"]);
        assert!((rows[0].fraction - 0.5).abs() < 1e-9);
        assert!(rows[1].known);
        assert!(!rows[2].known);
    }

    #[test]
    fn display_formats() {
        let catalog = ReagentCatalog::with_defaults();
        let s = sample(&catalog);
        let summary = format!("{}", SolutionInspector::summary(&s, &catalog));
        assert!(summary.contains("volume=20"));
        assert!(summary.contains("primary=water"));

        let rows = SolutionInspector::breakdown(&s, &catalog);
        assert!(rows[2].to_string().contains("unknown reagent"));
        assert!(rows[0].to_string().contains("50.0%"));
    }
}
