use chemix_kernel::Solution;
use serde::{Deserialize, Serialize};

/// A labelled, content-hashed copy of a solution.
///
/// The hash covers the label, every reagent id and raw quantity in order, and
/// the temperature bits, so any change to the stored contents is detected on
/// load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionSnapshot {
    /// Caller-chosen name, e.g. the container the solution came from.
    pub label: String,
    pub solution: Solution,
    /// FNV-1a over the canonical fields.
    pub hash: u64,
}

impl SolutionSnapshot {
    /// Snapshot the current state of a solution.
    pub fn capture(label: impl Into<String>, solution: &Solution) -> Self {
        let label = label.into();
        let hash = content_hash(&label, solution);
        Self {
            label,
            solution: solution.clone(),
            hash,
        }
    }

    /// Recompute the hash and compare.
    pub fn verify(&self) -> bool {
        self.hash == content_hash(&self.label, &self.solution)
    }

    /// An independent copy of the stored solution.
    pub fn restore(&self) -> Solution {
        self.solution.clone()
    }
}

fn content_hash(label: &str, solution: &Solution) -> u64 {
    let mut h = Fnv1a::new();
    h.write(label.as_bytes());
    h.write(&[0]);
    for entry in solution {
        h.write(entry.reagent_id().as_bytes());
        h.write(&[0]);
        h.write(&entry.quantity().raw().to_le_bytes());
    }
    h.write(&solution.temperature().to_bits().to_le_bytes());
    h.finish()
}

struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(0x0100_0000_01b3);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemix_common::FixedPoint2;
    use chemix_kernel::NoReagents;

    fn sample() -> Solution {
        let mut s = Solution::new();
        s.add_reagent(&NoReagents, "water", FixedPoint2::from_int(10), None);
        s.add_reagent(&NoReagents, "iron", FixedPoint2::new(2.5), None);
        s
    }

    #[test]
    fn capture_and_verify() {
        let snap = SolutionSnapshot::capture("beaker", &sample());
        assert!(snap.verify());
        assert_eq!(snap.label, "beaker");
    }

    #[test]
    fn tampering_is_detected() {
        let mut snap = SolutionSnapshot::capture("beaker", &sample());
        snap.solution.remove_reagent("iron", FixedPoint2::EPSILON);
        assert!(!snap.verify());

        let mut snap = SolutionSnapshot::capture("beaker", &sample());
        snap.label = "bucket".into();
        assert!(!snap.verify());

        let mut snap = SolutionSnapshot::capture("beaker", &sample());
        snap.solution.set_temperature(400.0);
        assert!(!snap.verify());
    }

    #[test]
    fn restore_is_independent() {
        let snap = SolutionSnapshot::capture("beaker", &sample());
        let mut restored = snap.restore();
        assert_eq!(restored, sample());
        restored.remove_all_solution();
        assert!(snap.verify());
        assert_eq!(snap.solution.total_volume(), FixedPoint2::new(12.5));
    }

    #[test]
    fn order_is_part_of_the_hash() {
        let mut reordered = Solution::new();
        reordered.add_reagent(&NoReagents, "iron", FixedPoint2::new(2.5), None);
        reordered.add_reagent(&NoReagents, "water", FixedPoint2::from_int(10), None);
        let a = SolutionSnapshot::capture("x", &sample());
        let b = SolutionSnapshot::capture("x", &reordered);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn json_roundtrip_recomputes_total() {
        let snap = SolutionSnapshot::capture("beaker", &sample());
        let json = serde_json::to_string(&snap).unwrap();
        let back: SolutionSnapshot = serde_json::from_str(&json).unwrap();
        assert!(back.verify());
        assert_eq!(back.solution.total_volume(), FixedPoint2::new(12.5));
    }
}
