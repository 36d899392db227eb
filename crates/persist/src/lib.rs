//! Persistence for solutions: snapshots and a file-backed store.
//!
//! # Invariants
//! - The stored form is ordered contents plus temperature; total volume is
//!   recomputed on every load.
//! - Snapshots carry a content hash and fail closed when it does not match.
//! - Store files are chained in a sha256 manifest.

pub mod snapshot;
pub mod store;

pub use snapshot::SolutionSnapshot;
pub use store::{IntegrityManifest, ManifestEntry, SolutionStore, StoreError, StoreMeta};

pub fn crate_info() -> &'static str {
    "chemix-persist v0.1.0"
}
