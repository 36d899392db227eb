//! File-backed solution persistence.
//!
//! Layout inside the store directory:
//! ```text
//! store.meta.json              - metadata and schema version
//! snapshots/
//!   000001.snapshot.cbor.zst   - CBOR+zstd compressed solution snapshots
//! integrity/
//!   manifest.json              - hash chain manifest
//! ```

use crate::snapshot::SolutionSnapshot;
use chemix_kernel::Solution;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Current schema version of the snapshot files.
const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Errors from file-backed persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("no snapshots found")]
    NoSnapshots,
    #[error("snapshot {0} not found")]
    SnapshotNotFound(u32),
}

/// Metadata stored in store.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub snapshot_schema_version: u32,
    pub snapshot_count: u32,
}

/// A single entry in the integrity manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub label: String,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

/// Integrity manifest tracking all snapshot hashes in a chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

/// File-backed store of solution snapshots with schema versioning and
/// integrity checking.
///
/// Snapshots are numbered from 1 in the order they were saved.
pub struct SolutionStore {
    root: PathBuf,
    meta: StoreMeta,
    manifest: IntegrityManifest,
}

impl SolutionStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("snapshots"))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join("store.meta.json");
        let manifest_path = root.join("integrity").join("manifest.json");

        let (meta, manifest) = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.snapshot_schema_version != SNAPSHOT_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.snapshot_schema_version,
                    expected_version: SNAPSHOT_SCHEMA_VERSION,
                });
            }
            let manifest: IntegrityManifest = if manifest_path.exists() {
                serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
            } else {
                IntegrityManifest::default()
            };
            (meta, manifest)
        } else {
            let meta = StoreMeta {
                snapshot_schema_version: SNAPSHOT_SCHEMA_VERSION,
                snapshot_count: 0,
            };
            let manifest = IntegrityManifest::default();
            serde_json::to_writer_pretty(std::fs::File::create(&meta_path)?, &meta)?;
            serde_json::to_writer_pretty(std::fs::File::create(&manifest_path)?, &manifest)?;
            tracing::debug!(root = %root.display(), "initialized solution store");
            (meta, manifest)
        };

        Ok(Self {
            root,
            meta,
            manifest,
        })
    }

    /// Capture a solution under `label` and write it. Returns the snapshot index.
    pub fn save(&mut self, label: &str, solution: &Solution) -> Result<u32, StoreError> {
        self.save_snapshot(&SolutionSnapshot::capture(label, solution))
    }

    /// Write a snapshot to disk. Returns its index.
    pub fn save_snapshot(&mut self, snapshot: &SolutionSnapshot) -> Result<u32, StoreError> {
        let _span = tracing::info_span!("save_snapshot", label = %snapshot.label).entered();

        let index = self.meta.snapshot_count + 1;
        let filename = snapshot_filename(index);
        let path = self.root.join("snapshots").join(&filename);

        let cbor_bytes = cbor_serialize(snapshot)?;
        let compressed = zstd_compress(&cbor_bytes)?;

        let hash = sha256_hex(&compressed);
        let prev_hash = self.manifest.entries.last().map(|e| e.sha256.clone());

        std::fs::write(&path, &compressed)?;

        self.meta.snapshot_count = index;
        self.manifest.entries.push(ManifestEntry {
            filename,
            label: snapshot.label.clone(),
            sha256: hash,
            prev_hash,
        });

        self.save_meta()?;
        self.save_manifest()?;
        tracing::debug!(index, bytes = compressed.len(), "snapshot written");
        Ok(index)
    }

    /// Load a snapshot by index, checking the manifest hash and the snapshot's
    /// own content hash.
    pub fn load_snapshot(&self, index: u32) -> Result<SolutionSnapshot, StoreError> {
        if index == 0 || index > self.meta.snapshot_count {
            return Err(StoreError::SnapshotNotFound(index));
        }
        let _span = tracing::info_span!("load_snapshot", index).entered();

        let filename = snapshot_filename(index);
        let path = self.root.join("snapshots").join(&filename);
        let compressed = std::fs::read(&path)?;

        self.verify_file_hash(&filename, &compressed)?;

        let cbor_bytes = zstd_decompress(&compressed)?;
        let snapshot: SolutionSnapshot = cbor_deserialize(&cbor_bytes)?;
        if !snapshot.verify() {
            tracing::warn!(index, "snapshot content hash mismatch");
            return Err(StoreError::IntegrityMismatch {
                expected: "valid snapshot hash".into(),
                actual: "snapshot hash mismatch".into(),
            });
        }
        Ok(snapshot)
    }

    /// Load the most recently saved snapshot.
    pub fn load_latest(&self) -> Result<SolutionSnapshot, StoreError> {
        if self.meta.snapshot_count == 0 {
            return Err(StoreError::NoSnapshots);
        }
        self.load_snapshot(self.meta.snapshot_count)
    }

    /// Verify all integrity hashes in the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        let mut prev_hash: Option<String> = None;
        for entry in &self.manifest.entries {
            // Check chain continuity
            if entry.prev_hash != prev_hash {
                return Err(StoreError::IntegrityMismatch {
                    expected: prev_hash.unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }

            let data = std::fs::read(self.root.join("snapshots").join(&entry.filename))?;
            let actual_hash = sha256_hex(&data);
            if actual_hash != entry.sha256 {
                return Err(StoreError::IntegrityMismatch {
                    expected: entry.sha256.clone(),
                    actual: actual_hash,
                });
            }

            prev_hash = Some(entry.sha256.clone());
        }
        Ok(())
    }

    /// Get the path to the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    pub fn manifest(&self) -> &IntegrityManifest {
        &self.manifest
    }

    fn verify_file_hash(&self, filename: &str, data: &[u8]) -> Result<(), StoreError> {
        let actual = sha256_hex(data);
        match self.manifest.entries.iter().find(|e| e.filename == filename) {
            Some(entry) if entry.sha256 != actual => Err(StoreError::IntegrityMismatch {
                expected: entry.sha256.clone(),
                actual,
            }),
            Some(_) => Ok(()),
            // A snapshot missing from the manifest cannot be trusted.
            None => Err(StoreError::IntegrityMismatch {
                expected: format!("manifest entry for {filename}"),
                actual: "none".into(),
            }),
        }
    }

    fn save_meta(&self) -> Result<(), StoreError> {
        let path = self.root.join("store.meta.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

fn snapshot_filename(index: u32) -> String {
    format!("{index:06}.snapshot.cbor.zst")
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chemix_common::FixedPoint2;
    use chemix_kernel::NoReagents;

    fn sample() -> Solution {
        let mut s = Solution::new();
        s.add_reagent(&NoReagents, "water", FixedPoint2::from_int(10), None);
        s.add_reagent(&NoReagents, "iron", FixedPoint2::from_int(5), None);
        s.set_temperature(310.0);
        s
    }

    #[test]
    fn open_creates_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SolutionStore::open(tmp.path().join("store")).unwrap();
        assert_eq!(store.meta().snapshot_count, 0);
        assert_eq!(store.meta().snapshot_schema_version, SNAPSHOT_SCHEMA_VERSION);
        assert!(store.root().join("snapshots").is_dir());
        assert!(store.root().join("integrity").is_dir());
    }

    #[test]
    fn save_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store");
        let mut store = SolutionStore::open(&path).unwrap();

        let mut s = sample();
        assert_eq!(store.save("beaker", &s).unwrap(), 1);
        let extract = s.split_solution(FixedPoint2::from_int(6));
        assert_eq!(store.save("syringe", &extract).unwrap(), 2);

        let store2 = SolutionStore::open(&path).unwrap();
        assert_eq!(store2.meta().snapshot_count, 2);

        let first = store2.load_snapshot(1).unwrap();
        assert_eq!(first.label, "beaker");
        assert_eq!(first.restore(), sample());
        assert_eq!(first.solution.total_volume(), FixedPoint2::from_int(15));

        let latest = store2.load_latest().unwrap();
        assert_eq!(latest.label, "syringe");
        assert_eq!(latest.solution, extract);
        assert_eq!(latest.solution.temperature(), 310.0);
    }

    #[test]
    fn empty_store_has_no_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SolutionStore::open(tmp.path()).unwrap();
        assert!(matches!(store.load_latest(), Err(StoreError::NoSnapshots)));
        assert!(matches!(
            store.load_snapshot(1),
            Err(StoreError::SnapshotNotFound(1))
        ));
    }

    #[test]
    fn integrity_verification_passes_for_untouched_store() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = SolutionStore::open(tmp.path()).unwrap();
        store.save("a", &sample()).unwrap();
        store.save("b", &Solution::new()).unwrap();
        store.verify_integrity().unwrap();
        assert_eq!(store.manifest().entries.len(), 2);
        assert_eq!(
            store.manifest().entries[1].prev_hash.as_deref(),
            Some(store.manifest().entries[0].sha256.as_str())
        );
    }

    #[test]
    fn corruption_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store");
        let mut store = SolutionStore::open(&path).unwrap();
        store.save("beaker", &sample()).unwrap();

        let snap_path = path.join("snapshots").join("000001.snapshot.cbor.zst");
        let mut data = std::fs::read(&snap_path).unwrap();
        if let Some(byte) = data.last_mut() {
            *byte ^= 0xff;
        }
        std::fs::write(&snap_path, &data).unwrap();

        let store2 = SolutionStore::open(&path).unwrap();
        assert!(store2.verify_integrity().is_err());
        assert!(matches!(
            store2.load_snapshot(1),
            Err(StoreError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn schema_mismatch_fail_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store");
        let _store = SolutionStore::open(&path).unwrap();

        let meta_path = path.join("store.meta.json");
        let mut meta: StoreMeta =
            serde_json::from_reader(std::fs::File::open(&meta_path).unwrap()).unwrap();
        meta.snapshot_schema_version = 999;
        serde_json::to_writer_pretty(std::fs::File::create(&meta_path).unwrap(), &meta).unwrap();

        match SolutionStore::open(&path) {
            Err(StoreError::SchemaMismatch {
                file_version,
                expected_version,
            }) => {
                assert_eq!(file_version, 999);
                assert_eq!(expected_version, SNAPSHOT_SCHEMA_VERSION);
            }
            Err(e) => panic!("expected SchemaMismatch, got: {e}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }
}
