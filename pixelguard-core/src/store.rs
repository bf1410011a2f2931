//! Watermark records and the record store capability.
//!
//! The engine never persists anything itself. Callers that create watermarks
//! save a [`WatermarkRecord`] through a [`RecordStore`], and verification
//! consults the same store to attribute an extracted identifier.

use std::path::Path;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::debug;
use uuid::Uuid;

use crate::error::{PixelGuardError, Result};

/// Shortest hash prefix accepted by [`RecordStore::find_by_owner_and_hash`].
pub const MIN_HASH_PREFIX_LEN: usize = 16;

/// Lowercase hex SHA3-256 of encoded image bytes.
pub fn image_hash(bytes: &[u8]) -> String {
    hex::encode(Sha3_256::digest(bytes))
}

/// Stored metadata for one embedded watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkRecord {
    pub watermark_id: String,
    pub owner_id: String,
    /// Hash of the encoded watermarked image.
    pub image_hash: String,
    pub strength: u8,
    pub bit_length: usize,
    pub created_at: DateTime<Utc>,
}

impl WatermarkRecord {
    /// Create a record with a fresh UUID v4 id, timestamped now.
    pub fn new(
        owner_id: impl Into<String>,
        image_hash: impl Into<String>,
        strength: u8,
        bit_length: usize,
    ) -> Self {
        Self {
            watermark_id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            image_hash: image_hash.into(),
            strength,
            bit_length,
            created_at: Utc::now(),
        }
    }

    /// Whether `query` is this record's hash or a long-enough prefix of it.
    pub fn hash_matches(&self, query: &str) -> bool {
        query.len() >= MIN_HASH_PREFIX_LEN
            && self.image_hash.starts_with(&query.to_ascii_lowercase())
    }
}

/// Lookup and persistence of watermark records.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait RecordStore: Send + Sync {
    fn save(&self, record: WatermarkRecord) -> Result<()>;

    /// Find the record for `owner_id` whose image hash matches `image_hash`.
    fn find_by_owner_and_hash(&self, owner_id: &str, image_hash: &str) -> Option<WatermarkRecord>;

    fn find_by_watermark_id(&self, watermark_id: &str) -> Option<WatermarkRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Concurrent in-memory store keyed by watermark id.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<String, WatermarkRecord>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records from a JSON array file. A missing file yields an empty store.
    pub fn load_json(path: &Path) -> Result<Self> {
        let store = Self::new();
        if !path.exists() {
            debug!(path = %path.display(), "Record file absent, starting empty");
            return Ok(store);
        }

        let bytes = std::fs::read(path).map_err(|e| {
            PixelGuardError::Store(format!("Failed to read {}: {e}", path.display()))
        })?;
        let records: Vec<WatermarkRecord> = serde_json::from_slice(&bytes)
            .map_err(|e| PixelGuardError::Serialization(format!("Invalid record file: {e}")))?;

        for record in records {
            store.records.insert(record.watermark_id.clone(), record);
        }
        debug!(path = %path.display(), records = store.records.len(), "Loaded records");
        Ok(store)
    }

    /// Write all records as a JSON array, oldest first.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let mut records: Vec<WatermarkRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let json = serde_json::to_vec_pretty(&records)
            .map_err(|e| PixelGuardError::Serialization(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| {
            PixelGuardError::Store(format!("Failed to write {}: {e}", path.display()))
        })
    }
}

impl RecordStore for InMemoryRecordStore {
    fn save(&self, record: WatermarkRecord) -> Result<()> {
        if record.watermark_id.is_empty() {
            return Err(PixelGuardError::Store("watermark_id must not be empty".into()));
        }
        self.records.insert(record.watermark_id.clone(), record);
        Ok(())
    }

    fn find_by_owner_and_hash(&self, owner_id: &str, image_hash: &str) -> Option<WatermarkRecord> {
        self.records
            .iter()
            .filter(|entry| entry.owner_id == owner_id && entry.hash_matches(image_hash))
            .map(|entry| entry.value().clone())
            .max_by(|a, b| a.created_at.cmp(&b.created_at))
    }

    fn find_by_watermark_id(&self, watermark_id: &str) -> Option<WatermarkRecord> {
        self.records.get(watermark_id).map(|entry| entry.value().clone())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_hash_is_hex_sha3() {
        let hash = image_hash(b"");
        assert_eq!(
            hash,
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_save_and_find_by_id() {
        let store = InMemoryRecordStore::new();
        let record = WatermarkRecord::new("alice", image_hash(b"img"), 5, 440);
        let id = record.watermark_id.clone();
        store.save(record.clone()).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_watermark_id(&id), Some(record));
        assert!(store.find_by_watermark_id("missing").is_none());
    }

    #[test]
    fn test_find_by_owner_and_full_hash() {
        let store = InMemoryRecordStore::new();
        let hash = image_hash(b"img");
        store
            .save(WatermarkRecord::new("alice", hash.clone(), 5, 440))
            .unwrap();

        assert!(store.find_by_owner_and_hash("alice", &hash).is_some());
        assert!(store.find_by_owner_and_hash("bob", &hash).is_none());
        assert!(store
            .find_by_owner_and_hash("alice", &image_hash(b"other"))
            .is_none());
    }

    #[test]
    fn test_hash_prefix_matching() {
        let record = WatermarkRecord::new("alice", image_hash(b"img"), 5, 440);
        assert!(record.hash_matches(&record.image_hash[..16]));
        assert!(record.hash_matches(&record.image_hash.to_uppercase()));
        assert!(!record.hash_matches(&record.image_hash[..15]));
        assert!(!record.hash_matches(""));
    }

    #[test]
    fn test_save_rejects_empty_id() {
        let store = InMemoryRecordStore::new();
        let mut record = WatermarkRecord::new("alice", "00", 1, 8);
        record.watermark_id.clear();
        assert!(matches!(store.save(record), Err(PixelGuardError::Store(_))));
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");

        let store = InMemoryRecordStore::new();
        let record = WatermarkRecord::new("alice", image_hash(b"img"), 3, 264);
        store.save(record.clone()).unwrap();
        store.save_json(&path).unwrap();

        let loaded = InMemoryRecordStore::load_json(&path).unwrap();
        assert_eq!(loaded.find_by_watermark_id(&record.watermark_id), Some(record));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryRecordStore::load_json(&dir.path().join("none.json")).unwrap();
        assert!(store.is_empty());
    }
}
