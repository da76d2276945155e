//! Time-evicting place record cache with compressed persistence
//!
//! The store owns the id -> record mapping exclusively; callers only ever see
//! cloned records. Persistence serializes the surviving map to JSON and packs
//! it through the 15-bit codec variant so the slot stays compact. A corrupt
//! or foreign blob never propagates an error: the store falls back to empty
//! and logs the condition, a cold cache being the accepted worst case.

pub mod persistence;
pub mod sweeper;

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec;
use crate::errors::CacheError;
use crate::models::PlaceRecord;

pub use persistence::{FileSlot, MemorySlot, StorageSlot};
pub use sweeper::{shutdown_channel, CacheMaintenance};

/// Legacy coordinate key some old blobs still carry.
const LEGACY_LOCATION_KEY: &str = "location";
/// Current coordinate key.
const LOCATION_KEY: &str = "loc";

/// Mapping from place id to cached record.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStore {
    records: HashMap<String, PlaceRecord>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record without any eviction side effects.
    pub fn get(&self, id: &str) -> Option<PlaceRecord> {
        self.records.get(id).cloned()
    }

    /// Insert or overwrite a record, stamping it with the current time.
    ///
    /// Returns the record as stored, so callers can hand the stamped copy to
    /// whoever is waiting on it.
    pub fn put(&mut self, id: &str, record: PlaceRecord) -> PlaceRecord {
        self.put_at(id, record, Utc::now())
    }

    /// Insert or overwrite a record with an explicit timestamp.
    pub fn put_at(
        &mut self,
        id: &str,
        mut record: PlaceRecord,
        fetched_at: DateTime<Utc>,
    ) -> PlaceRecord {
        record.fetched_at = Some(fetched_at);
        self.records.insert(id.to_string(), record.clone());
        record
    }

    /// Remove every record older than `ttl` at time `now`, or never stamped.
    ///
    /// Returns the number of evicted records. Running it again with no
    /// intervening writes removes nothing further.
    pub fn sweep(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now, ttl));
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// JSON-encode the mapping and pack it through the codec.
    pub fn serialize(&self) -> Result<String, CacheError> {
        let json = serde_json::to_string(&self.records)?;
        Ok(codec::compress_to_utf16(&json))
    }

    /// Rebuild a store from a persisted blob.
    ///
    /// Any failure (corrupt symbols, foreign data, unexpected shape) is
    /// logged and answered with an empty store; persistence corruption is
    /// never fatal.
    pub fn deserialize(blob: &str) -> Self {
        match Self::try_deserialize(blob) {
            Ok(store) => store,
            Err(e) => {
                warn!("Stored cache could not be read, starting empty: {}", e);
                Self::new()
            }
        }
    }

    fn try_deserialize(blob: &str) -> Result<Self, CacheError> {
        let json = codec::decompress_from_utf16(blob)?;
        let mut tree: Value = serde_json::from_str(&json)?;
        migrate_legacy_fields(&mut tree);
        let records: HashMap<String, PlaceRecord> = serde_json::from_value(tree)?;
        debug!("Restored {} cached place records", records.len());
        Ok(Self { records })
    }

    /// Restore from a storage slot, treating an unreadable slot or blob as an
    /// empty cache.
    pub fn load_from(slot: &dyn StorageSlot) -> Self {
        match slot.load() {
            Ok(Some(blob)) => Self::deserialize(&blob),
            Ok(None) => Self::new(),
            Err(e) => {
                warn!("Cache slot could not be read, starting empty: {}", e);
                Self::new()
            }
        }
    }
}

/// Rename the legacy per-record `location` key to `loc` in place.
///
/// Only renames, never drops data; records already using the current key are
/// left untouched.
fn migrate_legacy_fields(tree: &mut Value) {
    let Value::Object(records) = tree else {
        return;
    };
    for record in records.values_mut() {
        if let Value::Object(fields) = record {
            if let Some(location) = fields.remove(LEGACY_LOCATION_KEY) {
                fields.insert(LOCATION_KEY.to_string(), location);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    fn sample_record() -> PlaceRecord {
        PlaceRecord::found(Coordinate { lat: 1.0, lng: 2.0 }, false)
    }

    #[test]
    fn put_stamps_timestamp() {
        let mut store = CacheStore::new();
        let stored = store.put("P1", sample_record());
        assert!(stored.fetched_at.is_some());
        assert_eq!(store.get("P1").unwrap(), stored);
    }

    #[test]
    fn sweep_respects_ttl_boundary() {
        let ttl = Duration::hours(6);
        let now = Utc::now();
        let mut store = CacheStore::new();
        store.put_at("expired", sample_record(), now - ttl - Duration::seconds(1));
        store.put_at("fresh", sample_record(), now - ttl + Duration::seconds(1));

        assert_eq!(store.sweep(now, ttl), 1);
        assert!(store.get("expired").is_none());
        assert!(store.get("fresh").is_some());
    }

    #[test]
    fn sweep_evicts_unstamped_records() {
        let mut store = CacheStore::new();
        store
            .records
            .insert("no-ts".to_string(), PlaceRecord::not_found());
        assert_eq!(store.sweep(Utc::now(), Duration::hours(6)), 1);
    }

    #[test]
    fn sweep_is_idempotent() {
        let ttl = Duration::minutes(10);
        let now = Utc::now();
        let mut store = CacheStore::new();
        store.put_at("old", sample_record(), now - Duration::hours(1));
        store.put("new", sample_record());

        assert_eq!(store.sweep(now, ttl), 1);
        assert_eq!(store.sweep(now, ttl), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn serialize_round_trip() {
        let mut store = CacheStore::new();
        store.put("P1", sample_record());
        store.put("P2", PlaceRecord::not_found());

        let blob = store.serialize().unwrap();
        let restored = CacheStore::deserialize(&blob);
        assert_eq!(restored, store);
    }

    #[test]
    fn empty_store_round_trip() {
        let blob = CacheStore::new().serialize().unwrap();
        assert!(CacheStore::deserialize(&blob).is_empty());
    }

    #[test]
    fn corrupt_blob_falls_back_to_empty() {
        assert!(CacheStore::deserialize("\u{1}\u{2}garbage").is_empty());
    }

    #[test]
    fn foreign_blob_falls_back_to_empty() {
        // Valid compressed symbols, but not a JSON object of records.
        let blob = codec::compress_to_utf16("this is not json");
        assert!(CacheStore::deserialize(&blob).is_empty());
    }

    #[test]
    fn legacy_location_field_is_migrated() {
        let legacy = r#"{"P1":{"location":{"lat":3.5,"lng":-7.25},"ts":"2018-08-18T12:00:00Z"}}"#;
        let blob = codec::compress_to_utf16(legacy);

        let store = CacheStore::deserialize(&blob);
        let record = store.get("P1").unwrap();
        let loc = record.loc.unwrap();
        assert_eq!(loc.lat, 3.5);
        assert_eq!(loc.lng, -7.25);
        assert!(record.fetched_at.is_some());
    }

    #[test]
    fn load_from_empty_slot_starts_empty() {
        let slot = MemorySlot::new();
        assert!(CacheStore::load_from(&slot).is_empty());
    }
}
