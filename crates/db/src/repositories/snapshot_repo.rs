//! Timestamped snapshots of remote-owned data (`childProfiles`,
//! `parentCache`).
//!
//! A snapshot record stores the payload under `data`, the moment it was
//! taken under `cached_at`, and the key under the partition's key path.

use letras_core::types::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::partition::Partition;
use crate::store::{KeyValueStore, RecordKey, StoreError};

/// A decoded snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub data: T,
    pub cached_at: Timestamp,
}

#[derive(Deserialize)]
struct StoredSnapshot<T> {
    data: T,
    cached_at: Timestamp,
}

/// Upsert/lookup of snapshots, at most one per key.
pub struct SnapshotRepo;

impl SnapshotRepo {
    pub async fn put<T: Serialize>(
        store: &dyn KeyValueStore,
        partition: Partition,
        key: &RecordKey,
        data: &T,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut record = Map::new();
        record.insert(partition.key_path().to_string(), key.to_json());
        record.insert("data".to_string(), serde_json::to_value(data)?);
        record.insert("cached_at".to_string(), serde_json::to_value(now)?);
        store.put(partition, Value::Object(record)).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(
        store: &dyn KeyValueStore,
        partition: Partition,
        key: &RecordKey,
    ) -> Result<Option<Snapshot<T>>, StoreError> {
        let Some(value) = store.get(partition, key).await? else {
            return Ok(None);
        };
        let stored: StoredSnapshot<T> = serde_json::from_value(value)?;
        Ok(Some(Snapshot {
            data: stored.data,
            cached_at: stored.cached_at,
        }))
    }
}
