//! Repository for the `childProgress` partition.

use letras_core::progress::ProgressRecord;
use letras_core::types::{DbId, Timestamp};

use super::decode_all;
use crate::partition::{Partition, INDEX_CHILD_ID, INDEX_SYNCED};
use crate::store::{IndexQuery, KeyValueStore, RecordKey, StoreError};

/// Append-only history of game sessions.
pub struct ProgressRepo;

impl ProgressRepo {
    /// Append a new record, returning its auto-assigned local id.
    pub async fn append(
        store: &dyn KeyValueStore,
        record: &ProgressRecord,
    ) -> Result<DbId, StoreError> {
        let mut value = serde_json::to_value(record)?;
        // History entries always get a fresh key.
        if let Some(obj) = value.as_object_mut() {
            obj.remove("id");
        }
        let key = store.add(Partition::ChildProgress, value).await?;
        key.as_int().ok_or_else(|| StoreError::InvalidRecord {
            partition: Partition::ChildProgress.name(),
            reason: format!("expected integer key, got '{key}'"),
        })
    }

    pub async fn find(
        store: &dyn KeyValueStore,
        id: DbId,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        let value = store
            .get(Partition::ChildProgress, &RecordKey::Int(id))
            .await?;
        value
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .transpose()
    }

    /// All sessions for one child, oldest first.
    pub async fn list_for_child(
        store: &dyn KeyValueStore,
        child_id: DbId,
    ) -> Result<Vec<ProgressRecord>, StoreError> {
        let query = IndexQuery::int(INDEX_CHILD_ID, child_id);
        let values = store
            .get_all(Partition::ChildProgress, Some(&query))
            .await?;
        Ok(decode_all(Partition::ChildProgress, values))
    }

    /// Sessions not yet accepted by the remote API.
    pub async fn list_unsynced(
        store: &dyn KeyValueStore,
    ) -> Result<Vec<ProgressRecord>, StoreError> {
        let query = IndexQuery::bool(INDEX_SYNCED, false);
        let values = store
            .get_all(Partition::ChildProgress, Some(&query))
            .await?;
        Ok(decode_all(Partition::ChildProgress, values))
    }

    /// Flip a record to synced. Returns `false` if the record does not exist.
    pub async fn mark_synced(
        store: &dyn KeyValueStore,
        id: DbId,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let Some(mut record) = Self::find(store, id).await? else {
            return Ok(false);
        };
        if record.synced {
            return Ok(true);
        }
        record.mark_synced(now);
        store
            .put(Partition::ChildProgress, serde_json::to_value(&record)?)
            .await?;
        Ok(true)
    }
}
