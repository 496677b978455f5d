//! Repository for the `syncQueue` partition.

use letras_core::outbox::OutboxEntry;
use uuid::Uuid;

use super::decode_all;
use crate::partition::Partition;
use crate::store::{KeyValueStore, RecordKey, StoreError};

/// Persistence for outbox entries.
pub struct OutboxRepo;

impl OutboxRepo {
    /// Insert a new entry. Entry ids are fresh UUIDs, so this never collides
    /// in practice.
    pub async fn insert(store: &dyn KeyValueStore, entry: &OutboxEntry) -> Result<(), StoreError> {
        store
            .add(Partition::SyncQueue, serde_json::to_value(entry)?)
            .await?;
        Ok(())
    }

    /// Overwrite an existing entry (retry counter updates).
    pub async fn update(store: &dyn KeyValueStore, entry: &OutboxEntry) -> Result<(), StoreError> {
        store
            .put(Partition::SyncQueue, serde_json::to_value(entry)?)
            .await?;
        Ok(())
    }

    /// All pending entries in insertion order.
    pub async fn list(store: &dyn KeyValueStore) -> Result<Vec<OutboxEntry>, StoreError> {
        let values = store.get_all(Partition::SyncQueue, None).await?;
        Ok(decode_all(Partition::SyncQueue, values))
    }

    pub async fn count(store: &dyn KeyValueStore) -> Result<usize, StoreError> {
        Ok(store.get_all(Partition::SyncQueue, None).await?.len())
    }

    pub async fn delete(store: &dyn KeyValueStore, id: Uuid) -> Result<(), StoreError> {
        store
            .delete(Partition::SyncQueue, &RecordKey::from(id))
            .await
    }
}
