//! Repository for the `gameData` partition.

use letras_core::content::GameDataEntry;
use letras_core::types::Timestamp;

use crate::partition::Partition;
use crate::store::{KeyValueStore, RecordKey, StoreError};

/// Generic per-game saved state.
pub struct GameDataRepo;

impl GameDataRepo {
    pub async fn save(
        store: &dyn KeyValueStore,
        key: &str,
        value: serde_json::Value,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let entry = GameDataEntry {
            key: key.to_string(),
            value,
            updated_at: now,
        };
        store
            .put(Partition::GameData, serde_json::to_value(&entry)?)
            .await?;
        Ok(())
    }

    pub async fn find(
        store: &dyn KeyValueStore,
        key: &str,
    ) -> Result<Option<GameDataEntry>, StoreError> {
        store
            .get(Partition::GameData, &RecordKey::from(key))
            .await?
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .transpose()
    }
}
