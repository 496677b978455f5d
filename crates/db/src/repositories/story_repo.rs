//! Repository for the `stories` partition.

use std::time::Duration;

use letras_core::content::CachedStory;
use letras_core::types::Timestamp;

use super::decode_all;
use crate::partition::{Partition, INDEX_AGE_GROUP};
use crate::store::{IndexQuery, KeyValueStore, RecordKey, StoreError};

/// Stories cached for offline reading.
pub struct StoryRepo;

impl StoryRepo {
    pub async fn upsert(store: &dyn KeyValueStore, story: &CachedStory) -> Result<(), StoreError> {
        store
            .put(Partition::Stories, serde_json::to_value(story)?)
            .await?;
        Ok(())
    }

    /// Cached stories, optionally restricted to one age group.
    pub async fn list(
        store: &dyn KeyValueStore,
        age_group: Option<&str>,
    ) -> Result<Vec<CachedStory>, StoreError> {
        let query = age_group.map(|group| IndexQuery::text(INDEX_AGE_GROUP, group));
        let values = store.get_all(Partition::Stories, query.as_ref()).await?;
        Ok(decode_all(Partition::Stories, values))
    }

    /// Delete stories cached more than `retention` before `now`.
    ///
    /// Returns the number of stories removed.
    pub async fn delete_expired(
        store: &dyn KeyValueStore,
        now: Timestamp,
        retention: Duration,
    ) -> Result<usize, StoreError> {
        let mut deleted = 0;
        for story in Self::list(store, None).await? {
            if story.is_expired(now, retention) {
                store
                    .delete(Partition::Stories, &RecordKey::from(story.id.as_str()))
                    .await?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
