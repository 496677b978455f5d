//! Cache-aside reads: remote first, local snapshot as fallback.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use letras_core::clock::Clock;
use letras_core::connectivity::ConnectivityProbe;
use letras_core::envelope::CacheEnvelope;
use letras_core::policy::{CHILDREN_CACHE_KEY, PARENT_CACHE_FRESHNESS, PROFILE_FRESHNESS};
use letras_core::types::DbId;
use letras_db::repositories::SnapshotRepo;
use letras_db::{KeyValueStore, Partition, RecordKey};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::remote::RemoteError;

/// Where a cached read lives and how long it stays fresh.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSlot {
    pub partition: Partition,
    pub key: RecordKey,
    pub freshness: Duration,
}

impl CacheSlot {
    pub fn child_profile(child_id: DbId) -> Self {
        Self {
            partition: Partition::ChildProfiles,
            key: RecordKey::Int(child_id),
            freshness: PROFILE_FRESHNESS,
        }
    }

    /// The signed-in parent's children list.
    pub fn children() -> Self {
        Self {
            partition: Partition::ParentCache,
            key: RecordKey::from(CHILDREN_CACHE_KEY),
            freshness: PARENT_CACHE_FRESHNESS,
        }
    }
}

/// Reads that prefer the remote API and fall back to local snapshots.
#[derive(Clone)]
pub struct CacheAsideReader {
    store: Arc<dyn KeyValueStore>,
    connectivity: Arc<dyn ConnectivityProbe>,
    clock: Arc<dyn Clock>,
}

impl CacheAsideReader {
    pub fn new(ctx: &SyncContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            connectivity: Arc::clone(&ctx.connectivity),
            clock: Arc::clone(&ctx.clock),
        }
    }

    /// Read `slot`, fetching from the remote API when online.
    ///
    /// A successful fetch refreshes the snapshot and is returned as fresh.
    /// Otherwise the snapshot is returned tagged with its staleness, or
    /// [`SyncError::NoDataAvailable`] when there is none.
    pub async fn read<T, F, Fut>(&self, slot: &CacheSlot, fetch: F) -> Result<CacheEnvelope<T>, SyncError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        if self.connectivity.is_online() {
            match fetch().await {
                Ok(data) => {
                    self.remember(slot, &data).await;
                    return Ok(CacheEnvelope::fresh(data));
                }
                Err(e) => {
                    tracing::debug!(
                        partition = %slot.partition,
                        key = %slot.key,
                        error = %e,
                        "Remote fetch failed, falling back to local snapshot"
                    );
                }
            }
        }

        self.fallback(slot).await
    }

    async fn remember<T: Serialize>(&self, slot: &CacheSlot, data: &T) {
        let now = self.clock.now();
        if let Err(e) =
            SnapshotRepo::put(self.store.as_ref(), slot.partition, &slot.key, data, now).await
        {
            tracing::warn!(
                partition = %slot.partition,
                key = %slot.key,
                error = %e,
                "Failed to refresh local snapshot"
            );
        }
    }

    async fn fallback<T: DeserializeOwned>(&self, slot: &CacheSlot) -> Result<CacheEnvelope<T>, SyncError> {
        let snapshot = match SnapshotRepo::get::<T>(self.store.as_ref(), slot.partition, &slot.key).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    partition = %slot.partition,
                    key = %slot.key,
                    error = %e,
                    "Local snapshot unreadable"
                );
                None
            }
        };

        let snapshot = snapshot.ok_or(SyncError::NoDataAvailable)?;
        Ok(CacheEnvelope::cached(
            snapshot.data,
            snapshot.cached_at,
            self.clock.now(),
            slot.freshness,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeRemote, Harness};
    use assert_matches::assert_matches;
    use letras_core::profile::ProfileSnapshot;

    fn lucia() -> ProfileSnapshot {
        ProfileSnapshot {
            child_id: 5,
            name: "Lucía".into(),
            surname: None,
            birth_date: None,
        }
    }

    async fn fetch_ok() -> Result<ProfileSnapshot, RemoteError> {
        Ok(lucia())
    }

    async fn fetch_err() -> Result<ProfileSnapshot, RemoteError> {
        Err(RemoteError::HttpStatus(500))
    }

    #[tokio::test]
    async fn fresh_fetch_refreshes_snapshot() {
        let h = Harness::new(FakeRemote::accepting());
        let reader = CacheAsideReader::new(&h.ctx);
        let slot = CacheSlot::child_profile(5);

        let envelope = reader.read(&slot, fetch_ok).await.unwrap();
        assert!(!envelope.from_cache);
        assert!(!envelope.is_stale);
        assert_eq!(envelope.data, lucia());

        let snap = SnapshotRepo::get::<ProfileSnapshot>(h.store.as_ref(), slot.partition, &slot.key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap.data, lucia());
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_snapshot() {
        let h = Harness::new(FakeRemote::accepting());
        let reader = CacheAsideReader::new(&h.ctx);
        let slot = CacheSlot::child_profile(5);
        reader.read(&slot, fetch_ok).await.unwrap();

        let envelope = reader.read(&slot, fetch_err).await.unwrap();
        assert!(envelope.from_cache);
        assert!(!envelope.is_stale);
        assert_eq!(envelope.cached_at, Some(crate::test_support::t0()));
    }

    #[tokio::test]
    async fn offline_skips_fetch() {
        let h = Harness::new(FakeRemote::accepting());
        let reader = CacheAsideReader::new(&h.ctx);
        let slot = CacheSlot::child_profile(5);
        reader.read(&slot, fetch_ok).await.unwrap();
        h.connectivity.set_online(false);

        let mut fetched = false;
        let envelope = reader
            .read(&slot, || {
                fetched = true;
                fetch_ok()
            })
            .await
            .unwrap();

        assert!(!fetched);
        assert!(envelope.from_cache);
    }

    #[tokio::test]
    async fn no_snapshot_and_no_remote_is_no_data() {
        let h = Harness::new(FakeRemote::accepting());
        let reader = CacheAsideReader::new(&h.ctx);

        let result = reader.read(&CacheSlot::child_profile(9), fetch_err).await;
        assert_matches!(result, Err(SyncError::NoDataAvailable));
    }

    #[tokio::test]
    async fn staleness_flips_just_past_the_window() {
        let h = Harness::new(FakeRemote::accepting());
        let reader = CacheAsideReader::new(&h.ctx);
        let slot = CacheSlot::children();
        reader
            .read(&slot, || async { Ok::<_, RemoteError>(vec![1, 2]) })
            .await
            .unwrap();

        h.clock.advance(chrono::Duration::seconds(4 * 60 + 59));
        let at_4_59 = reader
            .read(&slot, || async { Err::<Vec<i32>, _>(RemoteError::HttpStatus(503)) })
            .await
            .unwrap();
        assert!(at_4_59.from_cache);
        assert!(!at_4_59.is_stale);

        h.clock.advance(chrono::Duration::seconds(2));
        let at_5_01 = reader
            .read(&slot, || async { Err::<Vec<i32>, _>(RemoteError::HttpStatus(503)) })
            .await
            .unwrap();
        assert!(at_5_01.from_cache);
        assert!(at_5_01.is_stale);
        assert_eq!(at_5_01.data, vec![1, 2]);
    }
}
