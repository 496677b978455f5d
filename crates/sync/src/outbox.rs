//! Persistent queue of mutations awaiting delivery.
//!
//! Entries live in the `syncQueue` partition and are drained oldest first.
//! A delivery that fails [`MAX_DELIVERY_ATTEMPTS`] times is dropped.

use std::sync::Arc;

use letras_core::clock::Clock;
use letras_core::outbox::{OutboxEntry, OutboxRequest};
use letras_core::policy::MAX_DELIVERY_ATTEMPTS;
use letras_db::repositories::{OutboxRepo, ProgressRepo};
use letras_db::{KeyValueStore, StoreError};
use letras_events::{EventBus, SyncEvent};

use crate::remote::RemoteApi;

/// Result of one pass over the outbox.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    /// Entries accepted by the remote API and removed.
    pub delivered: usize,
    /// Entries that failed and stay queued with a higher retry counter.
    pub failed: usize,
    /// Entries removed undelivered after reaching the retry ceiling.
    pub dropped: Vec<OutboxEntry>,
}

impl DrainReport {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Handle over the `syncQueue` partition.
#[derive(Clone)]
pub struct Outbox {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl Outbox {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Queue a request for later delivery. Identical requests are not
    /// deduplicated.
    pub async fn enqueue(&self, request: OutboxRequest) -> Result<OutboxEntry, StoreError> {
        let entry = OutboxEntry::new(request, self.clock.now());
        OutboxRepo::insert(self.store.as_ref(), &entry).await?;
        tracing::debug!(
            entry_id = %entry.id,
            method = %entry.request.method,
            url = %entry.request.url,
            "Mutation queued"
        );
        Ok(entry)
    }

    /// Pending entries, oldest first.
    pub async fn entries(&self) -> Result<Vec<OutboxEntry>, StoreError> {
        OutboxRepo::list(self.store.as_ref()).await
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        OutboxRepo::count(self.store.as_ref()).await
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Attempt every pending entry once, in insertion order.
    ///
    /// Delivery failures never abort the pass. Store failures do, leaving
    /// the remaining entries untouched for the next pass. A dropped entry is
    /// announced on `events` as soon as it is deleted, so an abort later in
    /// the pass cannot hide it. Callers must serialize passes; see
    /// [`crate::reconciler::Reconciler`].
    pub(crate) async fn drain(
        &self,
        remote: &dyn RemoteApi,
        events: &EventBus,
    ) -> Result<DrainReport, StoreError> {
        let store = self.store.as_ref();
        let mut report = DrainReport::default();

        for mut entry in self.entries().await? {
            if entry.retries >= MAX_DELIVERY_ATTEMPTS {
                OutboxRepo::delete(store, entry.id).await?;
                self.announce_dropped(events, &entry);
                report.dropped.push(entry);
                continue;
            }

            match remote.send(&entry.request).await {
                Ok(()) => {
                    if let Some(progress_id) = entry.request.progress_id {
                        match ProgressRepo::mark_synced(store, progress_id, self.clock.now()).await
                        {
                            Ok(true) => {}
                            Ok(false) => tracing::debug!(
                                progress_id,
                                "Delivered progress no longer stored locally"
                            ),
                            // The remote already has it; the entry is removed
                            // anyway and the record stays unsynced locally.
                            Err(e) => tracing::warn!(
                                progress_id,
                                error = %e,
                                "Failed to mark delivered progress as synced"
                            ),
                        }
                    }
                    OutboxRepo::delete(store, entry.id).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    entry.retries += 1;
                    if entry.retries >= MAX_DELIVERY_ATTEMPTS {
                        tracing::warn!(
                            entry_id = %entry.id,
                            url = %entry.request.url,
                            retries = entry.retries,
                            error = %e,
                            "Delivery attempts exhausted, dropping queued mutation"
                        );
                        OutboxRepo::delete(store, entry.id).await?;
                        self.announce_dropped(events, &entry);
                        report.dropped.push(entry);
                    } else {
                        tracing::debug!(
                            entry_id = %entry.id,
                            retries = entry.retries,
                            error = %e,
                            "Delivery failed, will retry"
                        );
                        OutboxRepo::update(store, &entry).await?;
                        report.failed += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    fn announce_dropped(&self, events: &EventBus, entry: &OutboxEntry) {
        events.publish(SyncEvent::DeliveryExhausted {
            entry_id: entry.id,
            url: entry.request.url.clone(),
            method: entry.request.method,
            retries: entry.retries,
            at: self.clock.now(),
        });
    }
}
