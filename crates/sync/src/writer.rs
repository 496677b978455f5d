//! Write-behind persistence of game-session results.
//!
//! A result is stored locally before any network activity, then forwarded
//! directly when possible and queued in the outbox otherwise.

use std::sync::Arc;

use letras_core::clock::Clock;
use letras_core::connectivity::ConnectivityProbe;
use letras_core::outbox::{HttpMethod, OutboxRequest};
use letras_core::progress::{NewProgress, ProgressRecord};
use letras_core::types::DbId;
use letras_db::repositories::ProgressRepo;
use letras_db::KeyValueStore;
use letras_events::{EventBus, SyncEvent};
use serde::Serialize;

use crate::context::SyncContext;
use crate::credentials::CredentialSource;
use crate::outbox::Outbox;
use crate::remote::{ApiRoutes, RemoteApi};

/// What happened to a saved result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    /// The result is kept somewhere: delivered, or stored for later.
    pub success: bool,
    /// Delivery is deferred to the outbox.
    pub offline: bool,
}

impl WriteOutcome {
    pub const DELIVERED: Self = Self {
        success: true,
        offline: false,
    };
    pub const QUEUED: Self = Self {
        success: true,
        offline: true,
    };
    pub const LOST: Self = Self {
        success: false,
        offline: true,
    };
}

#[derive(Clone)]
pub struct WriteBehindWriter {
    store: Arc<dyn KeyValueStore>,
    remote: Arc<dyn RemoteApi>,
    connectivity: Arc<dyn ConnectivityProbe>,
    credentials: Arc<dyn CredentialSource>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
    routes: ApiRoutes,
    outbox: Outbox,
}

impl WriteBehindWriter {
    pub fn new(ctx: &SyncContext, outbox: Outbox) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            remote: Arc::clone(&ctx.remote),
            connectivity: Arc::clone(&ctx.connectivity),
            credentials: Arc::clone(&ctx.credentials),
            clock: Arc::clone(&ctx.clock),
            events: Arc::clone(&ctx.events),
            routes: ctx.routes.clone(),
            outbox,
        }
    }

    /// Save one game-session result for `child_id`.
    ///
    /// The input is assumed validated. Network failures are never returned;
    /// they show up as [`WriteOutcome::QUEUED`]. If the outbox cannot take
    /// the mutation either, the result is [`WriteOutcome::LOST`] and a
    /// [`SyncEvent::MutationLost`] is published.
    pub async fn save_progress(&self, child_id: DbId, input: NewProgress) -> WriteOutcome {
        let now = self.clock.now();
        let mut record = ProgressRecord::new(child_id, input, now);

        let stored_id = match ProgressRepo::append(self.store.as_ref(), &record).await {
            Ok(id) => {
                record.id = Some(id);
                Some(id)
            }
            Err(e) => {
                tracing::warn!(child_id, error = %e, "Local store unavailable, progress not persisted");
                None
            }
        };

        let mut request = OutboxRequest::new(
            HttpMethod::Post,
            self.routes.submit_progress(child_id),
            record.to_submission(),
        )
        .for_progress(stored_id);

        let token = self.credentials.bearer_token();
        if let Some(token) = token.as_deref() {
            request = request.with_bearer(token);
        }

        if self.connectivity.is_online() && token.is_some() {
            match self.remote.send(&request).await {
                Ok(()) => {
                    if let Some(id) = stored_id {
                        if let Err(e) =
                            ProgressRepo::mark_synced(self.store.as_ref(), id, self.clock.now()).await
                        {
                            tracing::warn!(progress_id = id, error = %e, "Failed to mark progress synced");
                        }
                    }
                    tracing::debug!(child_id, game = %record.game_name, "Progress delivered");
                    return WriteOutcome::DELIVERED;
                }
                Err(e) => {
                    tracing::info!(child_id, error = %e, "Progress delivery failed, queueing");
                }
            }
        }

        match self.outbox.enqueue(request).await {
            Ok(entry) => {
                self.events.publish(SyncEvent::MutationQueued {
                    entry_id: entry.id,
                    at: entry.created_at,
                });
                WriteOutcome::QUEUED
            }
            Err(e) => {
                tracing::warn!(child_id, error = %e, "Failed to queue progress for later delivery");
                self.events.publish(SyncEvent::MutationLost {
                    progress_id: stored_id,
                    url: self.routes.submit_progress(child_id),
                    at: self.clock.now(),
                });
                WriteOutcome::LOST
            }
        }
    }
}
