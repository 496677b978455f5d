//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`SyncEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the sync components.

use chrono::{DateTime, Utc};
use letras_core::outbox::HttpMethod;
use letras_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SyncEvent
// ---------------------------------------------------------------------------

/// Something the sync engine wants observers to know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// An outbox entry hit the retry ceiling and was dropped undelivered.
    DeliveryExhausted {
        entry_id: Uuid,
        url: String,
        method: HttpMethod,
        retries: u32,
        at: DateTime<Utc>,
    },

    /// A drain pass over the outbox finished.
    DrainCompleted {
        delivered: usize,
        failed: usize,
        dropped: usize,
        at: DateTime<Utc>,
    },

    /// A mutation could not be delivered immediately and was queued.
    MutationQueued { entry_id: Uuid, at: DateTime<Utc> },

    /// A mutation was neither delivered nor queued. `progress_id` is the
    /// local record still waiting to be synced, if it was stored.
    MutationLost {
        progress_id: Option<DbId>,
        url: String,
        at: DateTime<Utc>,
    },

    /// The connectivity signal changed.
    ConnectivityChanged { online: bool, at: DateTime<Utc> },
}

impl SyncEvent {
    /// Short dot-separated name, used in log lines.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::DeliveryExhausted { .. } => "outbox.delivery_exhausted",
            Self::DrainCompleted { .. } => "outbox.drain_completed",
            Self::MutationQueued { .. } => "outbox.mutation_queued",
            Self::MutationLost { .. } => "outbox.mutation_lost",
            Self::ConnectivityChanged { .. } => "connectivity.changed",
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`SyncEvent`].
///
/// # Usage
///
/// ```rust
/// use letras_events::bus::{EventBus, SyncEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(SyncEvent::ConnectivityChanged { online: true, at: chrono::Utc::now() });
/// ```
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: SyncEvent) {
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
