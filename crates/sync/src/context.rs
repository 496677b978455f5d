//! Shared dependencies of the sync components.

use std::sync::Arc;

use letras_core::clock::Clock;
use letras_core::connectivity::ConnectivityProbe;
use letras_db::KeyValueStore;
use letras_events::EventBus;

use crate::credentials::CredentialSource;
use crate::remote::{ApiRoutes, RemoteApi};

/// Everything the writer, reader and reconciler need, constructed once at
/// startup and cloned into each component.
///
/// Cloning is cheap: every field is an `Arc` or a short string.
#[derive(Clone)]
pub struct SyncContext {
    /// Durable local store shared by all partitions.
    pub store: Arc<dyn KeyValueStore>,
    pub remote: Arc<dyn RemoteApi>,
    pub connectivity: Arc<dyn ConnectivityProbe>,
    pub credentials: Arc<dyn CredentialSource>,
    pub clock: Arc<dyn Clock>,
    /// Fan-out for sync events (dropped deliveries, drain summaries).
    pub events: Arc<EventBus>,
    pub routes: ApiRoutes,
}
