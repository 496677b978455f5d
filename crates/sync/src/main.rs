//! `letras-sync` -- offline sync agent.
//!
//! Keeps a local Letras store reconciled with the remote API: drains the
//! outbox when connectivity returns and on a fixed interval, and purges
//! expired cached stories hourly.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default             | Description                        |
//! |------------------------|----------|---------------------|------------------------------------|
//! | `API_BASE_URL`         | yes      | --                  | Remote API root, e.g. `https://api.letras.app/api` |
//! | `LOCAL_STORE_PATH`     | no       | `letras-offline.db` | SQLite file backing the local store |
//! | `API_TOKEN`            | no       | --                  | Bearer token for the session       |
//! | `REQUEST_TIMEOUT_SECS` | no       | `30`                | Per-request HTTP timeout           |

use std::sync::Arc;
use std::time::Duration;

use letras_core::clock::SystemClock;
use letras_core::connectivity::ConnectivityMonitor;
use letras_db::{KeyValueStore, MemoryStore, SqliteStore};
use letras_events::{EventBus, SyncEvent};
use letras_sync::config::SyncConfig;
use letras_sync::credentials::SessionCredentials;
use letras_sync::remote::{ApiRoutes, HttpRemoteApi};
use letras_sync::{retention, OfflineClient, SyncContext};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "letras_sync=info,letras_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SyncConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        api_base_url = %config.api_base_url,
        store_path = %config.store_path.display(),
        request_timeout_secs = config.request_timeout_secs,
        "Starting letras-sync",
    );

    let store = open_store(&config).await;

    let remote = HttpRemoteApi::new(Duration::from_secs(config.request_timeout_secs))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        });

    let events = Arc::new(EventBus::default());
    let ctx = SyncContext {
        store,
        remote: Arc::new(remote),
        connectivity: Arc::new(ConnectivityMonitor::new(true)),
        credentials: Arc::new(SessionCredentials::new(config.api_token.clone())),
        clock: Arc::new(SystemClock),
        events: Arc::clone(&events),
        routes: ApiRoutes::new(&config.api_base_url),
    };
    let client = Arc::new(OfflineClient::new(ctx));

    let cancel = CancellationToken::new();
    let event_log = tokio::spawn(log_events(events.subscribe(), cancel.clone()));
    let reconciler = tokio::spawn(client.reconciler().run(cancel.clone()));
    let retention = tokio::spawn(retention::run(Arc::clone(&client), cancel.clone()));

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
    cancel.cancel();

    for (name, handle) in [("reconciler", reconciler), ("retention", retention), ("event_log", event_log)] {
        if let Err(e) = handle.await {
            tracing::error!(task = name, error = %e, "Background task panicked");
        }
    }
    tracing::info!("letras-sync stopped");
}

/// Open the SQLite store, falling back to a process-local store when the
/// file cannot be opened. Nothing queued in the fallback survives a restart.
async fn open_store(config: &SyncConfig) -> Arc<dyn KeyValueStore> {
    let sqlite = SqliteStore::open_file(&config.store_path);
    match sqlite.health_check().await {
        Ok(()) => {
            tracing::info!("Local store ready");
            Arc::new(sqlite)
        }
        Err(e) => {
            tracing::warn!(
                store_path = %config.store_path.display(),
                error = %e,
                "Local store unavailable, using in-memory store"
            );
            Arc::new(MemoryStore::new())
        }
    }
}

async fn log_events(mut rx: broadcast::Receiver<SyncEvent>, cancel: CancellationToken) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => event,
        };
        match event {
            Ok(SyncEvent::DeliveryExhausted { entry_id, url, method, retries, .. }) => {
                tracing::warn!(
                    %entry_id,
                    %method,
                    url = %url,
                    retries,
                    "Queued mutation dropped after repeated delivery failures"
                );
            }
            Ok(SyncEvent::MutationLost { progress_id, url, .. }) => {
                tracing::warn!(
                    ?progress_id,
                    url = %url,
                    "Mutation neither delivered nor queued"
                );
            }
            Ok(event) => tracing::debug!(event_type = event.event_type(), "Sync event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
