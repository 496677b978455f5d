//! Periodic purge of expired cached stories.
//!
//! Runs the story retention sweep on a fixed interval using
//! `tokio::time::interval`.

use std::sync::Arc;

use letras_core::policy::{RETENTION_SWEEP_INTERVAL, STORY_RETENTION};
use tokio_util::sync::CancellationToken;

use crate::client::OfflineClient;

/// Run the story retention loop until `cancel` is triggered.
pub async fn run(client: Arc<OfflineClient>, cancel: CancellationToken) {
    tracing::info!(
        retention_days = STORY_RETENTION.as_secs() / 86_400,
        interval_secs = RETENTION_SWEEP_INTERVAL.as_secs(),
        "Story retention job started"
    );

    let mut interval = tokio::time::interval(RETENTION_SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Story retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match client.purge_expired_stories().await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Story retention: purged expired stories");
                        } else {
                            tracing::debug!("Story retention: nothing to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Story retention: sweep failed");
                    }
                }
            }
        }
    }
}
