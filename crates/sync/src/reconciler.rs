//! Outbox reconciliation.
//!
//! A single [`Reconciler`] owns the "a drain is in progress" flag, so at
//! most one pass over the outbox runs at a time. Drains are triggered when
//! connectivity comes back, on a fixed interval, and shortly after startup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use letras_core::clock::Clock;
use letras_core::connectivity::ConnectivityProbe;
use letras_core::policy::{INITIAL_SYNC_DELAY, SYNC_INTERVAL};
use letras_db::StoreError;
use letras_events::{EventBus, SyncEvent};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub use crate::outbox::DrainReport;

use crate::context::SyncContext;
use crate::outbox::Outbox;
use crate::remote::RemoteApi;

/// Why a drain request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySyncing,
    Offline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrainOutcome {
    Completed(DrainReport),
    Skipped(SkipReason),
}

/// Clears the draining flag when the pass ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Reconciler {
    outbox: Outbox,
    remote: Arc<dyn RemoteApi>,
    connectivity: Arc<dyn ConnectivityProbe>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
    syncing: AtomicBool,
}

impl Reconciler {
    pub fn new(ctx: &SyncContext, outbox: Outbox) -> Self {
        Self {
            outbox,
            remote: Arc::clone(&ctx.remote),
            connectivity: Arc::clone(&ctx.connectivity),
            clock: Arc::clone(&ctx.clock),
            events: Arc::clone(&ctx.events),
            syncing: AtomicBool::new(false),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Run one pass over the outbox unless one is already running or the
    /// device is offline.
    pub async fn drain(&self) -> Result<DrainOutcome, StoreError> {
        if !self.connectivity.is_online() {
            return Ok(DrainOutcome::Skipped(SkipReason::Offline));
        }
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(DrainOutcome::Skipped(SkipReason::AlreadySyncing));
        }
        let _guard = DrainGuard(&self.syncing);

        let report = self
            .outbox
            .drain(self.remote.as_ref(), &self.events)
            .await?;

        self.events.publish(SyncEvent::DrainCompleted {
            delivered: report.delivered,
            failed: report.failed,
            dropped: report.dropped_count(),
            at: self.clock.now(),
        });

        Ok(DrainOutcome::Completed(report))
    }

    /// Drain on every trigger until `cancel` fires.
    ///
    /// Triggers: connectivity going from offline to online, every
    /// [`SYNC_INTERVAL`], and once [`INITIAL_SYNC_DELAY`] after start.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = SYNC_INTERVAL.as_secs(),
            initial_delay_secs = INITIAL_SYNC_DELAY.as_secs(),
            "Reconciler started"
        );

        let mut connectivity = Some(self.connectivity.subscribe());
        let mut interval = tokio::time::interval_at(Instant::now() + SYNC_INTERVAL, SYNC_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let startup = tokio::time::sleep(INITIAL_SYNC_DELAY);
        tokio::pin!(startup);
        let mut started = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reconciler stopping");
                    break;
                }
                _ = &mut startup, if !started => {
                    started = true;
                    self.trigger("startup").await;
                }
                _ = interval.tick() => {
                    self.trigger("interval").await;
                }
                Some(online) = next_transition(&mut connectivity) => {
                    self.events.publish(SyncEvent::ConnectivityChanged {
                        online,
                        at: self.clock.now(),
                    });
                    if online {
                        self.trigger("connectivity_restored").await;
                    }
                }
            }
        }
    }

    async fn trigger(&self, reason: &'static str) {
        match self.drain().await {
            Ok(DrainOutcome::Completed(report)) => {
                if report.delivered + report.failed + report.dropped_count() > 0 {
                    tracing::info!(
                        reason,
                        delivered = report.delivered,
                        failed = report.failed,
                        dropped = report.dropped_count(),
                        "Outbox drained"
                    );
                } else {
                    tracing::debug!(reason, "Outbox empty");
                }
            }
            Ok(DrainOutcome::Skipped(skip)) => {
                tracing::debug!(reason, ?skip, "Drain skipped");
            }
            Err(e) => {
                tracing::error!(reason, error = %e, "Drain aborted by local store error");
            }
        }
    }
}

/// Wait for the next connectivity change. Pending forever once the sender
/// is gone.
async fn next_transition(rx: &mut Option<watch::Receiver<bool>>) -> Option<bool> {
    let Some(receiver) = rx.as_mut() else {
        return std::future::pending().await;
    };
    match receiver.changed().await {
        Ok(()) => Some(*receiver.borrow_and_update()),
        Err(_) => {
            *rx = None;
            None
        }
    }
}
