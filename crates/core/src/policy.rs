//! Fixed sync policy constants.
//!
//! These are policy values, not configuration: tests assert against them
//! exactly, so they are deliberately not read from the environment.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Number of failed delivery attempts after which an outbox entry is dropped.
///
/// Attempts are counted across drain invocations, not within one.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

// ---------------------------------------------------------------------------
// Freshness windows
// ---------------------------------------------------------------------------

/// Freshness window for parent-facing aggregate data (children list).
pub const PARENT_CACHE_FRESHNESS: Duration = Duration::from_secs(5 * 60);

/// Freshness window for child profile snapshots.
pub const PROFILE_FRESHNESS: Duration = Duration::from_secs(5 * 60);

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

/// Cached story content older than this is removed by the retention sweep.
pub const STORY_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// How often the retention sweep runs.
pub const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// Reconciler triggers
// ---------------------------------------------------------------------------

/// Period of the reconciler's timer trigger.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Delay after startup before the first drain, when already online.
pub const INITIAL_SYNC_DELAY: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Well-known cache keys
// ---------------------------------------------------------------------------

/// `parentCache` key holding the parent's children list.
pub const CHILDREN_CACHE_KEY: &str = "children";
