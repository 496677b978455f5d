//! Provenance wrapper returned by cache-aside reads.

use std::time::Duration;

use serde::Serialize;

use crate::content::is_older_than;
use crate::types::Timestamp;

/// Result of a cache-aside read, tagged with where the data came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEnvelope<T> {
    pub data: T,
    /// `true` when the remote fetch was skipped or failed and the data is a
    /// local snapshot.
    pub from_cache: bool,
    /// `true` iff `from_cache` and the snapshot is older than its window.
    pub is_stale: bool,
    /// When the snapshot was taken; `None` for fresh data.
    pub cached_at: Option<Timestamp>,
}

impl<T> CacheEnvelope<T> {
    /// Data straight from the remote API.
    pub fn fresh(data: T) -> Self {
        Self {
            data,
            from_cache: false,
            is_stale: false,
            cached_at: None,
        }
    }

    /// Data from a local snapshot taken at `cached_at`, read at `now`.
    pub fn cached(data: T, cached_at: Timestamp, now: Timestamp, window: Duration) -> Self {
        Self {
            data,
            from_cache: true,
            is_stale: is_older_than(cached_at, now, window),
            cached_at: Some(cached_at),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheEnvelope<U> {
        CacheEnvelope {
            data: f(self.data),
            from_cache: self.from_cache,
            is_stale: self.is_stale,
            cached_at: self.cached_at,
        }
    }
}
