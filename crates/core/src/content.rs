//! Offline-readable content and generic per-game state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// A story cached for offline reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedStory {
    pub id: String,
    #[serde(default)]
    pub age_group: Option<String>,
    pub payload: serde_json::Value,
    pub cached_at: Timestamp,
}

impl CachedStory {
    pub fn new(
        id: impl Into<String>,
        age_group: Option<String>,
        payload: serde_json::Value,
        now: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            age_group,
            payload,
            cached_at: now,
        }
    }

    /// Whether the story has outlived `retention` as of `now`.
    pub fn is_expired(&self, now: Timestamp, retention: Duration) -> bool {
        is_older_than(self.cached_at, now, retention)
    }
}

/// Arbitrary saved state for one game, keyed by a caller-chosen string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDataEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: Timestamp,
}

/// `true` when `then` lies strictly more than `window` before `now`.
///
/// Timestamps in the future (clock skew) are never considered old.
pub fn is_older_than(then: Timestamp, now: Timestamp, window: Duration) -> bool {
    match (now - then).to_std() {
        Ok(age) => age > window,
        Err(_) => false,
    }
}
