//! Game-session progress records.
//!
//! A [`ProgressRecord`] is appended to the local store every time a child
//! completes a game. It starts unsynced and is flipped to synced once the
//! remote API has accepted it; it is never flipped back.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Upper bound on points awarded by a single game session.
pub const MAX_POINTS_PER_SESSION: i64 = 10_000;

/// Maximum length of a game name.
pub const MAX_GAME_NAME_LEN: usize = 100;

// ---------------------------------------------------------------------------
// ProgressRecord
// ---------------------------------------------------------------------------

/// One game-session outcome for one child, as stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Local sequence number assigned by the store on insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    pub child_id: DbId,
    pub game_name: String,
    pub points: i64,
    #[serde(default)]
    pub levels_completed: Option<i32>,
    #[serde(default)]
    pub completed_items: Option<Vec<String>>,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub last_played: Timestamp,
    pub synced: bool,
    pub updated_at: Timestamp,
}

impl ProgressRecord {
    /// Build an unsynced record for a freshly completed session.
    pub fn new(child_id: DbId, input: NewProgress, now: Timestamp) -> Self {
        Self {
            id: None,
            child_id,
            game_name: input.game_name,
            points: input.points,
            levels_completed: input.levels_completed,
            completed_items: input.completed_items,
            difficulty: input.difficulty,
            last_played: now,
            synced: false,
            updated_at: now,
        }
    }

    /// The JSON body the remote API expects for a progress submission.
    pub fn to_submission(&self) -> serde_json::Value {
        serde_json::json!({
            "child_id": self.child_id,
            "game_name": self.game_name,
            "points": self.points,
            "levels_completed": self.levels_completed,
            "completed_items": self.completed_items,
            "difficulty": self.difficulty,
            "last_played": self.last_played,
        })
    }

    /// Mark the record as accepted by the remote API.
    ///
    /// Idempotent: an already-synced record keeps its original `updated_at`.
    pub fn mark_synced(&mut self, now: Timestamp) {
        if !self.synced {
            self.synced = true;
            self.updated_at = now;
        }
    }
}

// ---------------------------------------------------------------------------
// NewProgress
// ---------------------------------------------------------------------------

/// Input for recording a completed game session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProgress {
    pub game_name: String,
    pub points: i64,
    pub levels_completed: Option<i32>,
    pub completed_items: Option<Vec<String>>,
    pub difficulty: Option<String>,
}

impl NewProgress {
    pub fn new(game_name: impl Into<String>, points: i64) -> Self {
        Self {
            game_name: game_name.into(),
            points,
            ..Default::default()
        }
    }

    pub fn with_levels_completed(mut self, levels: i32) -> Self {
        self.levels_completed = Some(levels);
        self
    }

    pub fn with_completed_items(mut self, items: Vec<String>) -> Self {
        self.completed_items = Some(items);
        self
    }

    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    /// Reject obviously malformed submissions before anything is stored.
    pub fn validate(&self) -> Result<(), CoreError> {
        let name = self.game_name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("Game name must not be empty".into()));
        }
        if name.len() > MAX_GAME_NAME_LEN {
            return Err(CoreError::Validation(format!(
                "Game name must be at most {MAX_GAME_NAME_LEN} characters"
            )));
        }
        if !(0..=MAX_POINTS_PER_SESSION).contains(&self.points) {
            return Err(CoreError::Validation(format!(
                "Points must be between 0 and {MAX_POINTS_PER_SESSION}, got {}",
                self.points
            )));
        }
        if let Some(levels) = self.levels_completed {
            if levels < 0 {
                return Err(CoreError::Validation(format!(
                    "Levels completed must not be negative, got {levels}"
                )));
            }
        }
        Ok(())
    }
}
