//! Typed repositories over the [`KeyValueStore`](crate::KeyValueStore).
//!
//! Each repository is a zero-sized struct with associated async functions
//! that take the store as their first argument.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::partition::Partition;

pub mod game_data_repo;
pub mod outbox_repo;
pub mod progress_repo;
pub mod snapshot_repo;
pub mod story_repo;

pub use game_data_repo::GameDataRepo;
pub use outbox_repo::OutboxRepo;
pub use progress_repo::ProgressRepo;
pub use snapshot_repo::{Snapshot, SnapshotRepo};
pub use story_repo::StoryRepo;

/// Decode every record, skipping (and logging) any that no longer match
/// the expected shape.
fn decode_all<T: DeserializeOwned>(partition: Partition, values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    partition = %partition,
                    error = %e,
                    "Skipping undecodable local record"
                );
                None
            }
        })
        .collect()
}
