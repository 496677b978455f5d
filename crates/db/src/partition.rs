//! Named partitions of the local store and their key/index declarations.

use std::fmt;

/// A secondary index: lookups by `name` compare the record field `field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub field: &'static str,
}

// ---------------------------------------------------------------------------
// Index names
// ---------------------------------------------------------------------------

pub const INDEX_CHILD_ID: &str = "child_id";
pub const INDEX_SYNCED: &str = "synced";
pub const INDEX_TIMESTAMP: &str = "timestamp";
pub const INDEX_AGE_GROUP: &str = "age_group";

const PROGRESS_INDEXES: &[IndexSpec] = &[
    IndexSpec {
        name: INDEX_CHILD_ID,
        field: "child_id",
    },
    IndexSpec {
        name: INDEX_SYNCED,
        field: "synced",
    },
];

const SYNC_QUEUE_INDEXES: &[IndexSpec] = &[IndexSpec {
    name: INDEX_TIMESTAMP,
    field: "created_at",
}];

const STORY_INDEXES: &[IndexSpec] = &[IndexSpec {
    name: INDEX_AGE_GROUP,
    field: "age_group",
}];

const PARENT_CACHE_INDEXES: &[IndexSpec] = &[IndexSpec {
    name: INDEX_TIMESTAMP,
    field: "cached_at",
}];

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// The store's partitions. [`Partition::name`] is the persisted identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    /// Append-only game-session history, auto-keyed.
    ChildProgress,
    /// One profile snapshot per child.
    ChildProfiles,
    /// Outbox of deferred mutations.
    SyncQueue,
    /// Stories cached for offline reading.
    Stories,
    /// Generic per-game saved state.
    GameData,
    /// Parent dashboard aggregates.
    ParentCache,
}

impl Partition {
    pub const ALL: [Partition; 6] = [
        Partition::ChildProgress,
        Partition::ChildProfiles,
        Partition::SyncQueue,
        Partition::Stories,
        Partition::GameData,
        Partition::ParentCache,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ChildProgress => "childProgress",
            Self::ChildProfiles => "childProfiles",
            Self::SyncQueue => "syncQueue",
            Self::Stories => "stories",
            Self::GameData => "gameData",
            Self::ParentCache => "parentCache",
        }
    }

    /// Record field holding the primary key.
    pub fn key_path(&self) -> &'static str {
        match self {
            Self::ChildProgress | Self::SyncQueue | Self::Stories => "id",
            Self::ChildProfiles => "child_id",
            Self::GameData | Self::ParentCache => "key",
        }
    }

    /// Whether the store assigns integer keys to records that carry none.
    pub fn auto_increment(&self) -> bool {
        matches!(self, Self::ChildProgress)
    }

    pub fn indexes(&self) -> &'static [IndexSpec] {
        match self {
            Self::ChildProgress => PROGRESS_INDEXES,
            Self::SyncQueue => SYNC_QUEUE_INDEXES,
            Self::Stories => STORY_INDEXES,
            Self::ParentCache => PARENT_CACHE_INDEXES,
            Self::ChildProfiles | Self::GameData => &[],
        }
    }

    /// Resolve an index name to the record field it covers.
    pub fn index_field(&self, index: &str) -> Option<&'static str> {
        self.indexes()
            .iter()
            .find(|spec| spec.name == index)
            .map(|spec| spec.field)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
