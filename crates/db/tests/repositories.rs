//! Typed repository behaviour over the SQLite backend.

use chrono::{TimeZone, Utc};
use letras_core::content::CachedStory;
use letras_core::outbox::{HttpMethod, OutboxEntry, OutboxRequest};
use letras_core::policy::STORY_RETENTION;
use letras_core::profile::ProfileSnapshot;
use letras_core::progress::{NewProgress, ProgressRecord};
use letras_core::types::Timestamp;
use letras_db::repositories::{
    GameDataRepo, OutboxRepo, ProgressRepo, SnapshotRepo, StoryRepo,
};
use letras_db::{Partition, RecordKey, SqliteStore};
use serde_json::json;

fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 9, 1, 8, 30, 0).unwrap()
}

fn store() -> SqliteStore {
    SqliteStore::in_memory().unwrap()
}

// ---------------------------------------------------------------------------
// ProgressRepo
// ---------------------------------------------------------------------------

#[tokio::test]
async fn progress_history_is_per_child_and_ordered() {
    let store = store();
    for (child, game) in [(1, "Palabras"), (2, "Silabas"), (1, "Rimas")] {
        let record = ProgressRecord::new(child, NewProgress::new(game, 10), t0());
        ProgressRepo::append(&store, &record).await.unwrap();
    }

    let history = ProgressRepo::list_for_child(&store, 1).await.unwrap();
    let games: Vec<_> = history.iter().map(|r| r.game_name.as_str()).collect();
    assert_eq!(games, ["Palabras", "Rimas"]);
    assert!(history.iter().all(|r| r.id.is_some()));
}

#[tokio::test]
async fn append_ignores_caller_supplied_id() {
    let store = store();
    let mut record = ProgressRecord::new(1, NewProgress::new("Palabras", 10), t0());
    let first = ProgressRepo::append(&store, &record).await.unwrap();

    record.id = Some(first);
    let second = ProgressRepo::append(&store, &record).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(ProgressRepo::list_for_child(&store, 1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn mark_synced_removes_record_from_unsynced_list() {
    let store = store();
    let record = ProgressRecord::new(3, NewProgress::new("Palabras", 50), t0());
    let id = ProgressRepo::append(&store, &record).await.unwrap();
    assert_eq!(ProgressRepo::list_unsynced(&store).await.unwrap().len(), 1);

    let later = t0() + chrono::Duration::minutes(2);
    assert!(ProgressRepo::mark_synced(&store, id, later).await.unwrap());

    assert!(ProgressRepo::list_unsynced(&store).await.unwrap().is_empty());
    let stored = ProgressRepo::find(&store, id).await.unwrap().unwrap();
    assert!(stored.synced);
    assert_eq!(stored.updated_at, later);
}

#[tokio::test]
async fn mark_synced_on_missing_record_reports_false() {
    let store = store();
    assert!(!ProgressRepo::mark_synced(&store, 404, t0()).await.unwrap());
}

// ---------------------------------------------------------------------------
// SnapshotRepo
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshot_upsert_keeps_latest() {
    let store = store();
    let key = RecordKey::Int(5);
    let first = ProfileSnapshot {
        child_id: 5,
        name: "Lucía".into(),
        surname: None,
        birth_date: None,
    };
    let second = ProfileSnapshot {
        surname: Some("Pérez".into()),
        ..first.clone()
    };

    SnapshotRepo::put(&store, Partition::ChildProfiles, &key, &first, t0())
        .await
        .unwrap();
    let later = t0() + chrono::Duration::minutes(1);
    SnapshotRepo::put(&store, Partition::ChildProfiles, &key, &second, later)
        .await
        .unwrap();

    let snap = SnapshotRepo::get::<ProfileSnapshot>(&store, Partition::ChildProfiles, &key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snap.data, second);
    assert_eq!(snap.cached_at, later);
}

#[tokio::test]
async fn snapshot_missing_key_is_none() {
    let store = store();
    let snap = SnapshotRepo::get::<serde_json::Value>(
        &store,
        Partition::ParentCache,
        &RecordKey::from("children"),
    )
    .await
    .unwrap();
    assert!(snap.is_none());
}

// ---------------------------------------------------------------------------
// OutboxRepo
// ---------------------------------------------------------------------------

#[tokio::test]
async fn outbox_update_and_delete() {
    let store = store();
    let request = OutboxRequest::new(HttpMethod::Post, "http://api/progress", json!({"p": 1}));
    let mut entry = OutboxEntry::new(request, t0());
    OutboxRepo::insert(&store, &entry).await.unwrap();

    entry.retries = 2;
    OutboxRepo::update(&store, &entry).await.unwrap();

    let listed = OutboxRepo::list(&store).await.unwrap();
    assert_eq!(listed, vec![entry.clone()]);

    OutboxRepo::delete(&store, entry.id).await.unwrap();
    assert_eq!(OutboxRepo::count(&store).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// StoryRepo / GameDataRepo
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_stories_are_purged() {
    let store = store();
    let old = CachedStory::new("old", Some("4-6".into()), json!({"title": "El sapo"}), t0());
    let recent = CachedStory::new(
        "recent",
        Some("4-6".into()),
        json!({"title": "La luna"}),
        t0() + chrono::Duration::days(20),
    );
    StoryRepo::upsert(&store, &old).await.unwrap();
    StoryRepo::upsert(&store, &recent).await.unwrap();

    let now = t0() + chrono::Duration::days(31);
    let deleted = StoryRepo::delete_expired(&store, now, STORY_RETENTION)
        .await
        .unwrap();

    assert_eq!(deleted, 1);
    let remaining = StoryRepo::list(&store, Some("4-6")).await.unwrap();
    assert_eq!(remaining, vec![recent]);
}

#[tokio::test]
async fn game_data_round_trips_by_key() {
    let store = store();
    GameDataRepo::save(&store, "palabras", json!({"unlocked": [1, 2]}), t0())
        .await
        .unwrap();

    let entry = GameDataRepo::find(&store, "palabras").await.unwrap().unwrap();
    assert_eq!(entry.value["unlocked"][1], 2);
    assert_eq!(entry.updated_at, t0());
    assert!(GameDataRepo::find(&store, "rimas").await.unwrap().is_none());
}
