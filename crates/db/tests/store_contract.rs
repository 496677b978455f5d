//! Behavioural contract shared by every `KeyValueStore` backend.
//!
//! Each check is written once against `&dyn KeyValueStore` and run for both
//! the in-memory and the SQLite backends.

use assert_matches::assert_matches;
use letras_db::partition::{INDEX_AGE_GROUP, INDEX_CHILD_ID, INDEX_SYNCED};
use letras_db::{IndexQuery, KeyValueStore, MemoryStore, Partition, RecordKey, SqliteStore, StoreError};
use serde_json::json;

fn sqlite() -> SqliteStore {
    SqliteStore::in_memory().expect("in-memory options should parse")
}

// ---------------------------------------------------------------------------
// Contract checks
// ---------------------------------------------------------------------------

async fn put_overwrites_existing_key(store: &dyn KeyValueStore) {
    store.open().await.unwrap();

    store
        .put(Partition::ChildProfiles, json!({"child_id": 1, "name": "Ana"}))
        .await
        .unwrap();
    store
        .put(Partition::ChildProfiles, json!({"child_id": 1, "name": "Ana María"}))
        .await
        .unwrap();

    let all = store.get_all(Partition::ChildProfiles, None).await.unwrap();
    assert_eq!(all.len(), 1, "upsert must keep one record per key");
    assert_eq!(all[0]["name"], "Ana María");
}

async fn add_rejects_duplicate_key(store: &dyn KeyValueStore) {
    store.open().await.unwrap();

    store
        .add(Partition::GameData, json!({"key": "palabras", "value": 1}))
        .await
        .unwrap();
    let second = store
        .add(Partition::GameData, json!({"key": "palabras", "value": 2}))
        .await;

    assert_matches!(second, Err(StoreError::DuplicateKey { .. }));
    let kept = store
        .get(Partition::GameData, &RecordKey::from("palabras"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept["value"], 1);
}

async fn auto_keys_are_assigned_in_sequence(store: &dyn KeyValueStore) {
    store.open().await.unwrap();

    let a = store
        .add(Partition::ChildProgress, json!({"child_id": 1, "synced": false}))
        .await
        .unwrap();
    let b = store
        .add(Partition::ChildProgress, json!({"child_id": 1, "synced": false}))
        .await
        .unwrap();

    assert_eq!(a, RecordKey::Int(1));
    assert_eq!(b, RecordKey::Int(2));

    let stored = store
        .get(Partition::ChildProgress, &b)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["id"], 2, "assigned key is written into the record");
}

async fn auto_keys_are_not_reused_after_delete(store: &dyn KeyValueStore) {
    store.open().await.unwrap();

    let a = store
        .add(Partition::ChildProgress, json!({"child_id": 1, "synced": false}))
        .await
        .unwrap();
    store.delete(Partition::ChildProgress, &a).await.unwrap();
    let b = store
        .add(Partition::ChildProgress, json!({"child_id": 1, "synced": false}))
        .await
        .unwrap();

    assert_ne!(a, b);
}

async fn missing_key_is_rejected(store: &dyn KeyValueStore) {
    store.open().await.unwrap();

    let result = store
        .put(Partition::ChildProfiles, json!({"name": "nobody"}))
        .await;
    assert_matches!(result, Err(StoreError::MissingKey { .. }));
}

async fn get_all_preserves_insertion_order(store: &dyn KeyValueStore) {
    store.open().await.unwrap();

    for id in ["c", "a", "b"] {
        store
            .add(Partition::SyncQueue, json!({"id": id, "created_at": "2024-01-01T00:00:00Z"}))
            .await
            .unwrap();
    }

    let ids: Vec<_> = store
        .get_all(Partition::SyncQueue, None)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["c", "a", "b"]);
}

async fn index_filters_by_field(store: &dyn KeyValueStore) {
    store.open().await.unwrap();

    store
        .add(Partition::ChildProgress, json!({"child_id": 1, "synced": false}))
        .await
        .unwrap();
    store
        .add(Partition::ChildProgress, json!({"child_id": 2, "synced": true}))
        .await
        .unwrap();
    store
        .add(Partition::ChildProgress, json!({"child_id": 1, "synced": true}))
        .await
        .unwrap();

    let child_one = store
        .get_all(
            Partition::ChildProgress,
            Some(&IndexQuery::int(INDEX_CHILD_ID, 1)),
        )
        .await
        .unwrap();
    assert_eq!(child_one.len(), 2);

    let unsynced = store
        .get_all(
            Partition::ChildProgress,
            Some(&IndexQuery::bool(INDEX_SYNCED, false)),
        )
        .await
        .unwrap();
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0]["child_id"], 1);

    store
        .put(Partition::Stories, json!({"id": "s1", "age_group": "4-6"}))
        .await
        .unwrap();
    store
        .put(Partition::Stories, json!({"id": "s2", "age_group": "7-9"}))
        .await
        .unwrap();
    let young = store
        .get_all(
            Partition::Stories,
            Some(&IndexQuery::text(INDEX_AGE_GROUP, "4-6")),
        )
        .await
        .unwrap();
    assert_eq!(young.len(), 1);
    assert_eq!(young[0]["id"], "s1");
}

async fn unknown_index_is_an_error(store: &dyn KeyValueStore) {
    store.open().await.unwrap();

    let result = store
        .get_all(
            Partition::GameData,
            Some(&IndexQuery::int(INDEX_CHILD_ID, 1)),
        )
        .await;
    assert_matches!(result, Err(StoreError::UnknownIndex { .. }));
}

async fn delete_absent_key_is_noop(store: &dyn KeyValueStore) {
    store.open().await.unwrap();

    store
        .delete(Partition::Stories, &RecordKey::from("never-cached"))
        .await
        .unwrap();
}

async fn partitions_are_isolated(store: &dyn KeyValueStore) {
    store.open().await.unwrap();

    store
        .put(Partition::GameData, json!({"key": "shared"}))
        .await
        .unwrap();
    store
        .put(Partition::ParentCache, json!({"key": "shared"}))
        .await
        .unwrap();

    store.clear(Partition::GameData).await.unwrap();

    assert!(store
        .get_all(Partition::GameData, None)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        store.get_all(Partition::ParentCache, None).await.unwrap().len(),
        1
    );
}

// ---------------------------------------------------------------------------
// Backend wiring
// ---------------------------------------------------------------------------

macro_rules! contract_tests {
    ($($name:ident),* $(,)?) => {
        mod memory_backend {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(&MemoryStore::new()).await;
                }
            )*
        }

        mod sqlite_backend {
            use super::*;
            $(
                #[tokio::test]
                async fn $name() {
                    super::$name(&sqlite()).await;
                }
            )*
        }
    };
}

contract_tests!(
    put_overwrites_existing_key,
    add_rejects_duplicate_key,
    auto_keys_are_assigned_in_sequence,
    auto_keys_are_not_reused_after_delete,
    missing_key_is_rejected,
    get_all_preserves_insertion_order,
    index_filters_by_field,
    unknown_index_is_an_error,
    delete_absent_key_is_noop,
    partitions_are_isolated,
);
