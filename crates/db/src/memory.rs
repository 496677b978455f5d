//! Process-local [`KeyValueStore`] backend.
//!
//! Nothing survives a restart. Used by tests and as a fallback when the
//! on-disk store cannot be opened but the caller still wants the outbox to
//! work for the lifetime of the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::partition::Partition;
use crate::store::{
    assign_key, existing_key, missing_key, IndexQuery, KeyValueStore, RecordKey, StoreError,
};

#[derive(Debug, Default)]
struct PartitionData {
    next_seq: u64,
    last_auto_key: i64,
    rows: BTreeMap<u64, (RecordKey, Value)>,
    seq_by_key: HashMap<RecordKey, u64>,
}

impl PartitionData {
    /// Resolve the record's key, assigning one on auto-keyed partitions.
    fn resolve_key(
        &mut self,
        partition: Partition,
        record: &mut Value,
    ) -> Result<RecordKey, StoreError> {
        match existing_key(partition, record)? {
            Some(key) => {
                if let (true, Some(n)) = (partition.auto_increment(), key.as_int()) {
                    self.last_auto_key = self.last_auto_key.max(n);
                }
                Ok(key)
            }
            None if partition.auto_increment() => {
                self.last_auto_key += 1;
                assign_key(partition, record, self.last_auto_key);
                Ok(RecordKey::Int(self.last_auto_key))
            }
            None => Err(missing_key(partition)),
        }
    }

    fn insert_new(&mut self, key: RecordKey, record: Value) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.seq_by_key.insert(key.clone(), seq);
        self.rows.insert(seq, (key, record));
    }
}

/// In-memory store with the same semantics as the SQLite backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: Mutex<HashMap<Partition, PartitionData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_partition<R>(
        &self,
        partition: Partition,
        f: impl FnOnce(&mut PartitionData) -> R,
    ) -> R {
        let mut guard = self.partitions.lock().unwrap_or_else(|e| e.into_inner());
        f(guard.entry(partition).or_default())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn open(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn put(&self, partition: Partition, mut record: Value) -> Result<RecordKey, StoreError> {
        self.with_partition(partition, |data| {
            let key = data.resolve_key(partition, &mut record)?;
            match data.seq_by_key.get(&key).copied() {
                Some(seq) => {
                    data.rows.insert(seq, (key.clone(), record));
                }
                None => data.insert_new(key.clone(), record),
            }
            Ok(key)
        })
    }

    async fn add(&self, partition: Partition, mut record: Value) -> Result<RecordKey, StoreError> {
        self.with_partition(partition, |data| {
            let key = data.resolve_key(partition, &mut record)?;
            if data.seq_by_key.contains_key(&key) {
                return Err(StoreError::DuplicateKey {
                    partition: partition.name(),
                    key: key.to_string(),
                });
            }
            data.insert_new(key.clone(), record);
            Ok(key)
        })
    }

    async fn get(
        &self,
        partition: Partition,
        key: &RecordKey,
    ) -> Result<Option<Value>, StoreError> {
        Ok(self.with_partition(partition, |data| {
            data.seq_by_key
                .get(key)
                .and_then(|seq| data.rows.get(seq))
                .map(|(_, value)| value.clone())
        }))
    }

    async fn get_all(
        &self,
        partition: Partition,
        index: Option<&IndexQuery>,
    ) -> Result<Vec<Value>, StoreError> {
        let field = index.map(|q| q.field_for(partition)).transpose()?;

        Ok(self.with_partition(partition, |data| {
            data.rows
                .values()
                .filter(|(_, value)| match (index, field) {
                    (Some(query), Some(field)) => query.value.matches(value.get(field)),
                    _ => true,
                })
                .map(|(_, value)| value.clone())
                .collect()
        }))
    }

    async fn delete(&self, partition: Partition, key: &RecordKey) -> Result<(), StoreError> {
        self.with_partition(partition, |data| {
            if let Some(seq) = data.seq_by_key.remove(key) {
                data.rows.remove(&seq);
            }
        });
        Ok(())
    }

    async fn clear(&self, partition: Partition) -> Result<(), StoreError> {
        self.with_partition(partition, |data| {
            data.rows.clear();
            data.seq_by_key.clear();
        });
        Ok(())
    }
}
