//! The [`KeyValueStore`] contract shared by every local store backend.
//!
//! Records are JSON objects. Each [`Partition`] names the field that holds
//! a record's primary key (its key path) and the fields it can be looked up
//! by (its secondary indexes).

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::partition::Partition;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors raised by local store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be opened. Callers treat this as "no cache".
    #[error("Local store unavailable: {0}")]
    Unavailable(String),

    /// `add` was called with a key that already exists.
    #[error("Duplicate key {key} in {partition}")]
    DuplicateKey { partition: &'static str, key: String },

    /// The record has no usable value at the partition's key path.
    #[error("Record for {partition} has no key at '{key_path}'")]
    MissingKey {
        partition: &'static str,
        key_path: &'static str,
    },

    /// The partition declares no index with this name.
    #[error("Unknown index '{index}' on {partition}")]
    UnknownIndex {
        partition: &'static str,
        index: String,
    },

    /// Records must be JSON objects.
    #[error("Invalid record for {partition}: {reason}")]
    InvalidRecord {
        partition: &'static str,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// RecordKey
// ---------------------------------------------------------------------------

/// A record's primary key, read from the partition's key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Int(i64),
    Text(String),
}

impl RecordKey {
    /// Interpret a JSON value as a key. Only integers and strings qualify.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Text(s) => Value::from(s.as_str()),
        }
    }

    /// Type-tagged text form, so `1` and `"1"` never collide.
    pub fn encode(&self) -> String {
        match self {
            Self::Int(n) => format!("i:{n}"),
            Self::Text(s) => format!("s:{s}"),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<uuid::Uuid> for RecordKey {
    fn from(id: uuid::Uuid) -> Self {
        Self::Text(id.to_string())
    }
}

// ---------------------------------------------------------------------------
// IndexQuery
// ---------------------------------------------------------------------------

/// Value compared against an indexed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl IndexValue {
    /// Whether a record's field value equals this index value.
    pub fn matches(&self, field: Option<&Value>) -> bool {
        match (self, field) {
            (Self::Int(n), Some(Value::Number(v))) => v.as_i64() == Some(*n),
            (Self::Text(s), Some(Value::String(v))) => v == s,
            (Self::Bool(b), Some(Value::Bool(v))) => v == b,
            _ => false,
        }
    }
}

/// Filter for [`KeyValueStore::get_all`]: records whose `index` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    pub index: &'static str,
    pub value: IndexValue,
}

impl IndexQuery {
    pub fn int(index: &'static str, value: i64) -> Self {
        Self {
            index,
            value: IndexValue::Int(value),
        }
    }

    pub fn text(index: &'static str, value: impl Into<String>) -> Self {
        Self {
            index,
            value: IndexValue::Text(value.into()),
        }
    }

    pub fn bool(index: &'static str, value: bool) -> Self {
        Self {
            index,
            value: IndexValue::Bool(value),
        }
    }

    /// Resolve the index against `partition`, returning the record field.
    pub(crate) fn field_for(&self, partition: Partition) -> Result<&'static str, StoreError> {
        partition
            .index_field(self.index)
            .ok_or_else(|| StoreError::UnknownIndex {
                partition: partition.name(),
                index: self.index.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// Versioned, partitioned key-value persistence.
///
/// Every operation is atomic at the partition/key level. Implementations
/// must be safe to share behind an `Arc` across tasks.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Create or upgrade the schema. Idempotent; concurrent calls serialize.
    async fn open(&self) -> Result<(), StoreError>;

    /// Upsert `record`, returning its key. Auto-keyed partitions assign a
    /// key when the record carries none.
    async fn put(&self, partition: Partition, record: Value) -> Result<RecordKey, StoreError>;

    /// Insert `record`, failing with [`StoreError::DuplicateKey`] if its key
    /// already exists.
    async fn add(&self, partition: Partition, record: Value) -> Result<RecordKey, StoreError>;

    async fn get(&self, partition: Partition, key: &RecordKey)
        -> Result<Option<Value>, StoreError>;

    /// All records of `partition` in insertion order, optionally filtered.
    async fn get_all(
        &self,
        partition: Partition,
        index: Option<&IndexQuery>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Remove one record. Absent keys are a no-op.
    async fn delete(&self, partition: Partition, key: &RecordKey) -> Result<(), StoreError>;

    /// Remove every record in `partition`.
    async fn clear(&self, partition: Partition) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Key path helpers
// ---------------------------------------------------------------------------

/// Read the key at the partition's key path, if the record has one.
pub(crate) fn existing_key(
    partition: Partition,
    record: &Value,
) -> Result<Option<RecordKey>, StoreError> {
    let obj = record.as_object().ok_or_else(|| StoreError::InvalidRecord {
        partition: partition.name(),
        reason: "record must be a JSON object".into(),
    })?;

    match obj.get(partition.key_path()) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => RecordKey::from_json(value)
            .map(Some)
            .ok_or_else(|| StoreError::InvalidRecord {
                partition: partition.name(),
                reason: format!("key '{}' must be an integer or string", partition.key_path()),
            }),
    }
}

/// Write an auto-assigned key into the record's key path.
pub(crate) fn assign_key(partition: Partition, record: &mut Value, key: i64) {
    if let Some(obj) = record.as_object_mut() {
        obj.insert(partition.key_path().to_string(), Value::from(key));
    }
}

pub(crate) fn missing_key(partition: Partition) -> StoreError {
    StoreError::MissingKey {
        partition: partition.name(),
        key_path: partition.key_path(),
    }
}
