//! SQLite-backed [`KeyValueStore`].
//!
//! All partitions share one `records` table; the partition name and the
//! encoded primary key form a unique pair, and `seq` keeps insertion order.
//! Secondary index lookups go through `json_extract` on the stored JSON.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tokio::sync::OnceCell;

use crate::partition::Partition;
use crate::store::{
    assign_key, existing_key, missing_key, IndexQuery, IndexValue, KeyValueStore, RecordKey,
    StoreError,
};

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection cap for file-backed stores.
const FILE_MAX_CONNECTIONS: u32 = 4;

/// Local store persisted in SQLite.
///
/// The pool is created lazily by [`KeyValueStore::open`]; every other
/// operation opens the store first if needed. A failed open is not cached,
/// so a later call retries it.
pub struct SqliteStore {
    options: SqliteConnectOptions,
    max_connections: u32,
    pool: OnceCell<SqlitePool>,
}

impl SqliteStore {
    /// A store persisted at `path`, created if missing.
    pub fn open_file(path: impl AsRef<Path>) -> Self {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        Self {
            options,
            max_connections: FILE_MAX_CONNECTIONS,
            pool: OnceCell::new(),
        }
    }

    /// A private in-memory store, gone when the store is dropped.
    pub fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        // Every in-memory connection is its own database, so stay on one.
        Ok(Self {
            options,
            max_connections: 1,
            pool: OnceCell::new(),
        })
    }

    /// Open the store if needed and run a trivial query against it.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        crate::health_check(pool).await?;
        Ok(())
    }

    async fn pool(&self) -> Result<&SqlitePool, StoreError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = SqlitePoolOptions::new()
                    .max_connections(self.max_connections)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(self.options.clone())
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;

                crate::run_migrations(&pool)
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;

                tracing::debug!(
                    max_connections = self.max_connections,
                    "Local store opened"
                );
                Ok::<_, StoreError>(pool)
            })
            .await
    }

    /// Resolve the record's key inside `tx`, assigning one on auto-keyed
    /// partitions.
    async fn resolve_key(
        tx: &mut Transaction<'_, Sqlite>,
        partition: Partition,
        record: &mut Value,
    ) -> Result<RecordKey, StoreError> {
        match existing_key(partition, record)? {
            Some(key) => {
                if let (true, Some(n)) = (partition.auto_increment(), key.as_int()) {
                    sqlx::query(
                        "INSERT INTO key_sequences (partition, last_key) VALUES (?1, ?2) \
                         ON CONFLICT (partition) DO UPDATE \
                         SET last_key = MAX(last_key, excluded.last_key)",
                    )
                    .bind(partition.name())
                    .bind(n)
                    .execute(&mut **tx)
                    .await?;
                }
                Ok(key)
            }
            None if partition.auto_increment() => {
                let next: i64 = sqlx::query_scalar(
                    "INSERT INTO key_sequences (partition, last_key) VALUES (?1, 1) \
                     ON CONFLICT (partition) DO UPDATE SET last_key = last_key + 1 \
                     RETURNING last_key",
                )
                .bind(partition.name())
                .fetch_one(&mut **tx)
                .await?;
                assign_key(partition, record, next);
                Ok(RecordKey::Int(next))
            }
            None => Err(missing_key(partition)),
        }
    }
}

/// Translate a unique-constraint violation into [`StoreError::DuplicateKey`].
fn map_insert_error(err: sqlx::Error, partition: Partition, key: &RecordKey) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::DuplicateKey {
                partition: partition.name(),
                key: key.to_string(),
            };
        }
    }
    StoreError::Database(err)
}

fn decode_rows(rows: Vec<String>) -> Result<Vec<Value>, StoreError> {
    rows.iter()
        .map(|raw| serde_json::from_str(raw).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn open(&self) -> Result<(), StoreError> {
        self.pool().await.map(|_| ())
    }

    async fn put(&self, partition: Partition, mut record: Value) -> Result<RecordKey, StoreError> {
        let mut tx = self.pool().await?.begin().await?;
        let key = Self::resolve_key(&mut tx, partition, &mut record).await?;

        sqlx::query(
            "INSERT INTO records (partition, record_key, value) VALUES (?1, ?2, ?3) \
             ON CONFLICT (partition, record_key) DO UPDATE SET value = excluded.value",
        )
        .bind(partition.name())
        .bind(key.encode())
        .bind(serde_json::to_string(&record)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(key)
    }

    async fn add(&self, partition: Partition, mut record: Value) -> Result<RecordKey, StoreError> {
        let mut tx = self.pool().await?.begin().await?;
        let key = Self::resolve_key(&mut tx, partition, &mut record).await?;

        sqlx::query("INSERT INTO records (partition, record_key, value) VALUES (?1, ?2, ?3)")
            .bind(partition.name())
            .bind(key.encode())
            .bind(serde_json::to_string(&record)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, partition, &key))?;

        tx.commit().await?;
        Ok(key)
    }

    async fn get(
        &self,
        partition: Partition,
        key: &RecordKey,
    ) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT value FROM records WHERE partition = ?1 AND record_key = ?2",
        )
        .bind(partition.name())
        .bind(key.encode())
        .fetch_optional(self.pool().await?)
        .await?;

        raw.map(|r| serde_json::from_str(&r).map_err(StoreError::from))
            .transpose()
    }

    async fn get_all(
        &self,
        partition: Partition,
        index: Option<&IndexQuery>,
    ) -> Result<Vec<Value>, StoreError> {
        let pool = self.pool().await?;

        let rows: Vec<String> = match index {
            None => {
                sqlx::query_scalar(
                    "SELECT value FROM records WHERE partition = ?1 ORDER BY seq ASC",
                )
                .bind(partition.name())
                .fetch_all(pool)
                .await?
            }
            Some(query) => {
                let path = format!("$.{}", query.field_for(partition)?);
                let q = sqlx::query_scalar::<Sqlite, String>(
                    "SELECT value FROM records \
                     WHERE partition = ?1 AND json_extract(value, ?2) = ?3 \
                     ORDER BY seq ASC",
                )
                .bind(partition.name())
                .bind(path);

                // json_extract yields 1/0 for JSON booleans.
                let q = match &query.value {
                    IndexValue::Int(n) => q.bind(*n),
                    IndexValue::Text(s) => q.bind(s.clone()),
                    IndexValue::Bool(b) => q.bind(i64::from(*b)),
                };
                q.fetch_all(pool).await?
            }
        };

        decode_rows(rows)
    }

    async fn delete(&self, partition: Partition, key: &RecordKey) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM records WHERE partition = ?1 AND record_key = ?2")
            .bind(partition.name())
            .bind(key.encode())
            .execute(self.pool().await?)
            .await?;
        Ok(())
    }

    async fn clear(&self, partition: Partition) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM records WHERE partition = ?1")
            .bind(partition.name())
            .execute(self.pool().await?)
            .await?;
        Ok(())
    }
}
