//! Durable local store for the Letras offline sync engine.
//!
//! - [`KeyValueStore`]: the partitioned key-value contract.
//! - [`SqliteStore`]: on-disk backend (embedded, versioned migrations).
//! - [`MemoryStore`]: process-local backend with identical semantics.
//! - [`repositories`]: typed access to each partition.

pub mod memory;
pub mod partition;
pub mod repositories;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use partition::Partition;
pub use sqlite::SqliteStore;
pub use store::{IndexQuery, IndexValue, KeyValueStore, RecordKey, StoreError};

/// Apply the embedded schema migrations. Already-applied versions are skipped.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Verify the connection is usable.
pub async fn health_check(pool: &sqlx::SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
}
