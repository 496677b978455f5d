use letras_core::error::CoreError;
use letras_db::StoreError;

/// Errors surfaced to callers of the sync engine.
///
/// Network failures never appear here: writes turn them into queued
/// outcomes and reads into cache fallbacks.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Neither the remote API nor the local cache could satisfy a read.
    #[error("No data available offline; connect to the internet to load it")]
    NoDataAvailable,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
