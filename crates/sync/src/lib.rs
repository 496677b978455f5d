//! Offline-first sync engine for the Letras literacy platform.
//!
//! Mutations are written locally first and forwarded to the remote API
//! when possible ([`writer`]); reads prefer the remote API and fall back to
//! the last local snapshot ([`reader`]); undelivered mutations wait in the
//! [`outbox`] until the [`reconciler`] drains them. [`OfflineClient`] wires
//! all of it together behind one handle.

pub mod client;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod outbox;
pub mod reader;
pub mod reconciler;
pub mod remote;
pub mod retention;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use client::{OfflineClient, SyncStatus};
pub use context::SyncContext;
pub use error::SyncError;
pub use reconciler::{DrainOutcome, DrainReport, Reconciler, SkipReason};
pub use writer::WriteOutcome;
