//! Letras sync event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SyncEvent`]: events announced by the sync engine.

pub mod bus;

pub use bus::{EventBus, SyncEvent};
