//! Core domain types for the Letras offline sync engine.
//!
//! Holds the records that flow through the local store and the outbox,
//! the fixed sync policy constants, and the small injectable seams
//! (connectivity, clock) the sync components are built on.

pub mod clock;
pub mod connectivity;
pub mod content;
pub mod envelope;
pub mod error;
pub mod outbox;
pub mod policy;
pub mod profile;
pub mod progress;
pub mod types;
