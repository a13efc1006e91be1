//! Ban/mute status storage with lazy expiry.
//!
//! This module defines the contract a storage layer must satisfy (per-key
//! read-modify-write atomicity, refresh-on-read) without prescribing an engine.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStatusStore;
pub use r#trait::{SanctionDuration, StatusKind, StoreError, TemporalStatus, TemporalStatusStore};
