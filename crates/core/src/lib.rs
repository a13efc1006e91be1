//! `modgate-core`: shared building blocks for the moderation engine.
//!
//! This crate contains identifiers, the injectable clock and the error
//! taxonomy surfaced to hosting layers (no policy, no storage).

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::Entity;
pub use error::{ModerationError, ModerationResult};
pub use id::{CommentId, EventId, UserId};
