use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use modgate_core::{ModerationError, UserId};

/// Which sanction a status record describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Ban,
    Mute,
}

impl core::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StatusKind::Ban => f.write_str("ban"),
            StatusKind::Mute => f.write_str("mute"),
        }
    }
}

/// Current ban or mute state of one user.
///
/// # Invariants
/// - At most one record exists per (subject, kind).
/// - `until` absent on an active record means permanent.
/// - A record whose `until` has passed is inactive, and is rewritten as
///   cleared by whichever read observes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalStatus {
    pub subject: UserId,
    pub kind: StatusKind,
    pub active: bool,
    pub until: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub issued_by: Option<UserId>,
}

impl TemporalStatus {
    /// "Never sanctioned" state.
    pub fn inactive(subject: UserId, kind: StatusKind) -> Self {
        Self {
            subject,
            kind,
            active: false,
            until: None,
            reason: None,
            issued_by: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.until.is_some_and(|until| until <= now)
    }

    pub fn is_in_effect(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now)
    }

    pub fn is_permanent(&self) -> bool {
        self.active && self.until.is_none()
    }

    /// Reset to inactive; `until`, `reason` and `issued_by` go with it.
    pub fn clear(&mut self) {
        self.active = false;
        self.until = None;
        self.reason = None;
        self.issued_by = None;
    }
}

/// Upper bound on a timed sanction, in days.
pub const MAX_SANCTION_DAYS: i64 = 100 * 366;

/// Strictly positive sanction length, at most [`MAX_SANCTION_DAYS`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SanctionDuration(Duration);

impl SanctionDuration {
    pub fn new(duration: Duration) -> Result<Self, ModerationError> {
        if duration <= Duration::zero() {
            return Err(ModerationError::invalid_argument(format!(
                "sanction duration must be positive (got {}s)",
                duration.num_seconds()
            )));
        }
        if duration > Self::max() {
            return Err(ModerationError::invalid_argument(format!(
                "sanction duration exceeds {MAX_SANCTION_DAYS} days (got {}s); use a permanent sanction",
                duration.num_seconds()
            )));
        }
        Ok(Self(duration))
    }

    pub fn seconds(secs: i64) -> Result<Self, ModerationError> {
        let duration = Duration::try_seconds(secs).ok_or_else(|| {
            ModerationError::invalid_argument(format!("sanction duration out of range ({secs}s)"))
        })?;
        Self::new(duration)
    }

    /// Longest timed sanction accepted.
    pub fn max() -> Duration {
        Duration::days(MAX_SANCTION_DAYS)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("expiry out of range: {0}")]
    OutOfRange(String),
}

impl From<StoreError> for ModerationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Storage(msg) => ModerationError::Storage(msg),
            StoreError::OutOfRange(msg) => ModerationError::InvalidArgument(msg),
        }
    }
}

/// Authoritative ban/mute state per user.
///
/// Implementations must serialize every operation against the same
/// `(subject, kind)` key: a read that clears an expired record and a
/// concurrent write may not interleave. No operation fails on business
/// grounds; a missing record is the valid "never sanctioned" state.
pub trait TemporalStatusStore: Send + Sync {
    /// Current status, clearing it first if it has expired.
    fn get(&self, subject: UserId, kind: StatusKind) -> Result<TemporalStatus, StoreError>;

    /// Activate with no expiry. Re-applying with the same reason is a no-op.
    fn set_permanent(
        &self,
        subject: UserId,
        kind: StatusKind,
        reason: Option<String>,
        issued_by: Option<UserId>,
    ) -> Result<TemporalStatus, StoreError>;

    /// Activate until `now + duration`.
    fn set_timed(
        &self,
        subject: UserId,
        kind: StatusKind,
        duration: SanctionDuration,
        reason: Option<String>,
        issued_by: Option<UserId>,
    ) -> Result<TemporalStatus, StoreError>;

    fn clear(&self, subject: UserId, kind: StatusKind) -> Result<TemporalStatus, StoreError>;

    /// Atomically clear an in-effect status or make an inactive one permanent.
    fn toggle(
        &self,
        subject: UserId,
        kind: StatusKind,
        reason: Option<String>,
        issued_by: Option<UserId>,
    ) -> Result<TemporalStatus, StoreError>;

    /// Clear every expired record; returns how many were rewritten.
    ///
    /// Storage hygiene only: reads already treat expired records as inactive.
    fn sweep_expired(&self) -> Result<usize, StoreError>;
}

impl<T: TemporalStatusStore + ?Sized> TemporalStatusStore for Arc<T> {
    fn get(&self, subject: UserId, kind: StatusKind) -> Result<TemporalStatus, StoreError> {
        (**self).get(subject, kind)
    }

    fn set_permanent(
        &self,
        subject: UserId,
        kind: StatusKind,
        reason: Option<String>,
        issued_by: Option<UserId>,
    ) -> Result<TemporalStatus, StoreError> {
        (**self).set_permanent(subject, kind, reason, issued_by)
    }

    fn set_timed(
        &self,
        subject: UserId,
        kind: StatusKind,
        duration: SanctionDuration,
        reason: Option<String>,
        issued_by: Option<UserId>,
    ) -> Result<TemporalStatus, StoreError> {
        (**self).set_timed(subject, kind, duration, reason, issued_by)
    }

    fn clear(&self, subject: UserId, kind: StatusKind) -> Result<TemporalStatus, StoreError> {
        (**self).clear(subject, kind)
    }

    fn toggle(
        &self,
        subject: UserId,
        kind: StatusKind,
        reason: Option<String>,
        issued_by: Option<UserId>,
    ) -> Result<TemporalStatus, StoreError> {
        (**self).toggle(subject, kind, reason, issued_by)
    }

    fn sweep_expired(&self) -> Result<usize, StoreError> {
        (**self).sweep_expired()
    }
}
