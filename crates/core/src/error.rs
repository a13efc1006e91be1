//! Moderation error model.

use thiserror::Error;

/// Result type used across the moderation engine.
pub type ModerationResult<T> = Result<T, ModerationError>;

/// Error surfaced to the hosting layer.
///
/// None of these are retried by the engine. Audit write failures are not part
/// of this taxonomy: they are logged and swallowed where they happen.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModerationError {
    /// Actor, target or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Self-targeting on a rank-gated action, or a non-positive sanction duration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The evaluator denied the action; carries the decision's reason.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Status store or identity provider failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ModerationError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// HTTP status a REST host should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::InvalidArgument(_) => 400,
            Self::PermissionDenied(_) => 403,
            Self::Storage(_) => 500,
        }
    }
}
