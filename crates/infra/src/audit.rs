//! Audit trail for moderation actions.
//!
//! Only mutating actions are recorded. A failed write is reported to the
//! caller of [`AuditSink::record`], which is expected to log it and carry on.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use modgate_auth::ModerationAction;
use modgate_core::UserId;

/// Whether the audited attempt went through.
///
/// Success-only consumers filter on `granted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Granted,
    Denied,
}

/// Request metadata forwarded by the hosting layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor_id: UserId,
    pub action: ModerationAction,
    pub entity_type: String,
    pub entity_id: String,
    pub outcome: AuditOutcome,
    pub detail: String,
    pub client: ClientMetadata,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditWriteError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode audit record: {0}")]
    Encode(String),
}

pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord) -> Result<(), AuditWriteError>;
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, record: AuditRecord) -> Result<(), AuditWriteError> {
        (**self).record(record)
    }
}

/// In-memory audit sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn granted(&self) -> Vec<AuditRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.outcome == AuditOutcome::Granted)
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, record: AuditRecord) -> Result<(), AuditWriteError> {
        self.records
            .write()
            .map_err(|_| AuditWriteError::Unavailable("lock poisoned".to_string()))?
            .push(record);
        Ok(())
    }
}

/// Writes each record as one JSON line on the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) -> Result<(), AuditWriteError> {
        let json =
            serde_json::to_string(&record).map_err(|e| AuditWriteError::Encode(e.to_string()))?;
        tracing::info!(
            target: "audit",
            actor = %record.actor_id,
            action = %record.action,
            outcome = ?record.outcome,
            record = %json,
            "moderation audit"
        );
        Ok(())
    }
}
