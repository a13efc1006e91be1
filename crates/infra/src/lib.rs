//! Infrastructure layer: status storage, audit, directory lookups, config and
//! the moderation service that ties them to the decision table.

pub mod audit;
pub mod config;
pub mod directory;
pub mod service;
pub mod status;

pub use audit::{AuditOutcome, AuditRecord, AuditSink, AuditWriteError, ClientMetadata, InMemoryAuditSink, TracingAuditSink};
pub use config::ModerationConfig;
pub use directory::{ContentDirectory, DirectoryError, IdentityProvider, InMemoryDirectory};
pub use service::{ModerationService, RequestContext};
