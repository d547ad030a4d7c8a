//! # Audit Collaborator
//!
//! The side-effects phase's only collaborator: best-effort audit logging.
//!
//! ## Two-Phase Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit phase (sync, transactional)                                     │
//! │       │  returns a receipt                                              │
//! │       ▼                                                                 │
//! │  transaction scope closes                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  side-effects phase (async, NON-transactional)                          │
//! │       └── AuditLog::record(event)                                       │
//! │             failures are caught and warn!-logged,                       │
//! │             never retried, never surfaced to the caller                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use dukkan_core::error::CoreResult;

/// A structured audit event emitted after a successful commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Human-readable action, e.g. "Sale created".
    pub action: String,
    /// Entity kind, e.g. "sale".
    pub entity_type: String,
    pub entity_id: String,
    /// Free-form JSON payload (amounts, counts, keys).
    pub details: Value,
}

impl AuditEvent {
    pub fn new(
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        details: Value,
    ) -> Self {
        AuditEvent {
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            details,
        }
    }
}

/// The audit sink consumed indirectly by every engine's side-effects
/// phase. Object-safe and async: the real implementation may write to a
/// store or ship logs elsewhere, outside any transaction.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, event: AuditEvent) -> CoreResult<()>;
}

/// Records an event, swallowing failures. This is the ONLY error policy
/// of the side-effects phase: log and move on.
pub(crate) async fn record_best_effort(audit: &dyn AuditLog, event: AuditEvent) {
    let action = event.action.clone();
    let entity_id = event.entity_id.clone();
    if let Err(err) = audit.record(event).await {
        warn!(action = %action, entity_id = %entity_id, error = %err, "Audit logging failed; ignoring");
    }
}
