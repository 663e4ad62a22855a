//! Audit trail written to the tracing pipeline
//!
//! Entries go out on the `audit` target as one structured event each, so a
//! log shipper can route them separately from operational logs.

use async_trait::async_trait;
use tracing::info;

use crate::application::ports::{AuditEntry, AuditLog, SinkError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLog;

impl TracingAuditLog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), SinkError> {
        let before = entry
            .before
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| SinkError::Audit(e.to_string()))?;
        let after = entry
            .after
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| SinkError::Audit(e.to_string()))?;

        info!(
            target: "audit",
            tenant_id = %entry.tenant_id,
            actor_id = ?entry.actor_id,
            action = %entry.action,
            entity = %entry.entity,
            entity_id = %entry.entity_id,
            before = before.as_deref().unwrap_or("null"),
            after = after.as_deref().unwrap_or("null"),
            at = %entry.at.to_rfc3339(),
            "audit"
        );
        Ok(())
    }
}
