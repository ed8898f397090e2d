use async_trait::async_trait;

use crate::record::AuditRecord;
use crate::sink::{AuditError, AuditSink};

/// Audit sink that emits records as structured `tracing` events.
///
/// Useful as a default in deployments where the durable sink is not wired
/// up; the log pipeline then carries the audit trail.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn log(&self, record: AuditRecord) -> Result<(), AuditError> {
        tracing::info!(
            target: "audit",
            action = %record.action,
            actor_id = ?record.actor_id,
            payload = %record.payload,
            recorded_at = %record.recorded_at,
            "audit"
        );
        Ok(())
    }
}
