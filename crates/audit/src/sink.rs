use async_trait::async_trait;
use thiserror::Error;

use crate::record::AuditRecord;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink failure: {0}")]
    Sink(String),
}

/// Durable record of mutations. Implementations must be safe to call from
/// concurrent request handlers.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// Log a record, swallowing sink failure.
///
/// The mutation has already committed by the time this runs; losing the
/// audit entry is preferable to failing the caller, but the loss itself is
/// logged for operational visibility.
pub async fn log_best_effort(sink: &dyn AuditSink, record: AuditRecord) {
    let action = record.action.clone();
    if let Err(e) = sink.log(record).await {
        tracing::warn!(action = %action, error = %e, "audit record dropped");
    }
}
