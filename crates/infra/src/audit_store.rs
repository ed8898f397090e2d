//! Durable audit sink backed by the `audit_logs` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use stockroom_audit::{AuditError, AuditRecord, AuditSink};

#[derive(Debug, Clone)]
pub struct PostgresAuditSink {
    pool: Arc<PgPool>,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn log(&self, record: AuditRecord) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (actor_id, action, payload, recorded_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.actor_id.map(|a| *a.as_uuid()))
        .bind(&record.action)
        .bind(&record.payload)
        .bind(record.recorded_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| AuditError::Sink(format!("insert_audit_log: {e}")))?;

        Ok(())
    }
}
