use std::sync::RwLock;

use async_trait::async_trait;

use crate::record::AuditRecord;
use crate::sink::{AuditError, AuditSink};

/// In-memory audit sink for tests/dev. Records are kept in arrival order.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<AuditRecord> {
        self.records
            .read()
            .expect("audit sink lock poisoned")
            .clone()
    }

    /// Records for one action, in arrival order.
    pub fn by_action(&self, action: &str) -> Vec<AuditRecord> {
        self.all()
            .into_iter()
            .filter(|r| r.action == action)
            .collect()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn log(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records
            .write()
            .map_err(|_| AuditError::Sink("lock poisoned".to_string()))?
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions;
    use crate::sink::log_best_effort;
    use serde_json::json;

    #[tokio::test]
    async fn records_are_kept_in_arrival_order() {
        let sink = InMemoryAuditSink::new();
        sink.log(AuditRecord::new(None, actions::STOCK_ADJUSTED, json!({"delta": -4})))
            .await
            .unwrap();
        sink.log(AuditRecord::new(None, actions::ISSUE_CREATED, json!({})))
            .await
            .unwrap();

        let all = sink.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].action, actions::STOCK_ADJUSTED);
        assert_eq!(all[1].action, actions::ISSUE_CREATED);
        assert_eq!(sink.by_action(actions::ISSUE_CREATED).len(), 1);
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn log(&self, _record: AuditRecord) -> Result<(), AuditError> {
            Err(AuditError::Sink("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn best_effort_logging_swallows_sink_failure() {
        // Must not panic or propagate.
        log_best_effort(
            &FailingSink,
            AuditRecord::new(None, actions::STOCK_ADJUSTED, json!({})),
        )
        .await;
    }
}
