use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockroom_core::RequestId;
use stockroom_stock::RequestRecord;

use crate::DirectoryError;

/// Read-only lookup of stock requests by id.
#[async_trait]
pub trait RequestDirectory: Send + Sync {
    async fn find(&self, id: RequestId) -> Result<Option<RequestRecord>, DirectoryError>;
}

/// In-memory request directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryRequestDirectory {
    records: RwLock<HashMap<RequestId, RequestRecord>>,
}

impl InMemoryRequestDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: RequestRecord) {
        self.records
            .write()
            .expect("request directory lock poisoned")
            .insert(record.id, record);
    }
}

#[async_trait]
impl RequestDirectory for InMemoryRequestDirectory {
    async fn find(&self, id: RequestId) -> Result<Option<RequestRecord>, DirectoryError> {
        let records = self
            .records
            .read()
            .map_err(|_| DirectoryError::Storage("lock poisoned".to_string()))?;
        Ok(records.get(&id).cloned())
    }
}
