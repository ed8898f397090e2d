use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stockroom_core::OfficeId;

use crate::DirectoryError;

/// Narrow view of an office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub name: String,
    pub location: Option<String>,
}

/// Read-only office lookup.
///
/// Requests carry a free-text office name; this is the one place that name
/// is matched to an id. Matching is exact (the upstream system treats office
/// names as canonical).
#[async_trait]
pub trait OfficeDirectory: Send + Sync {
    async fn resolve_by_name(&self, name: &str) -> Result<Option<OfficeId>, DirectoryError>;
}

/// In-memory office directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOfficeDirectory {
    by_name: RwLock<HashMap<String, Office>>,
}

impl InMemoryOfficeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, office: Office) {
        self.by_name
            .write()
            .expect("office directory lock poisoned")
            .insert(office.name.clone(), office);
    }
}

#[async_trait]
impl OfficeDirectory for InMemoryOfficeDirectory {
    async fn resolve_by_name(&self, name: &str) -> Result<Option<OfficeId>, DirectoryError> {
        let offices = self
            .by_name
            .read()
            .map_err(|_| DirectoryError::Storage("lock poisoned".to_string()))?;
        Ok(offices.get(name).map(|o| o.id))
    }
}
