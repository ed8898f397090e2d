//! Postgres-backed request/office directories.
//!
//! These read collaborator-owned tables; the engine never writes them.
//! Status strings are parsed into the closed [`RequestStatus`] enumeration
//! here, at the boundary — an unknown stored value is corrupt data, not a
//! client error.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use stockroom_core::{OfficeId, RequestId};
use stockroom_directory::{DirectoryError, OfficeDirectory, RequestDirectory};
use stockroom_stock::{RequestRecord, RequestStatus};

#[derive(Debug, Clone)]
pub struct PostgresRequestDirectory {
    pool: Arc<PgPool>,
}

impl PostgresRequestDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl RequestDirectory for PostgresRequestDirectory {
    async fn find(&self, id: RequestId) -> Result<Option<RequestRecord>, DirectoryError> {
        let row = sqlx::query(
            "SELECT request_id, status, office_name FROM requests WHERE request_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| DirectoryError::Storage(format!("load_request: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let request_id: Uuid = row
            .try_get("request_id")
            .map_err(|e| DirectoryError::Storage(format!("read request_id: {e}")))?;
        let status: String = row
            .try_get("status")
            .map_err(|e| DirectoryError::Storage(format!("read status: {e}")))?;
        let office_name: String = row
            .try_get("office_name")
            .map_err(|e| DirectoryError::Storage(format!("read office_name: {e}")))?;

        let status = RequestStatus::parse(&status).map_err(|e| {
            DirectoryError::Corrupt(format!("request {request_id} has bad status: {e}"))
        })?;

        Ok(Some(RequestRecord {
            id: RequestId::from_uuid(request_id),
            status,
            office_name,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct PostgresOfficeDirectory {
    pool: Arc<PgPool>,
}

impl PostgresOfficeDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl OfficeDirectory for PostgresOfficeDirectory {
    async fn resolve_by_name(&self, name: &str) -> Result<Option<OfficeId>, DirectoryError> {
        let row = sqlx::query("SELECT office_id FROM offices WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| DirectoryError::Storage(format!("resolve_office: {e}")))?;

        match row {
            Some(row) => {
                let office_id: Uuid = row
                    .try_get("office_id")
                    .map_err(|e| DirectoryError::Storage(format!("read office_id: {e}")))?;
                Ok(Some(OfficeId::from_uuid(office_id)))
            }
            None => Ok(None),
        }
    }
}
