use std::sync::Arc;

use sqlx::PgPool;

use stockroom_audit::{AuditSink, InMemoryAuditSink};
use stockroom_directory::{
    InMemoryOfficeDirectory, InMemoryRequestDirectory, OfficeDirectory, RequestDirectory,
};
use stockroom_infra::engine::{InMemoryStockEngine, PostgresStockEngine, StockMutation};
use stockroom_infra::{schema, PostgresAuditSink, PostgresOfficeDirectory, PostgresRequestDirectory};

/// Wired application services.
///
/// The in-memory variant keeps handles to its directories and audit sink so
/// tests (and a dev process) can seed collaborator data directly — there are
/// no CRUD endpoints for requests/offices in this service, they belong to
/// the upstream system.
pub enum AppServices {
    InMemory {
        engine: Arc<dyn StockMutation>,
        requests: Arc<InMemoryRequestDirectory>,
        offices: Arc<InMemoryOfficeDirectory>,
        audit: Arc<InMemoryAuditSink>,
    },
    Persistent {
        engine: Arc<dyn StockMutation>,
    },
}

impl AppServices {
    pub fn engine(&self) -> &Arc<dyn StockMutation> {
        match self {
            AppServices::InMemory { engine, .. } => engine,
            AppServices::Persistent { engine } => engine,
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory() -> Self {
        let requests = Arc::new(InMemoryRequestDirectory::new());
        let offices = Arc::new(InMemoryOfficeDirectory::new());
        let audit = Arc::new(InMemoryAuditSink::new());

        let engine: Arc<dyn StockMutation> = Arc::new(InMemoryStockEngine::new(
            requests.clone() as Arc<dyn RequestDirectory>,
            offices.clone() as Arc<dyn OfficeDirectory>,
            audit.clone() as Arc<dyn AuditSink>,
        ));

        AppServices::InMemory {
            engine,
            requests,
            offices,
            audit,
        }
    }
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        build_persistent_services().await
    } else {
        AppServices::in_memory()
    }
}

async fn build_persistent_services() -> AppServices {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("failed to connect to Postgres");

    schema::ensure_schema(&pool)
        .await
        .expect("failed to apply database schema");

    let requests = Arc::new(PostgresRequestDirectory::new(pool.clone()));
    let offices = Arc::new(PostgresOfficeDirectory::new(pool.clone()));
    let audit = Arc::new(PostgresAuditSink::new(pool.clone()));

    let engine: Arc<dyn StockMutation> = Arc::new(PostgresStockEngine::new(
        pool,
        requests as Arc<dyn RequestDirectory>,
        offices as Arc<dyn OfficeDirectory>,
        audit as Arc<dyn AuditSink>,
    ));

    AppServices::Persistent { engine }
}
