use async_trait::async_trait;
use thiserror::Error;

use stockroom_core::{ActorId, DomainError, IssueId, ItemId, OfficeId, RequestId, ReturnId};
use stockroom_directory::DirectoryError;
use stockroom_stock::{Issue, IssueDraft, Return, ReturnDraft, StockLevel};

/// Engine operation error.
///
/// The boundary taxonomy: every variant except `Storage` is a deterministic
/// client-visible outcome with a human-readable reason. `Storage` wraps
/// unexpected persistence failures and is surfaced as an opaque server
/// error — the detail is logged, never leaked.
///
/// `Conflict` on `create_issue` is special: the request already has an
/// Issue, and the caller should resolve it by fetching the existing one
/// rather than treating it as a hard failure. That makes issue creation
/// effectively idempotent per request.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    /// A business-rule precondition failed (e.g. request not approved).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Duplicate/idempotent resource (e.g. request already issued).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input (non-positive quantity, over-return, empty lines).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The ledger guard rejected a decrement. Not retried: the caller's
    /// requested quantity cannot be silently reduced.
    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    /// Unexpected persistence failure. Opaque at the boundary.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => EngineError::Validation(msg),
            DomainError::InvalidState(msg) => EngineError::InvalidState(msg),
            DomainError::NotFound(msg) => EngineError::NotFound(msg),
            DomainError::Conflict(msg) => EngineError::Conflict(msg),
            DomainError::InsufficientStock(msg) => EngineError::InsufficientStock(msg),
            DomainError::InvalidId(msg) => EngineError::Validation(msg),
        }
    }
}

impl From<DirectoryError> for EngineError {
    fn from(value: DirectoryError) -> Self {
        EngineError::Storage(value.to_string())
    }
}

/// The stock mutation engine.
///
/// Converts an approved request into an Issue (decrement) and an Issue into
/// Returns (bounded increments), inside one transaction per operation.
///
/// ## Guarantees
///
/// - **No negative stock**: every quantity change flows through the atomic
///   adjustment path; a decrement that would underflow aborts the whole
///   operation.
/// - **One issue per request**: a second `create_issue` for the same
///   request fails with `Conflict` and never double-decrements.
/// - **Bounded returns**: per item, returned quantities across all Returns
///   for an issue never exceed the issued quantities.
/// - **All-or-nothing**: a failing line aborts every line's stock change.
///
/// ## Implementations
///
/// - [`PostgresStockEngine`](super::PostgresStockEngine): production. The
///   conditional row update is the concurrency primitive; the unique index
///   on `issues.request_id` breaks duplicate-issue races.
/// - [`InMemoryStockEngine`](super::InMemoryStockEngine): tests/dev. Same
///   semantics behind a single mutex.
#[async_trait]
pub trait StockMutation: Send + Sync {
    /// Issue stock against an approved request. All-or-nothing across lines.
    async fn create_issue(&self, draft: IssueDraft, actor: ActorId) -> Result<Issue, EngineError>;

    /// Return stock against an existing issue, bounded by what was issued.
    async fn create_return(&self, draft: ReturnDraft, actor: ActorId)
        -> Result<Return, EngineError>;

    async fn issue(&self, id: IssueId) -> Result<Option<Issue>, EngineError>;

    async fn issue_by_request(&self, request_id: RequestId)
        -> Result<Option<Issue>, EngineError>;

    async fn return_record(&self, id: ReturnId) -> Result<Option<Return>, EngineError>;

    /// All returns for an issue, `returned_at` ascending.
    async fn returns_by_issue(&self, issue_id: IssueId) -> Result<Vec<Return>, EngineError>;

    /// Provision a ledger row. Fails with `Conflict` if the `(item, office)`
    /// pairing already exists.
    async fn create_stock_level(&self, level: StockLevel) -> Result<StockLevel, EngineError>;

    async fn stock_level(
        &self,
        item_id: ItemId,
        office_id: OfficeId,
    ) -> Result<Option<StockLevel>, EngineError>;

    async fn list_stock_levels(&self) -> Result<Vec<StockLevel>, EngineError>;
}
