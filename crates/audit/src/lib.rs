//! Audit port: a durable, best-effort record of every stock mutation.
//!
//! The sink is fire-and-forget from the engine's perspective: a failed audit
//! write must never abort a committed business transaction, but it must stay
//! observable — `log_best_effort` swallows the failure after emitting a
//! `tracing` warning.

pub mod in_memory;
pub mod record;
pub mod sink;
pub mod tracing_sink;

pub use in_memory::InMemoryAuditSink;
pub use record::AuditRecord;
pub use sink::{log_best_effort, AuditError, AuditSink};
pub use tracing_sink::TracingAuditSink;

/// Audit action names.
pub mod actions {
    /// One record per atomic ledger adjustment.
    pub const STOCK_ADJUSTED: &str = "stock.adjusted";
    /// Aggregate-level event after an issue commits.
    pub const ISSUE_CREATED: &str = "stock.issue_created";
    /// Aggregate-level event after a return commits.
    pub const RETURN_CREATED: &str = "stock.return_created";
}
