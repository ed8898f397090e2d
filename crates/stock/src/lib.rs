//! Stock domain model: the quantity ledger, Issue/Return aggregates and the
//! validation rules the mutation engine enforces.
//!
//! This crate is pure — no IO, no clocks beyond timestamps passed in by the
//! caller. The engine backends in `stockroom-infra` execute these rules
//! inside their transaction scopes.

pub mod issue;
pub mod ledger;
pub mod request;
pub mod returns;

pub use issue::{DraftLine, Issue, IssueDraft, IssueLine};
pub use ledger::{adjustment_permitted, apply_adjustment, Adjustment, StockLevel};
pub use request::{RequestRecord, RequestStatus};
pub use returns::{
    ensure_return_within_issued, returned_so_far, Return, ReturnDraft, ReturnLine,
};
