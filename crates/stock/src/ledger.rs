use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, ItemId, OfficeId};

/// Ledger row: the quantity of one item held at one office.
///
/// Identified by the unique pair `(item_id, office_id)`. The quantity is
/// mutated exclusively through the atomic adjustment path; `quantity >= 0`
/// is an invariant, not a convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub item_id: ItemId,
    pub office_id: OfficeId,
    pub quantity: i64,
    /// Optional low-stock threshold. Informational only; the engine never
    /// reads it.
    pub reorder_threshold: Option<i64>,
}

/// A single signed delta against one ledger row, with its audit annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub item_id: ItemId,
    pub office_id: OfficeId,
    pub delta: i64,
    pub reason: String,
}

impl Adjustment {
    pub fn new(item_id: ItemId, office_id: OfficeId, delta: i64, reason: impl Into<String>) -> Self {
        Self {
            item_id,
            office_id,
            delta,
            reason: reason.into(),
        }
    }
}

/// The ledger guard: a delta is admissible against the current quantity only
/// if it is an increment, or a decrement fully covered by stock on hand.
///
/// The Postgres backend encodes the same condition in its conditional
/// `UPDATE`; the in-memory backend calls this directly. Keeping the rule in
/// one place means the "no negative stock" invariant cannot drift between
/// backends.
pub fn adjustment_permitted(current: i64, delta: i64) -> bool {
    delta >= 0 || current >= -delta
}

/// Apply a delta to a quantity, enforcing the guard.
pub fn apply_adjustment(current: i64, delta: i64) -> Result<i64, DomainError> {
    if !adjustment_permitted(current, delta) {
        return Err(DomainError::insufficient_stock(format!(
            "quantity {current} cannot absorb delta {delta}"
        )));
    }
    Ok(current + delta)
}
