use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{ActorId, DomainError, IssueId, ItemId, ReturnId};

use crate::issue::{validate_lines, DraftLine, Issue};

/// Caller intent for `create_return`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnDraft {
    pub issue_id: IssueId,
    pub lines: Vec<DraftLine>,
}

impl ReturnDraft {
    pub fn new(issue_id: IssueId, lines: Vec<DraftLine>) -> Self {
        Self { issue_id, lines }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_lines(&self.lines)
    }
}

/// Line of a persisted return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLine {
    pub item_id: ItemId,
    pub quantity: i64,
}

/// Aggregate: the record of stock incremented back after an issue.
///
/// Multiple partial returns may reference one issue; together they never
/// exceed what that issue handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Return {
    pub id: ReturnId,
    pub issue_id: IssueId,
    pub returned_by: ActorId,
    pub returned_at: DateTime<Utc>,
    pub lines: Vec<ReturnLine>,
}

impl Return {
    /// Total quantity returned for one item across all lines.
    pub fn returned_quantity(&self, item_id: ItemId) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.item_id == item_id)
            .map(|l| l.quantity)
            .sum()
    }
}

/// Sum the already-returned quantities per item across prior returns.
pub fn returned_so_far(prior: &[Return]) -> HashMap<ItemId, i64> {
    let mut totals = HashMap::new();
    for ret in prior {
        for line in &ret.lines {
            *totals.entry(line.item_id).or_insert(0) += line.quantity;
        }
    }
    totals
}

/// The over-return bound: for every drafted line,
/// `already_returned + quantity <= issued` must hold.
///
/// `already_returned` must cover all prior returns for the issue — the
/// engine computes it inside the same transaction that will apply the
/// increments, so two racing returns cannot jointly exceed the bound.
pub fn ensure_return_within_issued(
    issue: &Issue,
    already_returned: &HashMap<ItemId, i64>,
    lines: &[DraftLine],
) -> Result<(), DomainError> {
    // Accumulate within the draft too: two lines for the same item must not
    // slip past the bound individually.
    let mut drafted: HashMap<ItemId, i64> = HashMap::new();
    for line in lines {
        let issued = issue.issued_quantity(line.item_id);
        let already = already_returned.get(&line.item_id).copied().unwrap_or(0);
        let pending = drafted.entry(line.item_id).or_insert(0);
        if already + *pending + line.quantity > issued {
            return Err(DomainError::validation(format!(
                "return exceeds issued quantity for item {}",
                line.item_id
            )));
        }
        *pending += line.quantity;
    }
    Ok(())
}
