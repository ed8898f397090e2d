use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{ActorId, DomainError, IssueId, ItemId, RequestId};

/// One line of a draft mutation: an item and a positive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    pub item_id: ItemId,
    pub quantity: i64,
}

/// Caller intent for `create_issue`.
///
/// `idempotency_key` is accepted for forward compatibility but not enforced:
/// the one-issue-per-request invariant is the authoritative idempotency
/// guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDraft {
    pub request_id: RequestId,
    pub lines: Vec<DraftLine>,
    pub idempotency_key: Option<String>,
}

impl IssueDraft {
    pub fn new(request_id: RequestId, lines: Vec<DraftLine>) -> Self {
        Self {
            request_id,
            lines,
            idempotency_key: None,
        }
    }

    /// Line-level validation, applied before any stock is touched.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_lines(&self.lines)
    }
}

/// Line of a persisted issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLine {
    pub item_id: ItemId,
    pub quantity: i64,
}

/// Aggregate: the record of stock decremented to fulfill an approved request.
///
/// At most one Issue exists per request. Immutable once created; returns
/// reference it but never modify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub request_id: RequestId,
    pub issued_by: ActorId,
    pub issued_at: DateTime<Utc>,
    pub lines: Vec<IssueLine>,
}

impl Issue {
    /// Total quantity issued for one item across all lines.
    pub fn issued_quantity(&self, item_id: ItemId) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.item_id == item_id)
            .map(|l| l.quantity)
            .sum()
    }
}

/// Shared line validation for issue and return drafts: non-empty, every
/// quantity strictly positive.
pub(crate) fn validate_lines(lines: &[DraftLine]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::validation("lines must not be empty"));
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be positive for item {}",
                line.item_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(lines: Vec<DraftLine>) -> IssueDraft {
        IssueDraft::new(RequestId::new(), lines)
    }

    #[test]
    fn valid_draft_passes() {
        let d = draft(vec![
            DraftLine { item_id: ItemId::new(), quantity: 4 },
            DraftLine { item_id: ItemId::new(), quantity: 1 },
        ]);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn empty_lines_are_rejected() {
        let err = draft(vec![]).validate().unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("empty")),
            _ => panic!("expected Validation"),
        }
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        for qty in [0, -3] {
            let d = draft(vec![DraftLine { item_id: ItemId::new(), quantity: qty }]);
            let err = d.validate().unwrap_err();
            match err {
                DomainError::Validation(msg) => assert!(msg.contains("positive")),
                _ => panic!("expected Validation"),
            }
        }
    }

    #[test]
    fn issued_quantity_sums_duplicate_item_lines() {
        let item = ItemId::new();
        let other = ItemId::new();
        let issue = Issue {
            id: IssueId::new(),
            request_id: RequestId::new(),
            issued_by: ActorId::new(),
            issued_at: Utc::now(),
            lines: vec![
                IssueLine { item_id: item, quantity: 3 },
                IssueLine { item_id: other, quantity: 5 },
                IssueLine { item_id: item, quantity: 2 },
            ],
        };
        assert_eq!(issue.issued_quantity(item), 5);
        assert_eq!(issue.issued_quantity(other), 5);
        assert_eq!(issue.issued_quantity(ItemId::new()), 0);
    }
}
