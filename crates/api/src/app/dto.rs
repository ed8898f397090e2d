use serde::Deserialize;
use uuid::Uuid;

use stockroom_core::{ItemId, OfficeId, RequestId};
use stockroom_stock::{DraftLine, Issue, IssueDraft, Return, ReturnDraft, StockLevel};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub item_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateIssueRequest {
    pub request_id: Uuid,
    pub lines: Vec<LineRequest>,
    /// Accepted for forward compatibility; the one-issue-per-request
    /// invariant is the idempotency guarantee.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReturnRequest {
    pub issue_id: Uuid,
    pub lines: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStockLevelRequest {
    pub item_id: Uuid,
    pub office_id: Uuid,
    pub quantity: i64,
    pub reorder_threshold: Option<i64>,
}

impl CreateIssueRequest {
    pub fn into_draft(self) -> IssueDraft {
        IssueDraft {
            request_id: RequestId::from_uuid(self.request_id),
            lines: self.lines.into_iter().map(LineRequest::into_line).collect(),
            idempotency_key: self.idempotency_key,
        }
    }
}

impl CreateReturnRequest {
    pub fn into_draft(self) -> ReturnDraft {
        ReturnDraft::new(
            self.issue_id.into(),
            self.lines.into_iter().map(LineRequest::into_line).collect(),
        )
    }
}

impl CreateStockLevelRequest {
    pub fn into_level(self) -> StockLevel {
        StockLevel {
            item_id: ItemId::from_uuid(self.item_id),
            office_id: OfficeId::from_uuid(self.office_id),
            quantity: self.quantity,
            reorder_threshold: self.reorder_threshold,
        }
    }
}

impl LineRequest {
    fn into_line(self) -> DraftLine {
        DraftLine {
            item_id: ItemId::from_uuid(self.item_id),
            quantity: self.quantity,
        }
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn issue_to_json(issue: &Issue) -> serde_json::Value {
    serde_json::json!({
        "id": issue.id.to_string(),
        "request_id": issue.request_id.to_string(),
        "issued_by": issue.issued_by.to_string(),
        "issued_at": issue.issued_at,
        "lines": issue.lines.iter().map(|l| serde_json::json!({
            "item_id": l.item_id.to_string(),
            "quantity": l.quantity,
        })).collect::<Vec<_>>(),
    })
}

pub fn return_to_json(ret: &Return) -> serde_json::Value {
    serde_json::json!({
        "id": ret.id.to_string(),
        "issue_id": ret.issue_id.to_string(),
        "returned_by": ret.returned_by.to_string(),
        "returned_at": ret.returned_at,
        "lines": ret.lines.iter().map(|l| serde_json::json!({
            "item_id": l.item_id.to_string(),
            "quantity": l.quantity,
        })).collect::<Vec<_>>(),
    })
}

pub fn stock_level_to_json(level: &StockLevel) -> serde_json::Value {
    serde_json::json!({
        "item_id": level.item_id.to_string(),
        "office_id": level.office_id.to_string(),
        "quantity": level.quantity,
        "reorder_threshold": level.reorder_threshold,
    })
}
