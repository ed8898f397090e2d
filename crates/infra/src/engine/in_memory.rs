//! In-memory stock mutation engine.
//!
//! Intended for tests/dev. Same semantics as the Postgres engine: the
//! mutation section of each operation is atomic (one mutex), directory
//! lookups happen before the lock is taken, and audit records are flushed
//! best-effort after the state change lands.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde_json::json;

use stockroom_audit::{actions, log_best_effort, AuditRecord, AuditSink};
use stockroom_core::{ActorId, IssueId, ItemId, OfficeId, RequestId, ReturnId};
use stockroom_directory::{OfficeDirectory, RequestDirectory};
use stockroom_stock::{
    apply_adjustment, ensure_return_within_issued, returned_so_far, Adjustment, Issue, IssueDraft,
    IssueLine, Return, ReturnDraft, ReturnLine, StockLevel,
};

use super::r#trait::{EngineError, StockMutation};

#[derive(Debug, Default)]
struct EngineState {
    stock: HashMap<(ItemId, OfficeId), StockLevel>,
    issues: HashMap<IssueId, Issue>,
    issue_by_request: HashMap<RequestId, IssueId>,
    returns: HashMap<ReturnId, Return>,
}

impl EngineState {
    /// Apply every line's delta or none. Quantities are staged first so a
    /// failing line leaves the ledger untouched.
    fn adjust_all(&mut self, adjustments: &[Adjustment]) -> Result<(), EngineError> {
        let mut staged: HashMap<(ItemId, OfficeId), i64> = HashMap::new();

        for adjustment in adjustments {
            let key = (adjustment.item_id, adjustment.office_id);
            let current = match staged.get(&key) {
                Some(q) => *q,
                None => {
                    self.stock
                        .get(&key)
                        .ok_or_else(|| {
                            EngineError::NotFound(format!(
                                "no stock level for item {} at office {}",
                                adjustment.item_id, adjustment.office_id
                            ))
                        })?
                        .quantity
                }
            };

            let next = apply_adjustment(current, adjustment.delta).map_err(|_| {
                EngineError::InsufficientStock(format!(
                    "insufficient stock for item {} at office {}",
                    adjustment.item_id, adjustment.office_id
                ))
            })?;
            staged.insert(key, next);
        }

        for (key, quantity) in staged {
            if let Some(level) = self.stock.get_mut(&key) {
                level.quantity = quantity;
            }
        }
        Ok(())
    }

    fn returns_for(&self, issue_id: IssueId) -> Vec<Return> {
        let mut prior: Vec<Return> = self
            .returns
            .values()
            .filter(|r| r.issue_id == issue_id)
            .cloned()
            .collect();
        prior.sort_by(|a, b| a.returned_at.cmp(&b.returned_at).then(a.id.cmp(&b.id)));
        prior
    }
}

/// Test/dev engine holding the ledger and aggregates behind one mutex.
pub struct InMemoryStockEngine {
    requests: Arc<dyn RequestDirectory>,
    offices: Arc<dyn OfficeDirectory>,
    audit: Arc<dyn AuditSink>,
    state: Mutex<EngineState>,
}

impl InMemoryStockEngine {
    pub fn new(
        requests: Arc<dyn RequestDirectory>,
        offices: Arc<dyn OfficeDirectory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            requests,
            offices,
            audit,
            state: Mutex::new(EngineState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, EngineState>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::Storage("engine state lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl StockMutation for InMemoryStockEngine {
    async fn create_issue(&self, draft: IssueDraft, actor: ActorId) -> Result<Issue, EngineError> {
        draft.validate()?;

        let request = self
            .requests
            .find(draft.request_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("request {} not found", draft.request_id)))?;

        if !request.status.is_approved() {
            return Err(EngineError::InvalidState(format!(
                "request {} is not approved",
                draft.request_id
            )));
        }

        let office_id = self
            .offices
            .resolve_by_name(&request.office_name)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("office '{}' not found", request.office_name))
            })?;

        let adjustments: Vec<Adjustment> = draft
            .lines
            .iter()
            .map(|l| {
                Adjustment::new(
                    l.item_id,
                    office_id,
                    -l.quantity,
                    format!("Issue for request {}", draft.request_id),
                )
            })
            .collect();

        // Mutation section: uniqueness check, adjustments and aggregate
        // insert are atomic under the state lock. No await in here.
        let issue = {
            let mut state = self.lock()?;

            if state.issue_by_request.contains_key(&draft.request_id) {
                return Err(EngineError::Conflict(format!(
                    "request {} already issued",
                    draft.request_id
                )));
            }

            state.adjust_all(&adjustments)?;

            let issue = Issue {
                id: IssueId::new(),
                request_id: draft.request_id,
                issued_by: actor,
                issued_at: Utc::now(),
                lines: draft
                    .lines
                    .iter()
                    .map(|l| IssueLine {
                        item_id: l.item_id,
                        quantity: l.quantity,
                    })
                    .collect(),
            };
            state.issue_by_request.insert(issue.request_id, issue.id);
            state.issues.insert(issue.id, issue.clone());
            issue
        };

        for adjustment in &adjustments {
            log_best_effort(
                &*self.audit,
                AuditRecord::new(
                    None,
                    actions::STOCK_ADJUSTED,
                    json!({
                        "item_id": adjustment.item_id,
                        "office_id": adjustment.office_id,
                        "delta": adjustment.delta,
                        "reason": adjustment.reason,
                    }),
                ),
            )
            .await;
        }
        log_best_effort(
            &*self.audit,
            AuditRecord::new(
                Some(actor),
                actions::ISSUE_CREATED,
                json!({
                    "issue_id": issue.id,
                    "request_id": issue.request_id,
                    "lines": &issue.lines,
                }),
            ),
        )
        .await;

        Ok(issue)
    }

    async fn create_return(
        &self,
        draft: ReturnDraft,
        actor: ActorId,
    ) -> Result<Return, EngineError> {
        draft.validate()?;

        // The issue's office comes from its originating request; both
        // lookups happen before the mutation section.
        let issue_snapshot = {
            let state = self.lock()?;
            state
                .issues
                .get(&draft.issue_id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound(format!("issue {} not found", draft.issue_id)))?
        };

        let request = self
            .requests
            .find(issue_snapshot.request_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!(
                    "request {} not found for issue",
                    issue_snapshot.request_id
                ))
            })?;

        let office_id = self
            .offices
            .resolve_by_name(&request.office_name)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("office '{}' not found", request.office_name))
            })?;

        let adjustments: Vec<Adjustment> = draft
            .lines
            .iter()
            .map(|l| {
                Adjustment::new(
                    l.item_id,
                    office_id,
                    l.quantity,
                    format!("Return for issue {}", draft.issue_id),
                )
            })
            .collect();

        let ret = {
            let mut state = self.lock()?;

            // Re-read under the lock; the over-return bound must see every
            // committed return.
            let issue = state
                .issues
                .get(&draft.issue_id)
                .cloned()
                .ok_or_else(|| EngineError::NotFound(format!("issue {} not found", draft.issue_id)))?;
            let already = returned_so_far(&state.returns_for(issue.id));
            ensure_return_within_issued(&issue, &already, &draft.lines)?;

            state.adjust_all(&adjustments)?;

            let ret = Return {
                id: ReturnId::new(),
                issue_id: issue.id,
                returned_by: actor,
                returned_at: Utc::now(),
                lines: draft
                    .lines
                    .iter()
                    .map(|l| ReturnLine {
                        item_id: l.item_id,
                        quantity: l.quantity,
                    })
                    .collect(),
            };
            state.returns.insert(ret.id, ret.clone());
            ret
        };

        for adjustment in &adjustments {
            log_best_effort(
                &*self.audit,
                AuditRecord::new(
                    None,
                    actions::STOCK_ADJUSTED,
                    json!({
                        "item_id": adjustment.item_id,
                        "office_id": adjustment.office_id,
                        "delta": adjustment.delta,
                        "reason": adjustment.reason,
                    }),
                ),
            )
            .await;
        }
        log_best_effort(
            &*self.audit,
            AuditRecord::new(
                Some(actor),
                actions::RETURN_CREATED,
                json!({
                    "return_id": ret.id,
                    "issue_id": ret.issue_id,
                    "lines": &ret.lines,
                }),
            ),
        )
        .await;

        Ok(ret)
    }

    async fn issue(&self, id: IssueId) -> Result<Option<Issue>, EngineError> {
        Ok(self.lock()?.issues.get(&id).cloned())
    }

    async fn issue_by_request(
        &self,
        request_id: RequestId,
    ) -> Result<Option<Issue>, EngineError> {
        let state = self.lock()?;
        Ok(state
            .issue_by_request
            .get(&request_id)
            .and_then(|id| state.issues.get(id))
            .cloned())
    }

    async fn return_record(&self, id: ReturnId) -> Result<Option<Return>, EngineError> {
        Ok(self.lock()?.returns.get(&id).cloned())
    }

    async fn returns_by_issue(&self, issue_id: IssueId) -> Result<Vec<Return>, EngineError> {
        Ok(self.lock()?.returns_for(issue_id))
    }

    async fn create_stock_level(&self, level: StockLevel) -> Result<StockLevel, EngineError> {
        if level.quantity < 0 {
            return Err(EngineError::Validation(
                "initial quantity must not be negative".to_string(),
            ));
        }

        let mut state = self.lock()?;
        let key = (level.item_id, level.office_id);
        if state.stock.contains_key(&key) {
            return Err(EngineError::Conflict(format!(
                "stock level already exists for item {} at office {}",
                level.item_id, level.office_id
            )));
        }
        state.stock.insert(key, level.clone());
        Ok(level)
    }

    async fn stock_level(
        &self,
        item_id: ItemId,
        office_id: OfficeId,
    ) -> Result<Option<StockLevel>, EngineError> {
        Ok(self.lock()?.stock.get(&(item_id, office_id)).cloned())
    }

    async fn list_stock_levels(&self) -> Result<Vec<StockLevel>, EngineError> {
        let state = self.lock()?;
        let mut levels: Vec<StockLevel> = state.stock.values().cloned().collect();
        levels.sort_by(|a, b| {
            (a.item_id, a.office_id).cmp(&(b.item_id, b.office_id))
        });
        Ok(levels)
    }
}
