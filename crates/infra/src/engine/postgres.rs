//! Postgres-backed stock mutation engine.
//!
//! Every Issue/Return runs inside one database transaction; dropping the
//! transaction (error path or caller cancellation) rolls it back, so no
//! partial ledger mutation survives a failure.
//!
//! ## Concurrency
//!
//! No in-process locks. The conditional `UPDATE` on `stock_levels` is the
//! concurrency primitive: the row matches only if the delta is an increment
//! or the current quantity covers the decrement, so a racing decrement that
//! would go negative observes zero rows affected and the transaction
//! aborts. The unique index on `issues.request_id` breaks duplicate-issue
//! races — exactly one insert commits, the loser maps to `Conflict`.
//! Concurrent returns for one issue serialize on a `SELECT ... FOR UPDATE`
//! of the issue row, so they cannot jointly exceed the issued quantities.
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | EngineError |
//! |------------|---------------|-------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Storage` |
//! | Pool/connection failures | n/a | `Storage` |

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use stockroom_audit::{actions, log_best_effort, AuditRecord, AuditSink};
use stockroom_core::{ActorId, IssueId, ItemId, OfficeId, RequestId, ReturnId};
use stockroom_directory::{OfficeDirectory, RequestDirectory};
use stockroom_stock::{
    Adjustment, Issue, IssueDraft, IssueLine, Return, ReturnDraft, ReturnLine, StockLevel,
};

use super::r#trait::{EngineError, StockMutation};

/// Production engine over a sqlx connection pool.
///
/// Request/office lookups go through the injected directories (collaborator
/// reads, outside the mutation transaction); the audit sink is flushed
/// best-effort after commit so audit failure can never roll back a
/// committed mutation.
#[derive(Clone)]
pub struct PostgresStockEngine {
    pool: Arc<PgPool>,
    requests: Arc<dyn RequestDirectory>,
    offices: Arc<dyn OfficeDirectory>,
    audit: Arc<dyn AuditSink>,
}

impl PostgresStockEngine {
    pub fn new(
        pool: PgPool,
        requests: Arc<dyn RequestDirectory>,
        offices: Arc<dyn OfficeDirectory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            pool: Arc::new(pool),
            requests,
            offices,
            audit,
        }
    }

    #[instrument(skip(self, draft), fields(request_id = %draft.request_id), err)]
    pub async fn create_issue(
        &self,
        draft: IssueDraft,
        actor: ActorId,
    ) -> Result<Issue, EngineError> {
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // One issue per request. The unique index is the authoritative
        // tie-breaker under races; this pre-check gives the common case a
        // clean error without burning the insert.
        let existing = sqlx::query("SELECT 1 FROM issues WHERE request_id = $1")
            .bind(draft.request_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("check_existing_issue", e))?;
        if existing.is_some() {
            return Err(EngineError::Conflict(format!(
                "request {} already issued",
                draft.request_id
            )));
        }

        // Decrement per line, in submitted order. Any failure drops the
        // transaction and rolls everything back.
        let mut audits = Vec::with_capacity(draft.lines.len() + 1);
        for line in &draft.lines {
            let adjustment = Adjustment::new(
                line.item_id,
                office_id,
                -line.quantity,
                format!("Issue for request {}", draft.request_id),
            );
            adjust_in_tx(&mut tx, &adjustment).await?;
            audits.push(adjustment_audit(&adjustment));
        }

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

        sqlx::query(
            r#"
            INSERT INTO issues (issue_id, request_id, issued_by, issued_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(issue.id.as_uuid())
        .bind(issue.request_id.as_uuid())
        .bind(issue.issued_by.as_uuid())
        .bind(issue.issued_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                EngineError::Conflict(format!("request {} already issued", draft.request_id))
            } else {
                map_sqlx_error("insert_issue", e)
            }
        })?;

        insert_issue_lines(&mut tx, issue.id, &issue.lines).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        audits.push(AuditRecord::new(
            Some(actor),
            actions::ISSUE_CREATED,
            json!({
                "issue_id": issue.id,
                "request_id": issue.request_id,
                "lines": &issue.lines,
            }),
        ));
        for record in audits {
            log_best_effort(&*self.audit, record).await;
        }

        Ok(issue)
    }

    #[instrument(skip(self, draft), fields(issue_id = %draft.issue_id), err)]
    pub async fn create_return(
        &self,
        draft: ReturnDraft,
        actor: ActorId,
    ) -> Result<Return, EngineError> {
        draft.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Lock the issue row: concurrent returns for one issue serialize
        // here, so the over-return bound holds under races.
        let issue = load_issue_for_update(&mut tx, draft.issue_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("issue {} not found", draft.issue_id)))?;

        let request = self
            .requests
            .find(issue.request_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("request {} not found for issue", issue.request_id))
            })?;

        let office_id = self
            .offices
            .resolve_by_name(&request.office_name)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("office '{}' not found", request.office_name))
            })?;

        let already = returned_so_far_in_tx(&mut tx, issue.id).await?;
        stockroom_stock::ensure_return_within_issued(&issue, &already, &draft.lines)?;

        let mut audits = Vec::with_capacity(draft.lines.len() + 1);
        for line in &draft.lines {
            let adjustment = Adjustment::new(
                line.item_id,
                office_id,
                line.quantity,
                format!("Return for issue {}", issue.id),
            );
            adjust_in_tx(&mut tx, &adjustment).await?;
            audits.push(adjustment_audit(&adjustment));
        }

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

        sqlx::query(
            r#"
            INSERT INTO returns (return_id, issue_id, returned_by, returned_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(ret.id.as_uuid())
        .bind(ret.issue_id.as_uuid())
        .bind(ret.returned_by.as_uuid())
        .bind(ret.returned_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_return", e))?;

        insert_return_lines(&mut tx, ret.id, &ret.lines).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        audits.push(AuditRecord::new(
            Some(actor),
            actions::RETURN_CREATED,
            json!({
                "return_id": ret.id,
                "issue_id": ret.issue_id,
                "lines": &ret.lines,
            }),
        ));
        for record in audits {
            log_best_effort(&*self.audit, record).await;
        }

        Ok(ret)
    }

    #[instrument(skip(self), fields(issue_id = %id), err)]
    pub async fn issue(&self, id: IssueId) -> Result<Option<Issue>, EngineError> {
        let row = sqlx::query(
            "SELECT issue_id, request_id, issued_by, issued_at FROM issues WHERE issue_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_issue", e))?;

        match row {
            Some(row) => Ok(Some(self.assemble_issue(row).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(request_id = %request_id), err)]
    pub async fn issue_by_request(
        &self,
        request_id: RequestId,
    ) -> Result<Option<Issue>, EngineError> {
        let row = sqlx::query(
            "SELECT issue_id, request_id, issued_by, issued_at FROM issues WHERE request_id = $1",
        )
        .bind(request_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_issue_by_request", e))?;

        match row {
            Some(row) => Ok(Some(self.assemble_issue(row).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(return_id = %id), err)]
    pub async fn return_record(&self, id: ReturnId) -> Result<Option<Return>, EngineError> {
        let row = sqlx::query(
            "SELECT return_id, issue_id, returned_by, returned_at FROM returns WHERE return_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_return", e))?;

        match row {
            Some(row) => Ok(Some(self.assemble_return(row).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(issue_id = %issue_id), err)]
    pub async fn returns_by_issue(&self, issue_id: IssueId) -> Result<Vec<Return>, EngineError> {
        let rows = sqlx::query(
            r#"
            SELECT return_id, issue_id, returned_by, returned_at
            FROM returns
            WHERE issue_id = $1
            ORDER BY returned_at ASC, return_id ASC
            "#,
        )
        .bind(issue_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_returns_by_issue", e))?;

        let mut returns = Vec::with_capacity(rows.len());
        for row in rows {
            returns.push(self.assemble_return(row).await?);
        }
        Ok(returns)
    }

    #[instrument(skip(self, level), fields(item_id = %level.item_id, office_id = %level.office_id), err)]
    pub async fn create_stock_level(&self, level: StockLevel) -> Result<StockLevel, EngineError> {
        if level.quantity < 0 {
            return Err(EngineError::Validation(
                "initial quantity must not be negative".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO stock_levels (item_id, office_id, quantity, reorder_threshold)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(level.item_id.as_uuid())
        .bind(level.office_id.as_uuid())
        .bind(level.quantity)
        .bind(level.reorder_threshold)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                EngineError::Conflict(format!(
                    "stock level already exists for item {} at office {}",
                    level.item_id, level.office_id
                ))
            } else {
                map_sqlx_error("insert_stock_level", e)
            }
        })?;

        Ok(level)
    }

    #[instrument(skip(self), fields(item_id = %item_id, office_id = %office_id), err)]
    pub async fn stock_level(
        &self,
        item_id: ItemId,
        office_id: OfficeId,
    ) -> Result<Option<StockLevel>, EngineError> {
        let row = sqlx::query(
            r#"
            SELECT item_id, office_id, quantity, reorder_threshold
            FROM stock_levels
            WHERE item_id = $1 AND office_id = $2
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(office_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_stock_level", e))?;

        row.map(|r| {
            StockLevelRow::from_row(&r)
                .map(StockLevel::from)
                .map_err(|e| EngineError::Storage(format!("failed to decode stock level row: {e}")))
        })
        .transpose()
    }

    #[instrument(skip(self), err)]
    pub async fn list_stock_levels(&self) -> Result<Vec<StockLevel>, EngineError> {
        let rows = sqlx::query(
            r#"
            SELECT item_id, office_id, quantity, reorder_threshold
            FROM stock_levels
            ORDER BY item_id, office_id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_stock_levels", e))?;

        let mut levels = Vec::with_capacity(rows.len());
        for row in rows {
            let decoded = StockLevelRow::from_row(&row)
                .map_err(|e| EngineError::Storage(format!("failed to decode stock level row: {e}")))?;
            levels.push(decoded.into());
        }
        Ok(levels)
    }

    async fn assemble_issue(&self, row: PgRow) -> Result<Issue, EngineError> {
        let issue_row = IssueRow::from_row(&row)
            .map_err(|e| EngineError::Storage(format!("failed to decode issue row: {e}")))?;
        let lines = load_issue_lines(&*self.pool, IssueId::from_uuid(issue_row.issue_id)).await?;
        Ok(issue_row.into_issue(lines))
    }

    async fn assemble_return(&self, row: PgRow) -> Result<Return, EngineError> {
        let return_row = ReturnRow::from_row(&row)
            .map_err(|e| EngineError::Storage(format!("failed to decode return row: {e}")))?;
        let lines = load_return_lines(&*self.pool, ReturnId::from_uuid(return_row.return_id)).await?;
        Ok(return_row.into_return(lines))
    }
}

/// The atomic adjustment: one conditional write per ledger row.
///
/// The row matches only if `delta >= 0 OR quantity >= -delta`, so a
/// concurrent decrement that would drive the quantity negative is rejected,
/// not clamped. Zero rows affected is disambiguated into `InsufficientStock`
/// (row exists) or `NotFound` (pairing absent); neither is retried.
async fn adjust_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    adjustment: &Adjustment,
) -> Result<(), EngineError> {
    let result = sqlx::query(
        r#"
        UPDATE stock_levels
        SET quantity = quantity + $3
        WHERE item_id = $1 AND office_id = $2
          AND ($3 >= 0 OR quantity >= -$3)
        "#,
    )
    .bind(adjustment.item_id.as_uuid())
    .bind(adjustment.office_id.as_uuid())
    .bind(adjustment.delta)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("adjust_stock", e))?;

    if result.rows_affected() == 0 {
        let exists = sqlx::query(
            "SELECT 1 FROM stock_levels WHERE item_id = $1 AND office_id = $2",
        )
        .bind(adjustment.item_id.as_uuid())
        .bind(adjustment.office_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("probe_stock_level", e))?;

        return Err(if exists.is_some() {
            EngineError::InsufficientStock(format!(
                "insufficient stock for item {} at office {}",
                adjustment.item_id, adjustment.office_id
            ))
        } else {
            EngineError::NotFound(format!(
                "no stock level for item {} at office {}",
                adjustment.item_id, adjustment.office_id
            ))
        });
    }

    Ok(())
}

fn adjustment_audit(adjustment: &Adjustment) -> AuditRecord {
    AuditRecord::new(
        None,
        actions::STOCK_ADJUSTED,
        json!({
            "item_id": adjustment.item_id,
            "office_id": adjustment.office_id,
            "delta": adjustment.delta,
            "reason": adjustment.reason,
        }),
    )
}

async fn load_issue_for_update(
    tx: &mut Transaction<'_, Postgres>,
    issue_id: IssueId,
) -> Result<Option<Issue>, EngineError> {
    let row = sqlx::query(
        r#"
        SELECT issue_id, request_id, issued_by, issued_at
        FROM issues
        WHERE issue_id = $1
        FOR UPDATE
        "#,
    )
    .bind(issue_id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_issue", e))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let issue_row = IssueRow::from_row(&row)
        .map_err(|e| EngineError::Storage(format!("failed to decode issue row: {e}")))?;

    let line_rows = sqlx::query(
        "SELECT item_id, quantity FROM issue_lines WHERE issue_id = $1 ORDER BY line_no",
    )
    .bind(issue_id.as_uuid())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("load_issue_lines", e))?;

    let mut lines = Vec::with_capacity(line_rows.len());
    for row in line_rows {
        let decoded = LineRow::from_row(&row)
            .map_err(|e| EngineError::Storage(format!("failed to decode issue line: {e}")))?;
        lines.push(IssueLine {
            item_id: ItemId::from_uuid(decoded.item_id),
            quantity: decoded.quantity,
        });
    }

    Ok(Some(issue_row.into_issue(lines)))
}

/// Per-item sums of all prior returns for an issue, read inside the same
/// transaction that will apply the new increments.
async fn returned_so_far_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    issue_id: IssueId,
) -> Result<HashMap<ItemId, i64>, EngineError> {
    let rows = sqlx::query(
        r#"
        SELECT rl.item_id, CAST(SUM(rl.quantity) AS BIGINT) AS returned
        FROM return_lines rl
        JOIN returns r ON r.return_id = rl.return_id
        WHERE r.issue_id = $1
        GROUP BY rl.item_id
        "#,
    )
    .bind(issue_id.as_uuid())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("sum_prior_returns", e))?;

    let mut totals = HashMap::with_capacity(rows.len());
    for row in rows {
        let item_id: Uuid = row
            .try_get("item_id")
            .map_err(|e| EngineError::Storage(format!("failed to read item_id: {e}")))?;
        let returned: i64 = row
            .try_get("returned")
            .map_err(|e| EngineError::Storage(format!("failed to read returned sum: {e}")))?;
        totals.insert(ItemId::from_uuid(item_id), returned);
    }
    Ok(totals)
}

async fn insert_issue_lines(
    tx: &mut Transaction<'_, Postgres>,
    issue_id: IssueId,
    lines: &[IssueLine],
) -> Result<(), EngineError> {
    for (idx, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO issue_lines (issue_id, line_no, item_id, quantity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(issue_id.as_uuid())
        .bind((idx + 1) as i32)
        .bind(line.item_id.as_uuid())
        .bind(line.quantity)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_issue_line", e))?;
    }
    Ok(())
}

async fn insert_return_lines(
    tx: &mut Transaction<'_, Postgres>,
    return_id: ReturnId,
    lines: &[ReturnLine],
) -> Result<(), EngineError> {
    for (idx, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO return_lines (return_id, line_no, item_id, quantity)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(return_id.as_uuid())
        .bind((idx + 1) as i32)
        .bind(line.item_id.as_uuid())
        .bind(line.quantity)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_return_line", e))?;
    }
    Ok(())
}

async fn load_issue_lines(pool: &PgPool, issue_id: IssueId) -> Result<Vec<IssueLine>, EngineError> {
    let rows = sqlx::query(
        "SELECT item_id, quantity FROM issue_lines WHERE issue_id = $1 ORDER BY line_no",
    )
    .bind(issue_id.as_uuid())
    .fetch_all(pool)
    .await
    .map_err(|e| map_sqlx_error("load_issue_lines", e))?;

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let decoded = LineRow::from_row(&row)
            .map_err(|e| EngineError::Storage(format!("failed to decode issue line: {e}")))?;
        lines.push(IssueLine {
            item_id: ItemId::from_uuid(decoded.item_id),
            quantity: decoded.quantity,
        });
    }
    Ok(lines)
}

async fn load_return_lines(
    pool: &PgPool,
    return_id: ReturnId,
) -> Result<Vec<ReturnLine>, EngineError> {
    let rows = sqlx::query(
        "SELECT item_id, quantity FROM return_lines WHERE return_id = $1 ORDER BY line_no",
    )
    .bind(return_id.as_uuid())
    .fetch_all(pool)
    .await
    .map_err(|e| map_sqlx_error("load_return_lines", e))?;

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let decoded = LineRow::from_row(&row)
            .map_err(|e| EngineError::Storage(format!("failed to decode return line: {e}")))?;
        lines.push(ReturnLine {
            item_id: ItemId::from_uuid(decoded.item_id),
            quantity: decoded.quantity,
        });
    }
    Ok(lines)
}

/// Map SQLx errors to EngineError. Unique violations become `Conflict`
/// (duplicate issue / duplicate ledger row under a race); everything else
/// stays opaque.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EngineError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            if db_err.code().as_deref() == Some("23505") {
                EngineError::Conflict(msg)
            } else {
                EngineError::Storage(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            EngineError::Storage(format!("connection pool closed in {operation}"))
        }
        _ => EngineError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

// SQLx row types

#[derive(Debug)]
struct IssueRow {
    issue_id: Uuid,
    request_id: Uuid,
    issued_by: Uuid,
    issued_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for IssueRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(IssueRow {
            issue_id: row.try_get("issue_id")?,
            request_id: row.try_get("request_id")?,
            issued_by: row.try_get("issued_by")?,
            issued_at: row.try_get("issued_at")?,
        })
    }
}

impl IssueRow {
    fn into_issue(self, lines: Vec<IssueLine>) -> Issue {
        Issue {
            id: IssueId::from_uuid(self.issue_id),
            request_id: RequestId::from_uuid(self.request_id),
            issued_by: ActorId::from_uuid(self.issued_by),
            issued_at: self.issued_at,
            lines,
        }
    }
}

#[derive(Debug)]
struct ReturnRow {
    return_id: Uuid,
    issue_id: Uuid,
    returned_by: Uuid,
    returned_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ReturnRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ReturnRow {
            return_id: row.try_get("return_id")?,
            issue_id: row.try_get("issue_id")?,
            returned_by: row.try_get("returned_by")?,
            returned_at: row.try_get("returned_at")?,
        })
    }
}

impl ReturnRow {
    fn into_return(self, lines: Vec<ReturnLine>) -> Return {
        Return {
            id: ReturnId::from_uuid(self.return_id),
            issue_id: IssueId::from_uuid(self.issue_id),
            returned_by: ActorId::from_uuid(self.returned_by),
            returned_at: self.returned_at,
            lines,
        }
    }
}

#[derive(Debug)]
struct LineRow {
    item_id: Uuid,
    quantity: i64,
}

impl<'r> FromRow<'r, PgRow> for LineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LineRow {
            item_id: row.try_get("item_id")?,
            quantity: row.try_get("quantity")?,
        })
    }
}

#[derive(Debug)]
struct StockLevelRow {
    item_id: Uuid,
    office_id: Uuid,
    quantity: i64,
    reorder_threshold: Option<i64>,
}

impl<'r> FromRow<'r, PgRow> for StockLevelRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockLevelRow {
            item_id: row.try_get("item_id")?,
            office_id: row.try_get("office_id")?,
            quantity: row.try_get("quantity")?,
            reorder_threshold: row.try_get("reorder_threshold")?,
        })
    }
}

impl From<StockLevelRow> for StockLevel {
    fn from(row: StockLevelRow) -> Self {
        StockLevel {
            item_id: ItemId::from_uuid(row.item_id),
            office_id: OfficeId::from_uuid(row.office_id),
            quantity: row.quantity,
            reorder_threshold: row.reorder_threshold,
        }
    }
}

// Implement StockMutation by delegating to the inherent methods.

#[async_trait::async_trait]
impl StockMutation for PostgresStockEngine {
    async fn create_issue(&self, draft: IssueDraft, actor: ActorId) -> Result<Issue, EngineError> {
        PostgresStockEngine::create_issue(self, draft, actor).await
    }

    async fn create_return(
        &self,
        draft: ReturnDraft,
        actor: ActorId,
    ) -> Result<Return, EngineError> {
        PostgresStockEngine::create_return(self, draft, actor).await
    }

    async fn issue(&self, id: IssueId) -> Result<Option<Issue>, EngineError> {
        PostgresStockEngine::issue(self, id).await
    }

    async fn issue_by_request(
        &self,
        request_id: RequestId,
    ) -> Result<Option<Issue>, EngineError> {
        PostgresStockEngine::issue_by_request(self, request_id).await
    }

    async fn return_record(&self, id: ReturnId) -> Result<Option<Return>, EngineError> {
        PostgresStockEngine::return_record(self, id).await
    }

    async fn returns_by_issue(&self, issue_id: IssueId) -> Result<Vec<Return>, EngineError> {
        PostgresStockEngine::returns_by_issue(self, issue_id).await
    }

    async fn create_stock_level(&self, level: StockLevel) -> Result<StockLevel, EngineError> {
        PostgresStockEngine::create_stock_level(self, level).await
    }

    async fn stock_level(
        &self,
        item_id: ItemId,
        office_id: OfficeId,
    ) -> Result<Option<StockLevel>, EngineError> {
        PostgresStockEngine::stock_level(self, item_id, office_id).await
    }

    async fn list_stock_levels(&self) -> Result<Vec<StockLevel>, EngineError> {
        PostgresStockEngine::list_stock_levels(self).await
    }
}
