//! End-to-end tests over the in-memory engine: the full mutation paths,
//! their failure modes, and behavior under concurrent callers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use stockroom_audit::{actions, AuditError, AuditRecord, AuditSink, InMemoryAuditSink};
use stockroom_core::{ActorId, ItemId, OfficeId, RequestId};
use stockroom_directory::{
    InMemoryOfficeDirectory, InMemoryRequestDirectory, Office, OfficeDirectory, RequestDirectory,
};
use stockroom_stock::{DraftLine, IssueDraft, RequestRecord, RequestStatus, ReturnDraft, StockLevel};

use crate::engine::{EngineError, InMemoryStockEngine, StockMutation};

struct Fixture {
    engine: Arc<InMemoryStockEngine>,
    requests: Arc<InMemoryRequestDirectory>,
    audit: Arc<InMemoryAuditSink>,
    office_id: OfficeId,
    office_name: String,
}

impl Fixture {
    fn new() -> Self {
        let requests = Arc::new(InMemoryRequestDirectory::new());
        let offices = Arc::new(InMemoryOfficeDirectory::new());
        let audit = Arc::new(InMemoryAuditSink::new());

        let office_id = OfficeId::new();
        let office_name = "London".to_string();
        offices.insert(Office {
            id: office_id,
            name: office_name.clone(),
            location: Some("1 Embankment".to_string()),
        });

        let engine = Arc::new(InMemoryStockEngine::new(
            requests.clone() as Arc<dyn RequestDirectory>,
            offices as Arc<dyn OfficeDirectory>,
            audit.clone() as Arc<dyn AuditSink>,
        ));

        Self {
            engine,
            requests,
            audit,
            office_id,
            office_name,
        }
    }

    fn office_id(&self) -> OfficeId {
        self.office_id
    }

    fn request(&self, status: RequestStatus) -> RequestId {
        let id = RequestId::new();
        self.requests.insert(RequestRecord {
            id,
            status,
            office_name: self.office_name.clone(),
        });
        id
    }

    async fn stock(&self, item_id: ItemId, quantity: i64) {
        self.engine
            .create_stock_level(StockLevel {
                item_id,
                office_id: self.office_id(),
                quantity,
                reorder_threshold: None,
            })
            .await
            .unwrap();
    }

    async fn quantity(&self, item_id: ItemId) -> i64 {
        self.engine
            .stock_level(item_id, self.office_id())
            .await
            .unwrap()
            .unwrap()
            .quantity
    }
}

fn line(item_id: ItemId, quantity: i64) -> DraftLine {
    DraftLine { item_id, quantity }
}

#[tokio::test]
async fn issue_decrements_stock_and_audits() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 10).await;
    let request_id = fx.request(RequestStatus::Approved);

    let issue = fx
        .engine
        .create_issue(IssueDraft::new(request_id, vec![line(item, 4)]), ActorId::new())
        .await
        .unwrap();

    assert_eq!(issue.request_id, request_id);
    assert_eq!(issue.lines.len(), 1);
    assert_eq!(fx.quantity(item).await, 6);

    let adjusted = fx.audit.by_action(actions::STOCK_ADJUSTED);
    assert_eq!(adjusted.len(), 1);
    assert_eq!(adjusted[0].payload["delta"], json!(-4));
    assert_eq!(fx.audit.by_action(actions::ISSUE_CREATED).len(), 1);
}

#[tokio::test]
async fn second_issue_for_same_request_conflicts_without_double_decrement() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 10).await;
    let request_id = fx.request(RequestStatus::Approved);

    let first = fx
        .engine
        .create_issue(IssueDraft::new(request_id, vec![line(item, 4)]), ActorId::new())
        .await
        .unwrap();

    let err = fx
        .engine
        .create_issue(IssueDraft::new(request_id, vec![line(item, 4)]), ActorId::new())
        .await
        .unwrap_err();
    match err {
        EngineError::Conflict(msg) => assert!(msg.contains("already issued")),
        other => panic!("expected Conflict, got {other:?}"),
    }

    // The caller resolves the conflict to the original issue; stock moved once.
    assert_eq!(fx.quantity(item).await, 6);
    let existing = fx.engine.issue_by_request(request_id).await.unwrap().unwrap();
    assert_eq!(existing.id, first.id);
}

#[tokio::test]
async fn returns_are_bounded_by_issued_quantity() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 10).await;
    let request_id = fx.request(RequestStatus::Approved);

    let issue = fx
        .engine
        .create_issue(IssueDraft::new(request_id, vec![line(item, 4)]), ActorId::new())
        .await
        .unwrap();
    assert_eq!(fx.quantity(item).await, 6);

    let ret = fx
        .engine
        .create_return(ReturnDraft::new(issue.id, vec![line(item, 3)]), ActorId::new())
        .await
        .unwrap();
    assert_eq!(ret.issue_id, issue.id);
    assert_eq!(fx.quantity(item).await, 9);

    // 3 already returned; 2 more would exceed the 4 issued.
    let err = fx
        .engine
        .create_return(ReturnDraft::new(issue.id, vec![line(item, 2)]), ActorId::new())
        .await
        .unwrap_err();
    match err {
        EngineError::Validation(msg) => assert!(msg.contains("exceeds issued")),
        other => panic!("expected Validation, got {other:?}"),
    }
    assert_eq!(fx.quantity(item).await, 9);

    let returns = fx.engine.returns_by_issue(issue.id).await.unwrap();
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0].id, ret.id);
}

#[tokio::test]
async fn multiple_partial_returns_up_to_the_bound() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 10).await;
    let request_id = fx.request(RequestStatus::Approved);

    let issue = fx
        .engine
        .create_issue(IssueDraft::new(request_id, vec![line(item, 4)]), ActorId::new())
        .await
        .unwrap();

    for qty in [1, 2, 1] {
        fx.engine
            .create_return(ReturnDraft::new(issue.id, vec![line(item, qty)]), ActorId::new())
            .await
            .unwrap();
    }
    assert_eq!(fx.quantity(item).await, 10);

    // Fully returned; one more unit must be rejected.
    assert!(fx
        .engine
        .create_return(ReturnDraft::new(issue.id, vec![line(item, 1)]), ActorId::new())
        .await
        .is_err());

    let returns = fx.engine.returns_by_issue(issue.id).await.unwrap();
    assert_eq!(returns.len(), 3);
    // Ascending by returned_at.
    assert!(returns.windows(2).all(|w| w[0].returned_at <= w[1].returned_at));
}

#[tokio::test]
async fn insufficient_stock_rejects_the_issue_and_leaves_quantity_unchanged() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 2).await;
    let request_id = fx.request(RequestStatus::Approved);

    let err = fx
        .engine
        .create_issue(IssueDraft::new(request_id, vec![line(item, 5)]), ActorId::new())
        .await
        .unwrap_err();
    match err {
        EngineError::InsufficientStock(_) => {}
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(fx.quantity(item).await, 2);
    assert!(fx.engine.issue_by_request(request_id).await.unwrap().is_none());
}

#[tokio::test]
async fn unapproved_request_is_rejected_before_any_mutation() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 10).await;

    for status in [RequestStatus::Pending, RequestStatus::Rejected] {
        let request_id = fx.request(status);
        let err = fx
            .engine
            .create_issue(IssueDraft::new(request_id, vec![line(item, 4)]), ActorId::new())
            .await
            .unwrap_err();
        match err {
            EngineError::InvalidState(msg) => assert!(msg.contains("not approved")),
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }
    assert_eq!(fx.quantity(item).await, 10);
}

#[tokio::test]
async fn multi_line_issue_is_all_or_nothing() {
    let fx = Fixture::new();
    let plentiful = ItemId::new();
    let scarce = ItemId::new();
    fx.stock(plentiful, 100).await;
    fx.stock(scarce, 1).await;
    let request_id = fx.request(RequestStatus::Approved);

    let err = fx
        .engine
        .create_issue(
            IssueDraft::new(request_id, vec![line(plentiful, 10), line(scarce, 5)]),
            ActorId::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));

    // Neither line's decrement survived.
    assert_eq!(fx.quantity(plentiful).await, 100);
    assert_eq!(fx.quantity(scarce).await, 1);
}

#[tokio::test]
async fn missing_request_office_and_ledger_row_are_not_found() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 10).await;

    // Unknown request.
    let err = fx
        .engine
        .create_issue(IssueDraft::new(RequestId::new(), vec![line(item, 1)]), ActorId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // Request referencing an office nobody knows.
    let orphan = RequestId::new();
    fx.requests.insert(RequestRecord {
        id: orphan,
        status: RequestStatus::Approved,
        office_name: "Atlantis".to_string(),
    });
    let err = fx
        .engine
        .create_issue(IssueDraft::new(orphan, vec![line(item, 1)]), ActorId::new())
        .await
        .unwrap_err();
    match err {
        EngineError::NotFound(msg) => assert!(msg.contains("Atlantis")),
        other => panic!("expected NotFound, got {other:?}"),
    }

    // Item with no ledger row at the office.
    let request_id = fx.request(RequestStatus::Approved);
    let err = fx
        .engine
        .create_issue(IssueDraft::new(request_id, vec![line(ItemId::new(), 1)]), ActorId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn non_positive_and_empty_lines_are_validation_errors() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 10).await;
    let request_id = fx.request(RequestStatus::Approved);

    for lines in [vec![], vec![line(item, 0)], vec![line(item, -2)]] {
        let err = fx
            .engine
            .create_issue(IssueDraft::new(request_id, lines), ActorId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
    assert_eq!(fx.quantity(item).await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issues_never_drive_stock_negative() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 10).await;

    // Eight approved requests of 3 units each race over 10 units: at most
    // three can succeed.
    let requests: Vec<RequestId> = (0..8).map(|_| fx.request(RequestStatus::Approved)).collect();

    let mut handles = Vec::new();
    for request_id in requests {
        let engine = fx.engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_issue(IssueDraft::new(request_id, vec![line(item, 3)]), ActorId::new())
                .await
        }));
    }

    let mut successes = 0i64;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(EngineError::InsufficientStock(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let remaining = fx.quantity(item).await;
    assert_eq!(remaining, 10 - successes * 3);
    assert!(remaining >= 0);
    assert_eq!(successes, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_issue_has_a_single_winner() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 10).await;
    let request_id = fx.request(RequestStatus::Approved);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = fx.engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_issue(IssueDraft::new(request_id, vec![line(item, 4)]), ActorId::new())
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(EngineError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(fx.quantity(item).await, 6);
}

struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn log(&self, _record: AuditRecord) -> Result<(), AuditError> {
        Err(AuditError::Sink("audit backend down".to_string()))
    }
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_mutation() {
    let requests = Arc::new(InMemoryRequestDirectory::new());
    let offices = Arc::new(InMemoryOfficeDirectory::new());
    let office_id = OfficeId::new();
    offices.insert(Office {
        id: office_id,
        name: "London".to_string(),
        location: None,
    });

    let engine = InMemoryStockEngine::new(
        requests.clone() as Arc<dyn RequestDirectory>,
        offices as Arc<dyn OfficeDirectory>,
        Arc::new(FailingAuditSink) as Arc<dyn AuditSink>,
    );

    let item = ItemId::new();
    engine
        .create_stock_level(StockLevel {
            item_id: item,
            office_id,
            quantity: 10,
            reorder_threshold: None,
        })
        .await
        .unwrap();

    let request_id = RequestId::new();
    requests.insert(RequestRecord {
        id: request_id,
        status: RequestStatus::Approved,
        office_name: "London".to_string(),
    });

    let issue = engine
        .create_issue(IssueDraft::new(request_id, vec![line(item, 4)]), ActorId::new())
        .await
        .unwrap();
    assert_eq!(issue.lines.len(), 1);
    assert_eq!(
        engine.stock_level(item, office_id).await.unwrap().unwrap().quantity,
        6
    );
}

#[tokio::test]
async fn duplicate_stock_level_provisioning_conflicts() {
    let fx = Fixture::new();
    let item = ItemId::new();
    fx.stock(item, 5).await;

    let err = fx
        .engine
        .create_stock_level(StockLevel {
            item_id: item,
            office_id: fx.office_id(),
            quantity: 1,
            reorder_threshold: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}
