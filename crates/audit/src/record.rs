use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stockroom_core::ActorId;

/// One audit entry: who did what, with a structured payload.
///
/// `actor_id` is `None` for records emitted by the adjustment path itself
/// (the enclosing operation carries the actor on its aggregate event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor_id: Option<ActorId>,
    pub action: String,
    pub payload: JsonValue,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(actor_id: Option<ActorId>, action: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            actor_id,
            action: action.into(),
            payload,
            recorded_at: Utc::now(),
        }
    }
}
