use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::{IssueId, RequestId};
use stockroom_infra::engine::EngineError;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_issue))
        .route("/:id", get(get_issue))
        .route("/:id/returns", get(get_issue_returns))
        .route("/by-request/:request_id", get(get_issue_by_request))
}

pub async fn create_issue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<crate::context::ActorContext>,
    Json(body): Json<dto::CreateIssueRequest>,
) -> axum::response::Response {
    let draft = body.into_draft();
    let request_id = draft.request_id;

    match services.engine().create_issue(draft, actor.actor_id()).await {
        Ok(issue) => (StatusCode::CREATED, Json(dto::issue_to_json(&issue))).into_response(),
        // Already issued: idempotent creation — resolve to the existing
        // issue instead of failing the caller.
        Err(EngineError::Conflict(msg)) => {
            match services.engine().issue_by_request(request_id).await {
                Ok(Some(existing)) => {
                    (StatusCode::OK, Json(dto::issue_to_json(&existing))).into_response()
                }
                Ok(None) => errors::json_error(StatusCode::CONFLICT, "conflict", msg),
                Err(e) => errors::engine_error_to_response(e),
            }
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_issue(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: IssueId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid issue id"),
    };

    match services.engine().issue(id).await {
        Ok(Some(issue)) => (StatusCode::OK, Json(dto::issue_to_json(&issue))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "issue not found"),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_issue_by_request(
    Extension(services): Extension<Arc<AppServices>>,
    Path(request_id): Path<String>,
) -> axum::response::Response {
    let request_id: RequestId = match request_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id")
        }
    };

    match services.engine().issue_by_request(request_id).await {
        Ok(Some(issue)) => (StatusCode::OK, Json(dto::issue_to_json(&issue))).into_response(),
        Ok(None) => {
            errors::json_error(StatusCode::NOT_FOUND, "not_found", "no issue for this request")
        }
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_issue_returns(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: IssueId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid issue id"),
    };

    match services.engine().returns_by_issue(id).await {
        Ok(returns) => (
            StatusCode::OK,
            Json(returns.iter().map(dto::return_to_json).collect::<Vec<_>>()),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
