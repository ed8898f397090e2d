use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_infra::engine::EngineError;

/// Map an engine error to the HTTP boundary.
///
/// `Storage` is opaque by design: the detail goes to the log, the client
/// gets a generic server error. The `Conflict` special case for issue
/// creation (resolve to the existing issue) lives in the issues route, not
/// here.
pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        EngineError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        EngineError::InvalidState(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", msg)
        }
        EngineError::InsufficientStock(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock", msg)
        }
        EngineError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        EngineError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "an internal error occurred",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
