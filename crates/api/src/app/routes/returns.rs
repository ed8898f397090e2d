use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::ReturnId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_return))
        .route("/:id", get(get_return))
}

pub async fn create_return(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<crate::context::ActorContext>,
    Json(body): Json<dto::CreateReturnRequest>,
) -> axum::response::Response {
    match services
        .engine()
        .create_return(body.into_draft(), actor.actor_id())
        .await
    {
        Ok(ret) => (StatusCode::CREATED, Json(dto::return_to_json(&ret))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_return(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ReturnId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid return id")
        }
    };

    match services.engine().return_record(id).await {
        Ok(Some(ret)) => (StatusCode::OK, Json(dto::return_to_json(&ret))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "return not found"),
        Err(e) => errors::engine_error_to_response(e),
    }
}
