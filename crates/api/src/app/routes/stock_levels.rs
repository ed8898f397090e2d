use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockroom_core::{ItemId, OfficeId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_stock_level).get(list_stock_levels))
        .route("/:item_id/:office_id", get(get_stock_level))
}

pub async fn create_stock_level(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateStockLevelRequest>,
) -> axum::response::Response {
    match services.engine().create_stock_level(body.into_level()).await {
        Ok(level) => (StatusCode::CREATED, Json(dto::stock_level_to_json(&level))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn list_stock_levels(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.engine().list_stock_levels().await {
        Ok(levels) => (
            StatusCode::OK,
            Json(levels.iter().map(dto::stock_level_to_json).collect::<Vec<_>>()),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_stock_level(
    Extension(services): Extension<Arc<AppServices>>,
    Path((item_id, office_id)): Path<(String, String)>,
) -> axum::response::Response {
    let item_id: ItemId = match item_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"),
    };
    let office_id: OfficeId = match office_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid office id")
        }
    };

    match services.engine().stock_level(item_id, office_id).await {
        Ok(Some(level)) => (StatusCode::OK, Json(dto::stock_level_to_json(&level))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "stock level not found"),
        Err(e) => errors::engine_error_to_response(e),
    }
}
